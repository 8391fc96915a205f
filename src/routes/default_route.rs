use actix_web::{get, HttpResponse, Responder};
use serde_json::json;

#[get("/")]
async fn default() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME") }))
}
