use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    dal::profile_db::ProfileStore,
    services::{ScrapeCommandSender, ScrapeRequest, WorkerCommand},
};

#[derive(Deserialize)]
struct ProfilesQuery {
    #[serde(default)]
    company: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct PinBody {
    code: String,
}

#[post("/scrape")]
async fn scrape_profiles(
    body: web::Json<ScrapeRequest>,
    command_sender: web::Data<ScrapeCommandSender>,
) -> HttpResponse {
    let request = body.into_inner();
    if request.company.trim().is_empty() || request.title.trim().is_empty() || request.count == 0 {
        return HttpResponse::BadRequest()
            .json(json!({ "error": "company, title and a positive count are required" }));
    }

    match command_sender
        .sender
        .send(WorkerCommand::Scrape(request.clone()))
    {
        Ok(_) => HttpResponse::Accepted().json(json!({ "status": "queued", "request": {
            "company": request.company,
            "title": request.title,
            "count": request.count,
        }})),
        Err(e) => {
            log::error!("Found error while sending scrape request: {:?}", e);
            HttpResponse::ServiceUnavailable().json(json!({ "error": "scraper is not running" }))
        }
    }
}

#[get("")]
async fn list_profiles(
    query: web::Query<ProfilesQuery>,
    store: web::Data<dyn ProfileStore>,
) -> HttpResponse {
    match store.query(&query.company, &query.title).await {
        Ok(profiles) => HttpResponse::Ok().json(profiles),
        Err(e) => {
            log::error!("Failed to query profiles: {:?}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/{username}")]
async fn get_profile(path: web::Path<String>, store: web::Data<dyn ProfileStore>) -> HttpResponse {
    let username = path.into_inner().to_lowercase();

    match store.profile_detail(&username).await {
        Ok(Some(detail)) => HttpResponse::Ok().json(detail),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "no such profile" })),
        Err(e) => {
            log::error!("Failed to fetch profile {}: {:?}", username, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[post("/pin")]
async fn verify_pin(
    body: web::Json<PinBody>,
    command_sender: web::Data<ScrapeCommandSender>,
) -> HttpResponse {
    let code = body.into_inner().code;
    if code.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "code is required" }));
    }

    match command_sender.sender.send(WorkerCommand::VerifyPin(code)) {
        Ok(_) => HttpResponse::Accepted().json(json!({ "status": "queued" })),
        Err(e) => {
            log::error!("Found error while sending pin: {:?}", e);
            HttpResponse::ServiceUnavailable().json(json!({ "error": "scraper is not running" }))
        }
    }
}
