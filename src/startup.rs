use std::{net::TcpListener, sync::Arc};

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    dal::profile_db::ProfileStore,
    routes::{default_route, profile_route},
    services::ScrapeCommandSender,
};

pub fn run(
    listener: TcpListener,
    store: Arc<dyn ProfileStore>,
    command_sender: ScrapeCommandSender,
) -> Result<Server, std::io::Error> {
    let store: Data<dyn ProfileStore> = Data::from(store);
    let command_sender = web::Data::new(command_sender);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(routes)
            .app_data(store.clone())
            .app_data(command_sender.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(default_route::default)
        .service(
            web::scope("/profiles")
                .service(profile_route::scrape_profiles)
                .service(profile_route::list_profiles)
                .service(profile_route::get_profile),
        )
        .service(web::scope("/session").service(profile_route::verify_pin));
}
