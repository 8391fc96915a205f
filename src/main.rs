use std::{net::TcpListener, sync::Arc, time::Duration};

use anyhow::Context;
use env_logger::Env;
use scout::{
    configuration::get_configuration,
    dal::profile_db::{PgProfileStore, ProfileStore},
    services::{
        discovery::{CandidateDiscovery, ConfiguredSource},
        extractor::ProfileExtractor,
        profile_scraper::ProfileScraper,
        profile_scraper_handler,
        session::Session,
        Droid, ScrapeCommandSender, WorkerCommand,
    },
    startup::run,
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    let pool_options = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None);

    let connection_pool = pool_options.connect_lazy_with(configuration.database.with_db());
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .context("Failed to run database migrations.")?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(address)?;

    let droid = Droid::new(&configuration.browser)
        .await
        .context("Failed to start browser session.")?;
    let session = Session::from_settings(droid, &configuration)?;
    session.login().await.context("Failed to log in.")?;

    let store = PgProfileStore::new(connection_pool);
    let source = ConfiguredSource::from_settings(&configuration)?;
    let scraper = ProfileScraper::new(
        session,
        CandidateDiscovery::new(source, configuration.scraper.page_cap),
        ProfileExtractor::new(store.clone()),
    );

    let (command_sender, command_receiver) = mpsc::unbounded_channel::<WorkerCommand>();
    let command_sender = ScrapeCommandSender {
        sender: command_sender,
    };

    // Spawn background task
    tokio::spawn(async move {
        let scraper = profile_scraper_handler(scraper, command_receiver).await;
        scraper.into_session().quit().await;
    });

    let store: Arc<dyn ProfileStore> = Arc::new(store);
    run(listener, store, command_sender)?.await?;

    Ok(())
}
