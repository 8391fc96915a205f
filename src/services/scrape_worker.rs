use std::collections::HashSet;

use serde::Deserialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::dal::profile_db::ProfileStore;

use super::{browser::Page, discovery::CandidateSource, profile_scraper::ProfileScraper};

const SET_RESET_LEN: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ScrapeRequest {
    pub company: String,
    pub title: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Scrape(ScrapeRequest),
    VerifyPin(String),
}

pub struct ScrapeCommandSender {
    pub sender: UnboundedSender<WorkerCommand>,
}

/// Runs every command against the one browser session, strictly in order.
/// Returns the scraper once all senders are gone.
pub async fn profile_scraper_handler<P, C, S>(
    mut scraper: ProfileScraper<P, C, S>,
    mut command_receiver: UnboundedReceiver<WorkerCommand>,
) -> ProfileScraper<P, C, S>
where
    P: Page,
    C: CandidateSource,
    S: ProfileStore,
{
    log::info!("Started profile scraper");
    let mut seen_requests = HashSet::new();

    while let Some(command) = command_receiver.recv().await {
        match command {
            WorkerCommand::Scrape(request) => {
                if seen_requests.contains(&request) {
                    log::info!("Already scraped {:?}, skipping", request);
                    continue;
                }
                if seen_requests.len() > SET_RESET_LEN {
                    seen_requests.clear();
                }

                match scraper
                    .collect_profiles(&request.company, &request.title, request.count)
                    .await
                {
                    Ok(profiles) => {
                        log::info!(
                            "Collected {} of {} profiles for {} at {}",
                            profiles.len(),
                            request.count,
                            request.title,
                            request.company
                        );
                        seen_requests.insert(request);
                    }
                    Err(e) => log::error!("Scrape for {:?} aborted: {}", request, e),
                }
            }
            WorkerCommand::VerifyPin(code) => {
                if let Err(e) = scraper.session().pin_verify(&code).await {
                    log::error!("Pin verification failed: {}", e);
                }
            }
        }
    }

    log::info!("Command channel closed, stopping profile scraper");
    scraper
}
