use std::collections::HashSet;

use crate::{
    dal::profile_db::ProfileStore,
    domain::profile::{url_to_username, Profile},
    error::ScrapeError,
};

use super::{
    browser::Page,
    discovery::{CandidateDiscovery, CandidateSource, PageCursor, QueryTerms},
    extractor::{Extraction, ProfileExtractor},
    session::Session,
};

/// Discovery, extraction and persistence driven through one browser session.
pub struct ProfileScraper<P: Page, C: CandidateSource, S: ProfileStore> {
    session: Session<P>,
    discovery: CandidateDiscovery<C>,
    extractor: ProfileExtractor<S>,
}

impl<P: Page, C: CandidateSource, S: ProfileStore> ProfileScraper<P, C, S> {
    pub fn new(
        session: Session<P>,
        discovery: CandidateDiscovery<C>,
        extractor: ProfileExtractor<S>,
    ) -> Self {
        ProfileScraper {
            session,
            discovery,
            extractor,
        }
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    pub fn store(&self) -> &S {
        self.extractor.store()
    }

    pub fn into_session(self) -> Session<P> {
        self.session
    }

    /// Make sure at least `num` stored profiles have worked as `title` at
    /// `company`, scraping more when the store is short. Stops early when a
    /// scraping round adds no matching profile.
    pub async fn collect_profiles(
        &mut self,
        company: &str,
        title: &str,
        num: usize,
    ) -> Result<Vec<Profile>, ScrapeError> {
        let mut stored = self.store().query(company, title).await?;
        let mut excluded = HashSet::new();

        while stored.len() < num {
            excluded.extend(stored.iter().map(|profile| profile.username.clone()));

            let scraped = self
                .get_profiles(company, title, num - stored.len(), &mut excluded)
                .await?;
            let refreshed = self.store().query(company, title).await?;
            log::info!(
                "Scraped {} profiles, {} of them match {} at {}",
                scraped.len(),
                refreshed.len().saturating_sub(stored.len()),
                title,
                company
            );

            let grew = refreshed.len() > stored.len();
            stored = refreshed;
            if !grew {
                log::info!("No new matching profiles, stopping with {}", stored.len());
                break;
            }
        }

        stored.truncate(num);
        Ok(stored)
    }

    /// Walk result pages and extract candidates until `num` profiles are
    /// collected. Every username processed is added to `excluded`.
    pub async fn get_profiles(
        &mut self,
        company: &str,
        role: &str,
        num: usize,
        excluded: &mut HashSet<String>,
    ) -> Result<Vec<Profile>, ScrapeError> {
        let terms = QueryTerms::new(company, role);
        let mut profiles = vec![];

        if num == 0 {
            return Ok(profiles);
        }

        let mut cursor = PageCursor::default();
        loop {
            let fresh = match self
                .discovery
                .next_candidates(&self.session, &terms, &mut cursor, excluded)
                .await
            {
                Ok(Some(fresh)) => fresh,
                Ok(None) => {
                    log::info!("Out of candidates for {} at {}", role, company);
                    break;
                }
                Err(e) if e.requires_relogin() => {
                    log::warn!("Result page {} failed: {}", cursor.next_page(), e);
                    self.session.recover().await?;
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::error!("Stopping discovery on page {}: {}", cursor.next_page(), e);
                    break;
                }
            };

            for profile_url in fresh {
                if let Some(username) = url_to_username(&profile_url) {
                    excluded.insert(username);
                }

                match self.extract_with_recovery(&profile_url, company, role).await {
                    Ok(extraction) => {
                        self.session.reset_retry_budget();
                        if let Some(profile) = extraction.profile() {
                            profiles.push(profile);
                            if profiles.len() >= num {
                                return Ok(profiles);
                            }
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => log::error!("Skipping {}: {}", profile_url, e),
                }

                self.session.pace().await;
            }
        }

        Ok(profiles)
    }

    /// Extract one candidate, logging in again and retrying once when the
    /// session looks broken. The retry budget is only reset after a
    /// successful extraction, so a run of failing candidates still spends it.
    async fn extract_with_recovery(
        &mut self,
        profile_url: &str,
        company: &str,
        role: &str,
    ) -> Result<Extraction, ScrapeError> {
        match self
            .extractor
            .extract(&self.session, profile_url, company, role)
            .await
        {
            Err(e) if e.requires_relogin() => {
                log::warn!("Problem getting profile {}: {}", profile_url, e);
                self.session.recover().await?;
                self.extractor
                    .extract(&self.session, profile_url, company, role)
                    .await
            }
            other => other,
        }
    }
}
