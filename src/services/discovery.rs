use std::collections::HashSet;

use async_trait::async_trait;
use itertools::Itertools;
use url::Url;

use crate::{
    configuration::{DiscoveryMode, Settings},
    domain::{locator::LocatorKey, profile::url_to_username},
    error::ScrapeError,
};

use super::{
    browser::Page,
    element_accessor::Lookup,
    search_provider::{SearchBackend, SearchError, SearchProvider},
    session::Session,
};

const SEARCH_PAGE_HEIGHT: u32 = 1500;
const PROFILE_SITE_FILTER: &str = "site:linkedin.com/in";

/// Whitespace-separated tokens of a company and a role query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerms {
    pub company: Vec<String>,
    pub role: Vec<String>,
}

impl QueryTerms {
    pub fn new(company: &str, role: &str) -> Self {
        let tokens = |value: &str| value.split_whitespace().map(str::to_string).collect();

        QueryTerms {
            company: tokens(company),
            role: tokens(role),
        }
    }

    pub fn join(&self, separator: &str) -> String {
        self.company.iter().chain(self.role.iter()).join(separator)
    }
}

/// Where candidate profile links come from. One call returns the raw links
/// of one result page; an empty page means the source has nothing more.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_page<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        page_num: u32,
    ) -> Result<Vec<String>, ScrapeError>;
}

/// Discovery through an external web search restricted to profile pages.
pub struct SearchProviderSource<S: SearchProvider> {
    provider: S,
}

impl<S: SearchProvider> SearchProviderSource<S> {
    pub fn new(provider: S) -> Self {
        SearchProviderSource { provider }
    }
}

#[async_trait]
impl<S: SearchProvider> CandidateSource for SearchProviderSource<S> {
    async fn fetch_page<P: Page>(
        &self,
        _session: &Session<P>,
        terms: &QueryTerms,
        page_num: u32,
    ) -> Result<Vec<String>, ScrapeError> {
        let query = format!("{} {}", PROFILE_SITE_FILTER, terms.join(" "));
        let results = self.provider.search(&query, page_num).await?;

        Ok(results.into_iter().map(|result| result.link).collect())
    }
}

/// Discovery through the site's own people search, inside the browser.
pub struct SiteSearchSource;

impl SiteSearchSource {
    fn page_url(template: &str, terms: &QueryTerms, page_num: u32) -> String {
        template
            .replace("{query}", &terms.join("%20"))
            .replace("{page}", &page_num.to_string())
    }
}

#[async_trait]
impl CandidateSource for SiteSearchSource {
    async fn fetch_page<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        page_num: u32,
    ) -> Result<Vec<String>, ScrapeError> {
        let url = Self::page_url(&session.urls().people_search, terms, page_num);
        session.visit(&url).await?;
        session.scroll_to_bottom(SEARCH_PAGE_HEIGHT).await?;

        let accessor = session.accessor();
        let Some(links) = accessor
            .find_many(LocatorKey::SearchResultLink, None, Lookup::Wait)
            .await
        else {
            return Ok(vec![]);
        };

        let base = Url::parse(&url).ok();
        let mut hrefs = vec![];
        for link in links.iter() {
            let Some(href) = accessor.attr_of(link, "href").await else {
                continue;
            };
            // Result links may be relative to the search page
            match base.as_ref().and_then(|base| base.join(&href).ok()) {
                Some(absolute) => hrefs.push(absolute.to_string()),
                None => hrefs.push(href),
            }
        }

        Ok(hrefs)
    }
}

/// The source picked by `scraper.discovery`.
pub enum ConfiguredSource {
    SearchProvider(SearchProviderSource<SearchBackend>),
    SiteSearch(SiteSearchSource),
}

impl ConfiguredSource {
    pub fn from_settings(settings: &Settings) -> Result<Self, SearchError> {
        let source = match settings.scraper.discovery {
            DiscoveryMode::SearchProvider => ConfiguredSource::SearchProvider(
                SearchProviderSource::new(SearchBackend::from_settings(&settings.search)?),
            ),
            DiscoveryMode::SiteSearch => ConfiguredSource::SiteSearch(SiteSearchSource),
        };

        Ok(source)
    }
}

#[async_trait]
impl CandidateSource for ConfiguredSource {
    async fn fetch_page<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        page_num: u32,
    ) -> Result<Vec<String>, ScrapeError> {
        match self {
            ConfiguredSource::SearchProvider(source) => {
                source.fetch_page(session, terms, page_num).await
            }
            ConfiguredSource::SiteSearch(source) => source.fetch_page(session, terms, page_num).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidatePage {
    /// The source returned nothing for this page.
    Exhausted,
    Candidates {
        raw: Vec<String>,
        /// Profile links not seen before, in first-seen order.
        fresh: Vec<String>,
    },
}

pub struct CandidateDiscovery<S: CandidateSource> {
    source: S,
    page_cap: u32,
}

impl<S: CandidateSource> CandidateDiscovery<S> {
    pub fn new(source: S, page_cap: u32) -> Self {
        CandidateDiscovery { source, page_cap }
    }

    pub fn page_cap(&self) -> u32 {
        self.page_cap
    }

    pub async fn page<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        page_num: u32,
        excluded: &HashSet<String>,
    ) -> Result<CandidatePage, ScrapeError> {
        let raw = self.source.fetch_page(session, terms, page_num).await?;
        if raw.is_empty() {
            return Ok(CandidatePage::Exhausted);
        }

        let fresh = fresh_candidates(&raw, excluded);
        log::info!(
            "Page {} has {} links, {} new profiles",
            page_num,
            raw.len(),
            fresh.len()
        );

        Ok(CandidatePage::Candidates { raw, fresh })
    }

    /// Fresh candidates from the page under `cursor`, or `None` once the
    /// results run out, the page cap is passed or the search fails. The
    /// cursor only advances past a page that was read.
    pub async fn next_candidates<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        cursor: &mut PageCursor,
        excluded: &HashSet<String>,
    ) -> Result<Option<Vec<String>>, ScrapeError> {
        if cursor.next_page > self.page_cap {
            log::info!("Reached the cap of {} result pages", self.page_cap);
            return Ok(None);
        }

        match self.page(session, terms, cursor.next_page, excluded).await {
            Ok(CandidatePage::Exhausted) => {
                log::info!("No more results after page {}", cursor.next_page - 1);
                Ok(None)
            }
            Ok(CandidatePage::Candidates { fresh, .. }) => {
                cursor.next_page += 1;
                Ok(Some(fresh))
            }
            Err(ScrapeError::Search(e)) => {
                log::error!("Search failed on page {}: {}", cursor.next_page, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Collect up to `target_count` new profile links, walking result pages
    /// until the target, the page cap or the end of results is reached.
    pub async fn find_candidates<P: Page>(
        &self,
        session: &Session<P>,
        terms: &QueryTerms,
        target_count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, ScrapeError> {
        let mut seen = excluded.clone();
        let mut found = vec![];

        if target_count == 0 {
            return Ok(found);
        }

        let mut cursor = PageCursor::default();
        while let Some(fresh) = self
            .next_candidates(session, terms, &mut cursor, &seen)
            .await?
        {
            for url in fresh {
                if let Some(username) = url_to_username(&url) {
                    seen.insert(username);
                }
                found.push(url);
                if found.len() >= target_count {
                    return Ok(found);
                }
            }
        }

        Ok(found)
    }
}

/// Position in the result pages of one query. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    next_page: u32,
}

impl PageCursor {
    pub fn next_page(&self) -> u32 {
        self.next_page
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        PageCursor { next_page: 1 }
    }
}

/// Profile links among `raw`, deduplicated by username and without the
/// `excluded` usernames.
pub fn fresh_candidates(raw: &[String], excluded: &HashSet<String>) -> Vec<String> {
    raw.iter()
        .filter_map(|url| url_to_username(url).map(|username| (username, url)))
        .unique_by(|(username, _)| username.clone())
        .filter(|(username, _)| !excluded.contains(username))
        .map(|(_, url)| url.clone())
        .collect()
}
