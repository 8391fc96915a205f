use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::configuration::{SearchProviderKind, SearchSettings};

const NUM_CAPTCHA_RETRIES: u8 = 10; // Should be > 0
const RESULTS_PER_PAGE: u32 = 10;

static A_TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector"));
static H3_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("static selector"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search provider answered with status {0}")]
    Status(u16),
    #[error("blocked by captcha on query: {query}")]
    CaptchaBlocked { query: String },
}

/// A web search returning ranked results for a query, one page at a time.
/// Pages start at 1.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, page_num: u32) -> Result<Vec<SearchResult>, SearchError>;
}

fn first_result_index(page_num: u32) -> u32 {
    page_num.saturating_sub(1) * RESULTS_PER_PAGE + 1
}

/// Google Custom Search JSON API.
pub struct GoogleCustomSearch {
    client: Client,
    api_key: String,
    engine_id: String,
    url: String,
}

#[derive(Serialize)]
struct CustomSearchQuery<'a> {
    key: &'a str,
    cx: &'a str,
    q: &'a str,
    start: u32,
}

#[derive(Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

impl GoogleCustomSearch {
    pub fn new(api_key: String, engine_id: String, url: String) -> Self {
        let client = reqwest::Client::new();

        GoogleCustomSearch {
            client,
            api_key,
            engine_id,
            url,
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleCustomSearch {
    async fn search(&self, query: &str, page_num: u32) -> Result<Vec<SearchResult>, SearchError> {
        let res = self
            .client
            .get(&self.url)
            .query(&CustomSearchQuery {
                key: &self.api_key,
                cx: &self.engine_id,
                q: query,
                start: first_result_index(page_num),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            log::error!("Custom search returned {} for query: {}", res.status(), query);
            return Err(SearchError::Status(res.status().as_u16()));
        }

        let body = res.json::<CustomSearchResponse>().await?;
        log::info!("Found {} results on page {} for: {}", body.items.len(), page_num, query);

        Ok(body.items)
    }
}

/// Scrapes the public Google results page.
pub struct GoogleWebSearch {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct WebSearchQuery<'a> {
    q: &'a str,
    start: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ResultsPage {
    NotFound,
    Results(Vec<SearchResult>),
    Blocked,
}

impl GoogleWebSearch {
    pub fn new(url: String) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .read_timeout(Duration::from_secs(30))
            .cookie_store(true)
            .build()?;

        Ok(GoogleWebSearch { client, url })
    }
}

#[async_trait]
impl SearchProvider for GoogleWebSearch {
    async fn search(&self, query: &str, page_num: u32) -> Result<Vec<SearchResult>, SearchError> {
        let mut retry_count = 0;

        while retry_count < NUM_CAPTCHA_RETRIES {
            let req = self.client.get(&self.url).query(&WebSearchQuery {
                q: query,
                start: first_result_index(page_num) - 1,
            });

            let html_content = match req.send().await {
                Ok(res) => match res.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        log::error!("Failed to read search page body. Error: {:?}", e);
                        retry_count += 1;
                        continue;
                    }
                },
                Err(e) => {
                    log::error!("No response from search page, error: {:?}", e);
                    retry_count += 1;
                    continue;
                }
            };

            match parse_results_page(&html_content) {
                ResultsPage::NotFound => {
                    log::info!("Found no results on query: {}", query);
                    return Ok(vec![]);
                }
                ResultsPage::Results(results) => {
                    log::info!("Found {} results on page {} for: {}", results.len(), page_num, query);
                    return Ok(results);
                }
                ResultsPage::Blocked => {
                    log::error!("Blocked by captcha on query: {}", query);
                    retry_count += 1;
                }
            }
        }

        Err(SearchError::CaptchaBlocked {
            query: query.to_string(),
        })
    }
}

/// Classifies a results page: anchors holding an `h3` are results, the
/// "did not match" banner is an empty result, anything else is a block page.
pub fn parse_results_page(html_content: &str) -> ResultsPage {
    let html_document = Html::parse_document(html_content);

    let headings = html_document.select(&H3_SELECTOR).count();
    if headings == 0 {
        return match html_content.contains("did not match any documents") {
            true => ResultsPage::NotFound,
            false => ResultsPage::Blocked,
        };
    }

    let results = html_document
        .select(&A_TAG_SELECTOR)
        .filter_map(|tag| {
            let heading = tag.select(&H3_SELECTOR).next()?;
            let href = tag.value().attr("href")?;

            Some(SearchResult {
                title: heading.text().collect::<String>().trim().to_string(),
                link: unwrap_redirect(href)?,
            })
        })
        .collect();

    ResultsPage::Results(results)
}

/// `/url?q=<target>&sa=...` redirect links point at `<target>`.
fn unwrap_redirect(href: &str) -> Option<String> {
    if !href.starts_with("/url?") {
        return Url::parse(href).ok().map(|_| href.to_string());
    }

    let base = Url::parse("https://www.google.com").ok()?;
    base.join(href)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
}

/// The configured provider.
pub enum SearchBackend {
    CustomSearch(GoogleCustomSearch),
    Web(GoogleWebSearch),
}

impl SearchBackend {
    pub fn from_settings(settings: &SearchSettings) -> Result<Self, SearchError> {
        let backend = match settings.provider {
            SearchProviderKind::CustomSearch => SearchBackend::CustomSearch(GoogleCustomSearch::new(
                settings.api_key.clone(),
                settings.engine_id.clone(),
                settings.base_url.clone(),
            )),
            SearchProviderKind::Web => {
                SearchBackend::Web(GoogleWebSearch::new(settings.base_url.clone())?)
            }
        };

        Ok(backend)
    }
}

#[async_trait]
impl SearchProvider for SearchBackend {
    async fn search(&self, query: &str, page_num: u32) -> Result<Vec<SearchResult>, SearchError> {
        match self {
            SearchBackend::CustomSearch(provider) => provider.search(query, page_num).await,
            SearchBackend::Web(provider) => provider.search(query, page_num).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{first_result_index, parse_results_page, ResultsPage, SearchResult};

    #[test]
    fn pages_map_to_result_offsets() {
        assert_eq!(first_result_index(1), 1);
        assert_eq!(first_result_index(3), 21);
        assert_eq!(first_result_index(0), 1);
    }

    #[test]
    fn results_are_anchors_with_headings() {
        let page = r#"
            <html><body>
              <a href="/url?q=https://www.linkedin.com/in/jane-doe/&amp;sa=U"><h3>Jane Doe - Acme</h3></a>
              <a href="https://www.linkedin.com/in/john/"><div><h3>John</h3></div></a>
              <a href="/search?q=next">Next</a>
              <h3>Related searches</h3>
            </body></html>
        "#;

        assert_eq!(
            parse_results_page(page),
            ResultsPage::Results(vec![
                SearchResult {
                    title: "Jane Doe - Acme".to_string(),
                    link: "https://www.linkedin.com/in/jane-doe/".to_string(),
                },
                SearchResult {
                    title: "John".to_string(),
                    link: "https://www.linkedin.com/in/john/".to_string(),
                },
            ])
        );
    }

    #[test]
    fn no_match_banner_is_empty_not_blocked() {
        let page = "<html><body><p>Your search - foo - did not match any documents.</p></body></html>";
        assert_eq!(parse_results_page(page), ResultsPage::NotFound);

        let captcha = "<html><body><form id=\"captcha-form\"></form></body></html>";
        assert_eq!(parse_results_page(captcha), ResultsPage::Blocked);
    }
}
