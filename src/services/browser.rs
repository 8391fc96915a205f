use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thiserror::Error;

/// WebDriver key code for Enter.
pub const ENTER_KEY: &str = "\u{E007}";

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver error: {0}")]
    WebDriver(#[from] WebDriverError),
    #[error("navigation to {0} failed")]
    Navigation(String),
    #[error("no element matches '{0}'")]
    NoSuchElement(String),
    #[error("invalid selector '{0}'")]
    InvalidSelector(String),
}

/// The browser surface the scraper needs. Selectors are CSS.
///
/// `scope` restricts a lookup to the descendants of an element returned by an
/// earlier lookup on the same page.
#[async_trait]
pub trait Page: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn find(
        &self,
        scope: Option<&Self::Element>,
        selector: &str,
    ) -> Result<Self::Element, BrowserError>;

    async fn find_all(
        &self,
        scope: Option<&Self::Element>,
        selector: &str,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    async fn text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    async fn attr(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>, BrowserError>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), BrowserError>;

    async fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    async fn scroll_to(&self, top: u32) -> Result<(), BrowserError>;
}
