use async_trait::async_trait;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WebElement};

use crate::configuration::BrowserSettings;

use super::browser::{BrowserError, Page};

const CHROME_ARGS: [&str; 2] = ["--no-sandbox", "--disable-dev-shm-usage"];

/// A live Chrome session driven through a WebDriver server.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &BrowserSettings) -> Result<Self, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.add_arg("--headless")?;
        }
        for arg in CHROME_ARGS {
            caps.add_arg(arg)?;
        }

        // e.g. http://chrome:4444/wd/hub or http://localhost:9515
        let driver = WebDriver::new(settings.webdriver_url.as_str(), caps).await?;
        driver.maximize_window().await?;

        log::info!("Browser session started on {}", settings.webdriver_url);

        Ok(Droid { driver })
    }

    pub async fn quit(self) -> Result<(), BrowserError> {
        self.driver.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl Page for Droid {
    type Element = WebElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn find(
        &self,
        scope: Option<&WebElement>,
        selector: &str,
    ) -> Result<WebElement, BrowserError> {
        let element = match scope {
            Some(parent) => parent.find(By::Css(selector)).await?,
            None => self.driver.find(By::Css(selector)).await?,
        };
        Ok(element)
    }

    async fn find_all(
        &self,
        scope: Option<&WebElement>,
        selector: &str,
    ) -> Result<Vec<WebElement>, BrowserError> {
        let elements = match scope {
            Some(parent) => parent.find_all(By::Css(selector)).await?,
            None => self.driver.find_all(By::Css(selector)).await?,
        };
        Ok(elements)
    }

    async fn text(&self, element: &WebElement) -> Result<String, BrowserError> {
        Ok(element.text().await?)
    }

    async fn attr(&self, element: &WebElement, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(element.attr(name).await?)
    }

    async fn type_text(&self, element: &WebElement, text: &str) -> Result<(), BrowserError> {
        element.send_keys(text.to_string()).await?;
        Ok(())
    }

    async fn click(&self, element: &WebElement) -> Result<(), BrowserError> {
        element.click().await?;
        Ok(())
    }

    async fn scroll_to(&self, top: u32) -> Result<(), BrowserError> {
        self.driver
            .execute(format!("window.scrollTo(0, {});", top), Vec::new())
            .await?;
        Ok(())
    }
}
