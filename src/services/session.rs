use std::time::Duration;

use config::ConfigError;
use rand::Rng;
use tokio::time::sleep;

use crate::{
    configuration::{Credentials, Pacing, Settings, SiteUrls, WaitSettings},
    domain::locator::{LocatorKey, LocatorTable},
    error::ScrapeError,
};

use super::{
    browser::{Page, ENTER_KEY},
    droid::Droid,
    element_accessor::{ElementAccessor, Lookup},
};

const WINDOW_HEIGHT: u32 = 800;
const SCROLL_PAUSE: Duration = Duration::from_millis(100);

/// Bounded number of re-logins with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_attempts: u32,
    base_backoff: Duration,
    used: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        RetryBudget {
            max_attempts,
            base_backoff,
            used: 0,
        }
    }

    /// Backoff before the next attempt, or `None` once the budget is spent.
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.used >= self.max_attempts {
            return None;
        }
        let backoff = self.base_backoff.saturating_mul(2u32.saturating_pow(self.used));
        self.used += 1;
        Some(backoff)
    }

    fn reset(&mut self) {
        self.used = 0;
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.used
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget::new(3, Duration::from_secs(2))
    }
}

/// The one browser session every scrape goes through, passed explicitly to
/// whoever needs it.
pub struct Session<P: Page> {
    page: P,
    locators: LocatorTable,
    urls: SiteUrls,
    credentials: Credentials,
    wait: WaitSettings,
    pacing: Pacing,
    budget: RetryBudget,
}

impl<P: Page> Session<P> {
    pub fn new(page: P, locators: LocatorTable, urls: SiteUrls, credentials: Credentials) -> Self {
        Session {
            page,
            locators,
            urls,
            credentials,
            wait: WaitSettings {
                poll_interval: Duration::from_millis(100),
                timeout: Duration::from_secs(15),
            },
            pacing: Pacing {
                delay: Duration::from_millis(1000),
                jitter: Duration::from_millis(300),
            },
            budget: RetryBudget::default(),
        }
    }

    pub fn from_settings(page: P, settings: &Settings) -> Result<Self, ConfigError> {
        let scraper = &settings.scraper;
        let session = Session::new(
            page,
            scraper.locator_table()?,
            settings.site.clone(),
            settings.credentials.clone(),
        )
        .with_wait(scraper.wait())
        .with_pacing(scraper.pacing())
        .with_retry_budget(RetryBudget::new(
            scraper.max_relogin_attempts,
            Duration::from_millis(scraper.relogin_backoff_ms),
        ));

        Ok(session)
    }

    pub fn with_wait(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_retry_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn urls(&self) -> &SiteUrls {
        &self.urls
    }

    pub fn accessor(&self) -> ElementAccessor<'_, P> {
        ElementAccessor::new(&self.page, &self.locators, self.wait)
    }

    pub fn retry_budget(&self) -> &RetryBudget {
        &self.budget
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Fill in the login form and submit it. Success is not confirmed here:
    /// a failed login shows up later as a missing profile name.
    pub async fn login(&self) -> Result<(), ScrapeError> {
        log::info!("Logging in as {}", self.credentials.email);
        self.visit(&self.urls.login).await?;

        let accessor = self.accessor();

        if let Some(username) = accessor
            .find_one(LocatorKey::Username, None, Lookup::Wait)
            .await
        {
            self.page
                .type_text(&username, &self.credentials.email)
                .await?;
        }

        if let Some(password) = accessor
            .find_one(LocatorKey::Password, None, Lookup::Immediate)
            .await
        {
            let keys = format!("{}{}", self.credentials.password, ENTER_KEY);
            self.page.type_text(&password, &keys).await?;
        }

        Ok(())
    }

    pub async fn pin_verify(&self, code: &str) -> Result<(), ScrapeError> {
        let pin_box = self
            .accessor()
            .find_one(LocatorKey::PinVerify, None, Lookup::Wait)
            .await
            .ok_or(ScrapeError::ElementNotFound(LocatorKey::PinVerify))?;

        self.page
            .type_text(&pin_box, &format!("{}{}", code.trim(), ENTER_KEY))
            .await?;
        log::info!("Submitted verification pin");

        Ok(())
    }

    /// Log in again, spending the retry budget. Fails with
    /// `RetryBudgetExhausted` once every attempt is used up.
    pub async fn recover(&mut self) -> Result<(), ScrapeError> {
        loop {
            let Some(backoff) = self.budget.next_backoff() else {
                log::error!(
                    "Giving up on the session after {} login attempts",
                    self.budget.max_attempts
                );
                return Err(ScrapeError::RetryBudgetExhausted(self.budget.max_attempts));
            };

            log::warn!(
                "Re-establishing session in {:?} ({} attempts left)",
                backoff,
                self.budget.remaining()
            );
            sleep(backoff).await;

            match self.login().await {
                Ok(()) => return Ok(()),
                Err(e) if e.requires_relogin() => log::error!("Login failed: {}", e),
                Err(e) => return Err(e),
            }
        }
    }

    pub fn reset_retry_budget(&mut self) {
        self.budget.reset();
    }

    pub async fn visit(&self, url: &str) -> Result<(), ScrapeError> {
        log::info!("Visiting {}", url);
        self.page.goto(url).await?;
        Ok(())
    }

    /// Scroll down in steps of two thirds of a window so lazily loaded
    /// sections get rendered.
    pub async fn scroll_to_bottom(&self, height: u32) -> Result<(), ScrapeError> {
        let step = (WINDOW_HEIGHT * 2 / 3) as usize;

        for top in (step as u32..height).step_by(step) {
            self.page.scroll_to(top).await?;
            sleep(SCROLL_PAUSE).await;
        }
        self.page.scroll_to(height).await?;

        Ok(())
    }

    /// Click every "see more" button on the page. Failures are ignored.
    pub async fn expand_sections(&self) {
        let Some(buttons) = self
            .accessor()
            .find_many(LocatorKey::ShowMore, None, Lookup::Immediate)
            .await
        else {
            return;
        };

        for button in buttons.iter() {
            if let Err(e) = self.page.click(button).await {
                log::warn!("Couldn't expand section: {}", e);
            }
        }
    }

    /// Sleep for the pacing delay, randomized by up to the jitter either way.
    pub async fn pace(&self) {
        let delay = {
            let jitter = self.pacing.jitter.as_millis() as i64;
            let offset = rand::thread_rng().gen_range(-jitter..=jitter);
            (self.pacing.delay.as_millis() as i64 + offset).max(0) as u64
        };

        sleep(Duration::from_millis(delay)).await;
    }
}

impl Session<Droid> {
    pub async fn quit(self) {
        if let Err(e) = self.page.quit().await {
            log::error!("Failed to close browser session: {}", e);
        }
    }
}
