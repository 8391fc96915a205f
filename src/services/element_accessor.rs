use tokio::time::{sleep, Instant};

use crate::{
    configuration::WaitSettings,
    domain::locator::{LocatorKey, LocatorTable, Scope},
};

use super::browser::{BrowserError, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Immediate,
    /// Poll until the element shows up or the wait ceiling is reached.
    Wait,
}

/// Keyed element lookups that never fail: every browser error (timeout,
/// stale or detached node, missing node) becomes `None` and is logged once.
pub struct ElementAccessor<'a, P: Page> {
    page: &'a P,
    locators: &'a LocatorTable,
    wait: WaitSettings,
}

impl<'a, P: Page> ElementAccessor<'a, P> {
    pub fn new(page: &'a P, locators: &'a LocatorTable, wait: WaitSettings) -> Self {
        ElementAccessor {
            page,
            locators,
            wait,
        }
    }

    pub async fn find_one(
        &self,
        key: LocatorKey,
        scope: Option<&P::Element>,
        lookup: Lookup,
    ) -> Option<P::Element> {
        let selector = self.selector(key, scope)?;

        let result = match lookup {
            Lookup::Immediate => self.page.find(scope, selector).await,
            Lookup::Wait => self.wait_for(scope, selector).await,
        };

        match result {
            Ok(element) => Some(element),
            Err(e) => {
                log::warn!("Couldn't find {}: {}", key, e);
                None
            }
        }
    }

    /// All matches for `key`. An empty match list is reported as `None`.
    pub async fn find_many(
        &self,
        key: LocatorKey,
        scope: Option<&P::Element>,
        lookup: Lookup,
    ) -> Option<Vec<P::Element>> {
        let selector = self.selector(key, scope)?;

        if lookup == Lookup::Wait {
            // Returns once the first match is present
            self.find_one(key, scope, Lookup::Wait).await?;
        }

        match self.page.find_all(scope, selector).await {
            Ok(elements) if !elements.is_empty() => Some(elements),
            Ok(_) => {
                log::warn!("Couldn't find {}: no matches", key);
                None
            }
            Err(e) => {
                log::warn!("Couldn't list all {}: {}", key, e);
                None
            }
        }
    }

    /// Text of the element, distinguishing "absent" (`None`) from "present but
    /// empty" (`Some("")`).
    pub async fn text_of(
        &self,
        key: LocatorKey,
        scope: Option<&P::Element>,
        lookup: Lookup,
    ) -> Option<String> {
        let element = self.find_one(key, scope, lookup).await?;

        match self.page.text(&element).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                log::warn!("Couldn't read text of {}: {}", key, e);
                None
            }
        }
    }

    pub async fn text_or_empty(
        &self,
        key: LocatorKey,
        scope: Option<&P::Element>,
        lookup: Lookup,
    ) -> String {
        self.text_of(key, scope, lookup).await.unwrap_or_default()
    }

    pub async fn attr_of(&self, element: &P::Element, name: &str) -> Option<String> {
        match self.page.attr(element, name).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Couldn't read attribute {}: {}", name, e);
                None
            }
        }
    }

    fn selector(&self, key: LocatorKey, scope: Option<&P::Element>) -> Option<&'a str> {
        let Some(locator) = self.locators.get(key) else {
            log::warn!("No locator registered for {}", key);
            return None;
        };

        if locator.scope == Scope::Element && scope.is_none() {
            log::warn!("{} needs a scope element", key);
            return None;
        }

        Some(locator.selector.as_str())
    }

    async fn wait_for(
        &self,
        scope: Option<&P::Element>,
        selector: &str,
    ) -> Result<P::Element, BrowserError> {
        let deadline = Instant::now() + self.wait.timeout;

        loop {
            match self.page.find(scope, selector).await {
                Ok(element) => return Ok(element),
                Err(e @ BrowserError::InvalidSelector(_)) => return Err(e),
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(_) => sleep(self.wait.poll_interval).await,
            }
        }
    }
}

/// Value part of a labelled field whose rendered text is `"<label>\n<value>"`,
/// e.g. `"Dates Employed\nJun 2018 – Present"`. Unlabelled text is returned
/// as is.
pub fn labelled_value(text: &str) -> String {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let first = lines.next().unwrap_or_default();

    lines.next().unwrap_or(first).to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{labelled_value, ElementAccessor, Lookup};
    use crate::{
        configuration::WaitSettings,
        domain::locator::{LocatorKey, LocatorTable},
        services::{browser::Page, snapshot::HtmlSnapshot},
    };

    const URL: &str = "https://www.linkedin.com/in/jane/";
    const PAGE: &str = r#"
        <html><body>
          <li class="inline t-24 t-black t-normal break-words">Jane Doe</li>
          <li class="t-16 t-black t-normal inline-block"></li>
          <section class="pv-profile-section__card-item-v2 pv-profile-section pv-position-entity ember-view">
            <h4 class="pv-entity__date-range t-14 t-black--light t-normal">
              <span class="visually-hidden">Dates Employed</span><span>Jun 2018 – Present</span>
            </h4>
          </section>
        </body></html>
    "#;

    fn wait() -> WaitSettings {
        WaitSettings {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(30),
        }
    }

    fn patient_wait() -> WaitSettings {
        WaitSettings {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    async fn loaded() -> HtmlSnapshot {
        let page = HtmlSnapshot::new().with_page(URL, PAGE);
        page.goto(URL).await.unwrap();
        page
    }

    #[tokio::test]
    async fn strict_and_permissive_text() {
        let page = loaded().await;
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, wait());

        assert_eq!(
            accessor
                .text_of(LocatorKey::ProfileName, None, Lookup::Wait)
                .await
                .as_deref(),
            Some("Jane Doe")
        );
        // present but empty
        assert_eq!(
            accessor
                .text_of(LocatorKey::Location, None, Lookup::Immediate)
                .await
                .as_deref(),
            Some("")
        );
        assert_eq!(
            accessor
                .text_of(LocatorKey::Educations, None, Lookup::Immediate)
                .await,
            None
        );
        assert_eq!(
            accessor
                .text_or_empty(LocatorKey::Educations, None, Lookup::Immediate)
                .await,
            ""
        );
    }

    #[tokio::test]
    async fn wait_gives_up_after_ceiling() {
        let page = loaded().await;
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, wait());

        let started = std::time::Instant::now();
        let found = accessor
            .find_one(LocatorKey::PinVerify, None, Lookup::Wait)
            .await;

        assert!(found.is_none());
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn wait_polls_until_late_content_renders() {
        let page = HtmlSnapshot::new().with_late_page(URL, PAGE, 3);
        page.goto(URL).await.unwrap();
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, patient_wait());

        let started = std::time::Instant::now();
        let name = accessor
            .text_of(LocatorKey::ProfileName, None, Lookup::Wait)
            .await;

        assert_eq!(name.as_deref(), Some("Jane Doe"));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(page.lookups(), 4);
    }

    #[tokio::test]
    async fn wait_for_many_polls_until_late_content_renders() {
        let page = HtmlSnapshot::new().with_late_page(URL, PAGE, 3);
        page.goto(URL).await.unwrap();
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, patient_wait());

        let immediate = accessor
            .find_many(LocatorKey::Experiences, None, Lookup::Immediate)
            .await;
        assert!(immediate.is_none());

        let blocks = accessor
            .find_many(LocatorKey::Experiences, None, Lookup::Wait)
            .await;

        assert_eq!(blocks.map(|blocks| blocks.len()), Some(1));
    }

    #[tokio::test]
    async fn element_scoped_key_needs_a_scope() {
        let page = loaded().await;
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, wait());

        assert!(accessor
            .find_one(LocatorKey::DateRange, None, Lookup::Immediate)
            .await
            .is_none());

        let blocks = accessor
            .find_many(LocatorKey::Experiences, None, Lookup::Wait)
            .await
            .unwrap();
        let dates = accessor
            .text_of(LocatorKey::DateRange, Some(&blocks[0]), Lookup::Immediate)
            .await
            .unwrap();

        assert_eq!(labelled_value(&dates), "Jun 2018 – Present");
    }

    #[tokio::test]
    async fn empty_match_list_is_not_found() {
        let page = loaded().await;
        let table = LocatorTable::linkedin();
        let accessor = ElementAccessor::new(&page, &table, wait());

        assert!(accessor
            .find_many(LocatorKey::Educations, None, Lookup::Immediate)
            .await
            .is_none());
    }

    #[test]
    fn labelled_value_takes_second_line() {
        assert_eq!(labelled_value("Company Name\nGoogle"), "Google");
        assert_eq!(labelled_value("Google"), "Google");
        assert_eq!(labelled_value("  \nTitle\n  Engineer \nextra"), "Engineer");
        assert_eq!(labelled_value(""), "");
    }
}
