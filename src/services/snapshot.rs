use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::browser::{BrowserError, Page};

/// An offline page backed by captured HTML, keyed by URL.
///
/// Runs the same locator table and extraction code as the live browser, so
/// saved page sources can be replayed without a WebDriver. Text follows the
/// rendered-text convention of the live driver: one line per text node.
#[derive(Default)]
pub struct HtmlSnapshot {
    pages: HashMap<String, String>,
    state: Mutex<SnapshotState>,
}

#[derive(Default)]
struct SnapshotState {
    current: String,
    visited: Vec<String>,
    typed: Vec<String>,
    clicks: usize,
    lookups: usize,
    failures: HashMap<String, usize>,
    render_delays: HashMap<String, usize>,
    unrendered_lookups: usize,
}

#[derive(Debug, Clone)]
pub struct SnapshotElement {
    html: String,
    text: String,
    attrs: HashMap<String, String>,
}

impl HtmlSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigation to `url` fails `failures` times before serving `html`.
    pub fn with_flaky_page(self, url: &str, html: &str, failures: usize) -> Self {
        self.lock().failures.insert(url.to_string(), failures);
        self.with_page(url, html)
    }

    /// The first `lookups` element lookups after navigating to `url` see an
    /// empty document, like content that renders late.
    pub fn with_late_page(self, url: &str, html: &str, lookups: usize) -> Self {
        self.lock().render_delays.insert(url.to_string(), lookups);
        self.with_page(url, html)
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.lock().typed.clone()
    }

    pub fn clicks(&self) -> usize {
        self.lock().clicks
    }

    /// Element lookups made so far, including the ones that saw nothing.
    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rendered_document(&self) -> String {
        let mut state = self.lock();
        state.lookups += 1;

        if state.unrendered_lookups > 0 {
            state.unrendered_lookups -= 1;
            return String::new();
        }
        state.current.clone()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|_| BrowserError::InvalidSelector(selector.to_string()))
}

fn to_snapshot_element(element: ElementRef) -> SnapshotElement {
    let text = element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let attrs = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    SnapshotElement {
        html: element.html(),
        text,
        attrs,
    }
}

fn select_all(
    document: &str,
    scope: Option<&SnapshotElement>,
    selector: &str,
) -> Result<Vec<SnapshotElement>, BrowserError> {
    let selector = parse_selector(selector)?;

    let elements = match scope {
        None => {
            let html = Html::parse_document(document);
            html.select(&selector).map(to_snapshot_element).collect()
        }
        Some(parent) => {
            let html = Html::parse_fragment(&parent.html);
            match html.root_element().children().find_map(ElementRef::wrap) {
                Some(root) => root
                    .select(&selector)
                    .filter(|element| element.id() != root.id())
                    .map(to_snapshot_element)
                    .collect(),
                None => vec![],
            }
        }
    };

    Ok(elements)
}

#[async_trait]
impl Page for HtmlSnapshot {
    type Element = SnapshotElement;

    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.visited.push(url.to_string());

        if let Some(remaining) = state.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::Navigation(url.to_string()));
            }
        }

        state.current = self.pages.get(url).cloned().unwrap_or_default();
        state.unrendered_lookups = state.render_delays.get(url).copied().unwrap_or(0);
        Ok(())
    }

    async fn find(
        &self,
        scope: Option<&SnapshotElement>,
        selector: &str,
    ) -> Result<SnapshotElement, BrowserError> {
        let document = self.rendered_document();
        select_all(&document, scope, selector)?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NoSuchElement(selector.to_string()))
    }

    async fn find_all(
        &self,
        scope: Option<&SnapshotElement>,
        selector: &str,
    ) -> Result<Vec<SnapshotElement>, BrowserError> {
        let document = self.rendered_document();
        select_all(&document, scope, selector)
    }

    async fn text(&self, element: &SnapshotElement) -> Result<String, BrowserError> {
        Ok(element.text.clone())
    }

    async fn attr(
        &self,
        element: &SnapshotElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(element.attrs.get(name).cloned())
    }

    async fn type_text(&self, _element: &SnapshotElement, text: &str) -> Result<(), BrowserError> {
        self.lock().typed.push(text.to_string());
        Ok(())
    }

    async fn click(&self, _element: &SnapshotElement) -> Result<(), BrowserError> {
        self.lock().clicks += 1;
        Ok(())
    }

    async fn scroll_to(&self, _top: u32) -> Result<(), BrowserError> {
        Ok(())
    }
}
