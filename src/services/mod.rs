pub mod browser;
pub mod discovery;
pub mod droid;
pub mod element_accessor;
pub mod extractor;
pub mod normalizer;
pub mod profile_scraper;
pub mod scrape_worker;
pub mod search_provider;
pub mod session;
pub mod snapshot;

pub use droid::*;
pub use scrape_worker::*;
