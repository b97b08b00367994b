pub mod detail;
pub mod extract;
pub mod fetcher;
pub mod huispedia;
pub mod pool;
pub mod search;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use huispedia::HuispediaScraper;
pub use pool::PoolReport;
pub use types::{PropertyType, SearchParams};
