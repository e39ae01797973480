// Page fetching: one GET per call, no retries
pub mod fetcher;
pub mod traits;

pub use fetcher::HttpFetcher;
pub use traits::{Fetcher, PageRequest};
