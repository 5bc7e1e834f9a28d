//! Media download adapters.

mod http_media_fetcher;

pub use http_media_fetcher::{HttpMediaFetcher, MediaCredentials};
