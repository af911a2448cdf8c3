pub mod error;
pub mod fetcher;
pub mod wms;

pub use error::BasemapError;
pub use fetcher::BasemapFetcher;
pub use wms::{WmsRequest, DEFAULT_ENDPOINT, DEFAULT_SIZE};
