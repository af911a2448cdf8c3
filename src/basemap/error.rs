use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasemapError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read basemap response body for {0}")]
    BodyRead(String, #[source] reqwest::Error),

    #[error("Failed to decode basemap image")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to encode basemap image for cache file '{0}'")]
    ImageEncode(PathBuf, #[source] image::ImageError),

    #[error("Failed to read cached basemap '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cached basemap '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
