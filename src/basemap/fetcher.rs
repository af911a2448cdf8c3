//! Fetching and caching basemap tiles.

use crate::basemap::error::BasemapError;
use crate::basemap::wms::WmsRequest;
use image::{ImageFormat, RgbaImage};
use log::{info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// Downloads WMS basemap images and caches the decoded tiles on disk, so a
/// repeated render of the same extent never re-fetches.
pub struct BasemapFetcher {
    cache_dir: PathBuf,
    client: Client,
}

impl BasemapFetcher {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            client: Client::new(),
        }
    }

    /// Gets the basemap for a request, from cache or the network.
    pub async fn get(&self, request: &WmsRequest) -> Result<RgbaImage, BasemapError> {
        let cache_path = self.cache_dir.join(request.cache_file_name());

        if fs::metadata(&cache_path).await.is_ok() {
            info!("Basemap cache hit at {:?}", cache_path);
            let bytes = fs::read(&cache_path)
                .await
                .map_err(|e| BasemapError::CacheRead(cache_path.clone(), e))?;
            return decode_png(bytes).await;
        }

        let url = request.url();
        warn!("Basemap cache miss, fetching {}", url);
        let bytes = self.download(&url).await?;
        let image = decode_png(bytes).await?;

        self.store(&cache_path, image.clone()).await?;
        Ok(image)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BasemapError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BasemapError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    BasemapError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    BasemapError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BasemapError::BodyRead(url.to_string(), e))?;
        info!("Downloaded {} basemap bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn store(&self, path: &Path, image: RgbaImage) -> Result<(), BasemapError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| BasemapError::CacheDirCreation(self.cache_dir.clone(), e))?;

        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut bytes = std::io::Cursor::new(Vec::new());
            image
                .write_to(&mut bytes, ImageFormat::Png)
                .map_err(|e| BasemapError::ImageEncode(path_buf.clone(), e))?;
            std::fs::write(&path_buf, bytes.into_inner())
                .map_err(|e| BasemapError::CacheWrite(path_buf.clone(), e))?;
            Ok::<(), BasemapError>(())
        })
        .await??;
        info!("Cached basemap to {:?}", path);
        Ok(())
    }
}

/// PNG decode on a blocking task; the tile is RGB or RGBA depending on the
/// server, so everything normalizes to RGBA.
async fn decode_png(bytes: Vec<u8>) -> Result<RgbaImage, BasemapError> {
    task::spawn_blocking(move || {
        image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map(|img| img.to_rgba8())
            .map_err(BasemapError::ImageDecode)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::GeoBounds;
    use image::Rgba;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn decodes_png_to_rgba() {
        let img = decode_png(png_bytes(4, 2)).await.unwrap();
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(3, 1), &Rgba([10, 20, 30, 255]));
    }

    #[tokio::test]
    async fn cached_tile_is_served_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = BasemapFetcher::new(dir.path());
        let request = WmsRequest::new(GeoBounds {
            lat_min: 0.0,
            lat_max: 1.0,
            lon_min: 0.0,
            lon_max: 1.0,
        })
        .with_endpoint("http://127.0.0.1:1/unreachable");

        // Seed the cache directly; get() must not hit the (invalid) endpoint.
        let cache_path = dir.path().join(request.cache_file_name());
        std::fs::write(&cache_path, png_bytes(2, 2)).unwrap();

        let img = fetcher.get(&request).await.unwrap();
        assert_eq!(img.dimensions(), (2, 2));
    }
}
