//! WMS GetMap request construction.
//!
//! Only the 1.1.1 key-value-pair GetMap operation is spoken here; the
//! default endpoint is the public terrestris OSM service the dashboard uses.

use crate::projection::GeoBounds;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default WMS endpoint (terrestris OSM).
pub const DEFAULT_ENDPOINT: &str = "https://ows.terrestris.de/osm/service";

/// Default tile edge in pixels.
pub const DEFAULT_SIZE: u32 = 512;

/// A WMS 1.1.1 GetMap request for a geographic bounding box.
///
/// BBOX is `lon_min,lat_min,lon_max,lat_max` in EPSG:4326, per the 1.1.1
/// axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct WmsRequest {
    pub endpoint: String,
    pub layers: String,
    pub bounds: GeoBounds,
    pub width: u32,
    pub height: u32,
}

impl WmsRequest {
    pub fn new(bounds: GeoBounds) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            layers: "OSM-WMS".to_string(),
            bounds,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The full GetMap URL. All parameter values are KVP-safe already, so
    /// the query string is assembled directly.
    pub fn url(&self) -> String {
        let b = &self.bounds;
        format!(
            "{}?SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap&FORMAT=image/png&TRANSPARENT=TRUE\
             &LAYERS={}&STYLES=&SRS=EPSG:4326&BBOX={},{},{},{}&WIDTH={}&HEIGHT={}",
            self.endpoint,
            self.layers,
            b.lon_min,
            b.lat_min,
            b.lon_max,
            b.lat_max,
            self.width,
            self.height
        )
    }

    /// Cache file name for this request, unique per endpoint, layers, bbox
    /// and size, so tiles from one server are never served for another.
    pub(crate) fn cache_file_name(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.endpoint.hash(&mut hasher);
        self.layers.hash(&mut hasher);
        let source = hasher.finish();

        let b = &self.bounds;
        format!(
            "basemap-{source:016x}-{:.4}_{:.4}_{:.4}_{:.4}-{}x{}.png",
            b.lon_min, b.lat_min, b.lon_max, b.lat_max, self.width, self.height
        )
    }
}
