//! This module provides the main entry point for the heat-stress dashboard
//! client. It ties together grid loading, per-timestamp index computation,
//! basemap-backed map rendering and historical trend aggregation, with all
//! downloaded data cached on disk.

use crate::basemap::{BasemapFetcher, WmsRequest};
use crate::error::HeatStressError;
use crate::grid::{GridFetcher, GridSeries, GridSource, GriddedField, GridMetadata};
use crate::indices::{IndexSnapshot, MapLayer};
use crate::projection::GeoBounds;
use crate::render::{colorbar, overlay_field, MapRender, DEFAULT_ALPHA};
use crate::trends::{ArchiveSource, TrendArchive, TrendFetcher};
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// The main client for the heat-stress dashboard data.
///
/// The client loads gridded temperature and dew point series, derives the
/// heat-stress indicators for a chosen timestamp, renders map overlays on a
/// WMS basemap and aggregates the multi-decade statistics archive into
/// trend series. Downloaded tables and basemap tiles are cached on disk so
/// repeated requests are served locally.
///
/// Create an instance using [`HeatStress::new()`] for default behavior
/// (using a standard cache directory) or [`HeatStress::with_cache_folder()`]
/// for custom cache locations.
///
/// # Examples
///
/// ```rust
/// # use heatstress::{HeatStress, HeatStressError};
/// # async fn run() -> Result<(), HeatStressError> {
/// // Create a client using the default cache directory
/// let client = HeatStress::new().await?;
/// // Now you can use the client to load grids, render maps and chart trends
/// # Ok(())
/// # }
/// ```
pub struct HeatStress {
    grid: GridFetcher,
    trends: TrendFetcher,
    basemap: BasemapFetcher,
}

#[bon]
impl HeatStress {
    /// Creates a new `HeatStress` client with a specified cache directory.
    ///
    /// Use this if you need to control where the converted grid tables,
    /// trend archives and basemap tiles are stored.
    ///
    /// # Errors
    ///
    /// Returns [`HeatStressError::CacheDirCreation`] if the directory
    /// cannot be created.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use heatstress::{HeatStress, HeatStressError};
    /// # use std::path::Path;
    /// # async fn run() -> Result<(), HeatStressError> {
    /// let cache_path = Path::new("/home/user/.cache").to_path_buf();
    /// let client = HeatStress::with_cache_folder(cache_path).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, HeatStressError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| HeatStressError::CacheDirCreation(cache_folder.clone(), e))?;
        Ok(Self {
            grid: GridFetcher::new(&cache_folder),
            trends: TrendFetcher::new(&cache_folder),
            basemap: BasemapFetcher::new(&cache_folder),
        })
    }

    /// Creates a new `HeatStress` client using the default cache directory.
    ///
    /// The default location is determined with the `dirs` crate, typically
    /// `~/.cache/heatstress_cache` on Linux.
    ///
    /// # Errors
    ///
    /// Returns [`HeatStressError::CacheDirResolution`] if the system cache
    /// directory cannot be determined, or
    /// [`HeatStressError::CacheDirCreation`] if it cannot be created.
    pub async fn new() -> Result<Self, HeatStressError> {
        let cache_folder = get_cache_dir().map_err(HeatStressError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    /// Loads a gridded variable series (temperature or dew point).
    ///
    /// CSV input is converted to a parquet cache on first load; subsequent
    /// loads of the same variable are served from the in-memory memo.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.source(&GridSource)`: **Required.** Where the long table and its
    ///   JSON metadata sidecar live ([`GridSource`]).
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use heatstress::{GridSource, HeatStress, HeatStressError};
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), HeatStressError> {
    /// let client = HeatStress::new().await?;
    /// let temperature = client
    ///     .grid_series()
    ///     .source(&GridSource::Parquet {
    ///         data: PathBuf::from("data/t_2m.parquet"),
    ///         metadata: PathBuf::from("data/t_2m.json"),
    ///     })
    ///     .call()
    ///     .await?;
    /// println!("{} timestamps loaded", temperature.times().len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn grid_series(&self, source: &GridSource) -> Result<GridSeries, HeatStressError> {
        self.grid
            .get_series(source)
            .await
            .map_err(HeatStressError::from)
    }

    /// Computes every derived indicator for one timestamp.
    ///
    /// Materializes the temperature and dew point fields at `at`, masks and
    /// gap-fills invalid dew points, and derives relative humidity plus all
    /// heat-stress indices.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.temperature(&GridSeries)`: **Required.** 2-meter temperature in Kelvin.
    /// * `.dew_point(&GridSeries)`: **Required.** 2-meter dew point in Kelvin.
    /// * `.at(DateTime<Utc>)`: **Required.** The timestamp to materialize.
    ///
    /// # Errors
    ///
    /// Returns [`HeatStressError::GridData`] if either series has no rows at
    /// `at`, and [`HeatStressError::Snapshot`] if the two fields disagree on
    /// shape or timestamp.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use heatstress::{GridSeries, HeatStress, HeatStressError, HeatIndexKind};
    /// # async fn run(
    /// #     client: &HeatStress,
    /// #     temperature: &GridSeries,
    /// #     dew_point: &GridSeries,
    /// # ) -> Result<(), HeatStressError> {
    /// let at = temperature.times()[0];
    /// let snapshot = client
    ///     .snapshot()
    ///     .temperature(temperature)
    ///     .dew_point(dew_point)
    ///     .at(at)
    ///     .call()?;
    ///
    /// for row in snapshot.summary() {
    ///     println!("{}: p99 = {:.1} °C (threshold {} °C)", row.kind, row.p99, row.threshold_c);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub fn snapshot(
        &self,
        temperature: &GridSeries,
        dew_point: &GridSeries,
        at: DateTime<Utc>,
    ) -> Result<IndexSnapshot, HeatStressError> {
        let temp_k = temperature.snapshot_at(at)?;
        let dew_k = dew_point.snapshot_at(at)?;
        IndexSnapshot::compute(&temp_k, &dew_k).map_err(HeatStressError::from)
    }

    /// Renders a field as a colormapped overlay on an OSM basemap.
    ///
    /// The grid axes are reprojected to geographic coordinates, the padded
    /// extent is fetched from the WMS endpoint (or the tile cache), and the
    /// field is blended on top with its layer's colormap. A matching
    /// colorbar strip is returned alongside.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.field(&GriddedField)`: **Required.** The field to draw, e.g. from
    ///   [`IndexSnapshot::field`].
    /// * `.metadata(&GridMetadata)`: **Required.** The grid geometry the field lives on.
    /// * `.layer(MapLayer)`: **Required.** Picks the colormap ([`MapLayer`]).
    /// * `.alpha(f64)`: Optional. Overlay opacity in `[0, 1]`. Defaults to `0.6`.
    /// * `.size(u32)`: Optional. Basemap edge in pixels. Defaults to `512`.
    /// * `.endpoint(&str)`: Optional. Alternative WMS endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`HeatStressError::EmptyGrid`] when the metadata has empty
    /// axes, and [`HeatStressError::Basemap`] for network, decode or cache
    /// failures.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use heatstress::{HeatStress, HeatStressError, IndexSnapshot, MapLayer, HeatIndexKind};
    /// # use heatstress::GridMetadata;
    /// # async fn run(
    /// #     client: &HeatStress,
    /// #     snapshot: &IndexSnapshot,
    /// #     metadata: &GridMetadata,
    /// # ) -> Result<(), HeatStressError> {
    /// let layer = MapLayer::Index(HeatIndexKind::Humidex);
    /// let render = client
    ///     .render_map()
    ///     .field(snapshot.field(layer))
    ///     .metadata(metadata)
    ///     .layer(layer)
    ///     .call()
    ///     .await?;
    ///
    /// render.image.save("humidex.png").unwrap();
    /// println!("scale runs {:.1}..{:.1}", render.vmin, render.vmax);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn render_map(
        &self,
        field: &GriddedField,
        metadata: &GridMetadata,
        layer: MapLayer,
        alpha: Option<f64>,
        size: Option<u32>,
        endpoint: Option<&str>,
    ) -> Result<MapRender, HeatStressError> {
        let alpha = alpha.unwrap_or(DEFAULT_ALPHA);
        let size = size.unwrap_or(crate::basemap::DEFAULT_SIZE);

        let mesh = metadata
            .rotated_pole()
            .reproject_axes(&metadata.rlat, &metadata.rlon);
        let bounds = mesh
            .bounds()
            .ok_or(HeatStressError::EmptyGrid)?
            .padded(GeoBounds::MAP_PADDING_DEG);

        let mut request = WmsRequest::new(bounds).with_size(size, size);
        if let Some(endpoint) = endpoint {
            request = request.with_endpoint(endpoint);
        }
        let tile = self.basemap.get(&request).await?;

        let colormap = layer.colormap();
        let image = overlay_field(&tile, field, metadata, bounds, colormap, alpha);
        let bar = colorbar(colormap, size, size / 16);

        Ok(MapRender {
            image,
            colorbar: bar,
            bounds,
            vmin: field.nan_min().unwrap_or(0.0),
            vmax: field.nan_max().unwrap_or(1.0),
        })
    }

    /// Loads the historical statistics archive for trend analysis.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.source(&ArchiveSource)`: **Required.** A local CSV or a gzipped
    ///   CSV URL ([`ArchiveSource`]).
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use heatstress::{ArchiveSource, HeatIndexKind, HeatStress, HeatStressError};
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), HeatStressError> {
    /// let client = HeatStress::new().await?;
    /// let archive = client
    ///     .trend_archive()
    ///     .source(&ArchiveSource::Csv(PathBuf::from("data/stats_1981_2023.csv")))
    ///     .call()
    ///     .await?;
    ///
    /// let exceedances = archive.annual_exceedances(HeatIndexKind::Wbgt)?;
    /// for (year, count) in exceedances.years.iter().zip(&exceedances.counts) {
    ///     println!("{year}: {count} days above {} °C", exceedances.threshold_c);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn trend_archive(
        &self,
        source: &ArchiveSource,
    ) -> Result<TrendArchive, HeatStressError> {
        self.trends
            .get_archive(source)
            .await
            .map_err(HeatStressError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMetadata;
    use crate::indices::HeatIndexKind;
    use chrono::TimeZone;
    use polars::prelude::*;

    fn meta() -> GridMetadata {
        GridMetadata {
            variable: "T_2M".to_string(),
            units: "K".to_string(),
            rlat: vec![-0.1, 0.0, 0.1],
            rlon: vec![-0.1, 0.0, 0.1],
            grid_north_pole_latitude: 43.0,
            grid_north_pole_longitude: -170.0,
        }
    }

    fn series(variable: &str, base: f64) -> GridSeries {
        let ts = Utc.with_ymd_and_hms(2023, 7, 15, 14, 0, 0).unwrap();
        let mut t = Vec::new();
        let mut ri = Vec::new();
        let mut ci = Vec::new();
        let mut v = Vec::new();
        for row in 0..3u32 {
            for col in 0..3u32 {
                t.push(ts.naive_utc());
                ri.push(row);
                ci.push(col);
                v.push(base + (row + col) as f64 * 0.1);
            }
        }
        let df = df!(
            "time" => t,
            "rlat_idx" => ri,
            "rlon_idx" => ci,
            "value" => v,
        )
        .unwrap();
        let mut m = meta();
        m.variable = variable.to_string();
        GridSeries::from_dataframe(m, df).unwrap()
    }

    #[tokio::test]
    async fn snapshot_from_loaded_series() {
        let dir = tempfile::tempdir().unwrap();
        let client = HeatStress::with_cache_folder(dir.path().to_path_buf())
            .await
            .unwrap();

        let temperature = series("T_2M", 303.15);
        let dew_point = series("TD_2M", 295.15);
        let at = temperature.times()[0];

        let snapshot = client
            .snapshot()
            .temperature(&temperature)
            .dew_point(&dew_point)
            .at(at)
            .call()
            .unwrap();

        assert_eq!(snapshot.timestamp(), at);
        let summary = snapshot.summary();
        assert_eq!(summary.len(), HeatIndexKind::ALL.len());
        // 30 °C with a 22 °C dew point: Humidex reads well above the dry-bulb.
        assert!(summary[0].mean > 30.0);
    }

    #[tokio::test]
    async fn snapshot_at_unknown_timestamp_errors() {
        let dir = tempfile::tempdir().unwrap();
        let client = HeatStress::with_cache_folder(dir.path().to_path_buf())
            .await
            .unwrap();

        let temperature = series("T_2M", 303.15);
        let dew_point = series("TD_2M", 295.15);
        let absent = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();

        let result = client
            .snapshot()
            .temperature(&temperature)
            .dew_point(&dew_point)
            .at(absent)
            .call();
        assert!(matches!(result, Err(HeatStressError::GridData(_))));
    }

    #[tokio::test]
    async fn cache_folder_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not_a_dir");
        std::fs::write(&file_path, b"x").unwrap();

        let result = HeatStress::with_cache_folder(file_path).await;
        assert!(matches!(result, Err(HeatStressError::CacheDirCreation(_, _))));
    }
}
