//! Loading gridded series from disk or over the network.
//!
//! The on-disk store is a long table (`time`, `rlat_idx`, `rlon_idx`,
//! `value`) next to a JSON metadata sidecar. CSV.gz input is converted to a
//! parquet cache on first load; parquet input is scanned directly.

use crate::grid::error::GridDataError;
use crate::grid::series::{GridMetadata, GridSeries};
use async_compression::tokio::bufread::GzipDecoder;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Where a gridded series comes from. The metadata sidecar is always a
/// local JSON file.
#[derive(Debug, Clone)]
pub enum GridSource {
    /// A ready long-table parquet file; scanned in place, never copied.
    Parquet { data: PathBuf, metadata: PathBuf },
    /// A gzipped CSV long table; converted to parquet in the cache dir.
    CsvGz { data: PathBuf, metadata: PathBuf },
    /// A gzipped CSV long table fetched over HTTP, then cached as parquet.
    Url { data: String, metadata: PathBuf },
}

impl GridSource {
    fn metadata_path(&self) -> &Path {
        match self {
            GridSource::Parquet { metadata, .. } => metadata,
            GridSource::CsvGz { metadata, .. } => metadata,
            GridSource::Url { metadata, .. } => metadata,
        }
    }

    /// Identifies the backing data table. Two sidecars may declare the same
    /// variable name; memoization and parquet caching must not conflate
    /// their tables.
    fn data_id(&self) -> String {
        match self {
            GridSource::Parquet { data, .. } => data.to_string_lossy().into_owned(),
            GridSource::CsvGz { data, .. } => data.to_string_lossy().into_owned(),
            GridSource::Url { data, .. } => data.clone(),
        }
    }
}

/// Loads grid series and memoizes them per variable, so repeated snapshot
/// and render requests against the same series never re-read the table.
pub struct GridFetcher {
    cache_dir: PathBuf,
    download_client: Client,
    series_cache: Mutex<HashMap<String, GridSeries>>,
}

impl GridFetcher {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            download_client: Client::new(),
            series_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Gets a series for a source, using the memo cache if possible.
    pub async fn get_series(&self, source: &GridSource) -> Result<GridSeries, GridDataError> {
        let meta = self.read_metadata(source.metadata_path()).await?;
        let key = format!("{}|{}", meta.variable, source.data_id());

        {
            let cache = self.series_cache.lock().await;
            if let Some(series) = cache.get(&key) {
                return Ok(series.clone());
            }
        }

        let frame = self.load_frame(source, &meta).await?;
        let times = distinct_times(&frame)?;
        let series = GridSeries::new(meta, frame, times);

        let mut cache = self.series_cache.lock().await;
        match cache.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(series.clone());
                Ok(series)
            }
        }
    }

    async fn read_metadata(&self, path: &Path) -> Result<GridMetadata, GridDataError> {
        let raw = fs::read(path)
            .await
            .map_err(|e| GridDataError::MetadataRead(path.to_path_buf(), e))?;
        serde_json::from_slice(&raw)
            .map_err(|e| GridDataError::MetadataParse(path.to_path_buf(), e))
    }

    async fn load_frame(
        &self,
        source: &GridSource,
        meta: &GridMetadata,
    ) -> Result<LazyFrame, GridDataError> {
        match source {
            GridSource::Parquet { data, .. } => scan_grid_parquet(data),
            GridSource::CsvGz { data, .. } => {
                let parquet_path = self.cache_path(&meta.variable, source);
                if fs::metadata(&parquet_path).await.is_ok() {
                    info!(
                        "Cache hit for grid variable {} at {:?}",
                        meta.variable, parquet_path
                    );
                } else {
                    warn!(
                        "Cache miss for grid variable {}. Converting {:?} to parquet.",
                        meta.variable, data
                    );
                    let raw = decompress_file(data).await?;
                    let df = csv_to_dataframe(raw, &meta.variable).await?;
                    self.write_cache(df, &parquet_path).await?;
                }
                scan_grid_parquet(&parquet_path)
            }
            GridSource::Url { data: url, .. } => {
                let parquet_path = self.cache_path(&meta.variable, source);
                if fs::metadata(&parquet_path).await.is_ok() {
                    info!(
                        "Cache hit for grid variable {} at {:?}",
                        meta.variable, parquet_path
                    );
                } else {
                    warn!(
                        "Cache miss for grid variable {}. Downloading from {}.",
                        meta.variable, url
                    );
                    let raw = self.download(url).await?;
                    let df = csv_to_dataframe(raw, &meta.variable).await?;
                    self.write_cache(df, &parquet_path).await?;
                }
                scan_grid_parquet(&parquet_path)
            }
        }
    }

    fn cache_path(&self, variable: &str, source: &GridSource) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        source.data_id().hash(&mut hasher);
        self.cache_dir
            .join(format!("grid-{variable}-{:016x}.parquet", hasher.finish()))
    }

    /// Downloads and decompresses a gzipped CSV table.
    async fn download(&self, url: &str) -> Result<Vec<u8>, GridDataError> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| GridDataError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    GridDataError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    GridDataError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut decoder = GzipDecoder::new(StreamReader::new(stream));
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await?;
        info!(
            "Downloaded and decompressed {} bytes from {}",
            decompressed.len(),
            url
        );
        Ok(decompressed)
    }

    async fn write_cache(&self, df: DataFrame, path: &Path) -> Result<(), GridDataError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| GridDataError::CacheDirCreation(self.cache_dir.clone(), e))?;
        cache_dataframe(df, path).await?;
        info!("Cached grid table to {:?}", path);
        Ok(())
    }
}

fn scan_grid_parquet(path: &Path) -> Result<LazyFrame, GridDataError> {
    LazyFrame::scan_parquet(path, Default::default())
        .map_err(|e| GridDataError::ParquetScan(path.to_path_buf(), e))
}

async fn decompress_file(path: &Path) -> Result<Vec<u8>, GridDataError> {
    let file = fs::File::open(path).await?;
    let mut decoder = GzipDecoder::new(BufReader::new(file));
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).await?;
    Ok(decompressed)
}

/// Parses raw CSV bytes (with header) into a DataFrame on a blocking task,
/// letting polars parse the `time` column as a datetime.
async fn csv_to_dataframe(bytes: Vec<u8>, variable: &str) -> Result<DataFrame, GridDataError> {
    let variable = variable.to_string();

    task::spawn_blocking(move || {
        let mut temp_file = NamedTempFile::new().map_err(|e| GridDataError::CsvReadIo {
            variable: variable.clone(),
            source: e,
        })?;
        temp_file
            .write_all(&bytes)
            .and_then(|_| temp_file.flush())
            .map_err(|e| GridDataError::CsvReadIo {
                variable: variable.clone(),
                source: e,
            })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
            .map_err(|e| GridDataError::CsvReadPolars {
                variable: variable.clone(),
                source: e,
            })?
            .finish()
            .map_err(|e| GridDataError::CsvReadPolars {
                variable: variable.clone(),
                source: e,
            })?;

        for column in ["time", "rlat_idx", "rlon_idx", "value"] {
            if df.column(column).is_err() {
                return Err(GridDataError::MissingColumn {
                    variable,
                    column: column.to_string(),
                });
            }
        }

        Ok(df)
    })
    .await?
}

/// Writes a DataFrame to a parquet file via spawn_blocking.
async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), GridDataError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| GridDataError::ParquetWriteIo(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| GridDataError::ParquetWritePolars(path_buf, e))?;
        Ok::<(), GridDataError>(())
    })
    .await??;
    Ok(())
}

/// Distinct timestamps in a grid table, sorted ascending.
pub(crate) fn distinct_times(frame: &LazyFrame) -> Result<Vec<DateTime<Utc>>, GridDataError> {
    let df = frame
        .clone()
        .select([col("time")
            .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
            .unique()
            .sort(SortOptions::default())])
        .collect()?;

    let times = df.column("time")?.datetime()?;
    let mut out = Vec::with_capacity(times.len());
    for ms in times.into_iter().flatten() {
        let ts = DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
            GridDataError::UnexpectedData {
                variable: String::new(),
                message: format!("timestamp {ms} out of range"),
            }
        })?;
        out.push(ts);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use polars::prelude::df;

    #[tokio::test]
    async fn csv_parses_long_table_with_datetimes() {
        let csv = b"time,rlat_idx,rlon_idx,value\n\
            2023-04-01T00:00:00,0,0,285.5\n\
            2023-04-01T00:00:00,0,1,286.0\n\
            2023-04-01T01:00:00,0,0,285.0\n"
            .to_vec();
        let df = csv_to_dataframe(csv, "T_2M").await.unwrap();
        assert_eq!(df.shape(), (3, 4));
        assert!(df.column("time").unwrap().dtype().is_temporal());
    }

    #[tokio::test]
    async fn csv_missing_column_is_reported() {
        let csv = b"time,value\n2023-04-01T00:00:00,285.5\n".to_vec();
        let err = csv_to_dataframe(csv, "T_2M").await.unwrap_err();
        assert!(matches!(err, GridDataError::MissingColumn { .. }));
    }

    #[test]
    fn distinct_times_sorted_and_deduplicated() {
        let t0 = Utc.with_ymd_and_hms(2023, 4, 1, 1, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let df = df!(
            "time" => vec![t0.naive_utc(), t1.naive_utc(), t0.naive_utc()],
            "rlat_idx" => vec![0u32, 0, 1],
            "rlon_idx" => vec![0u32, 0, 0],
            "value" => vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        let times = distinct_times(&df.lazy()).unwrap();
        assert_eq!(times, vec![t1, t0]);
    }

    #[tokio::test]
    async fn sources_sharing_a_variable_name_are_memoized_separately() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = GridFetcher::new(dir.path());

        // Two sidecars both declare T_2M, but back different tables.
        let meta_json = r#"{"variable":"T_2M","units":"K","rlat":[0.0],"rlon":[0.0]}"#;
        let meta_a = dir.path().join("a.json");
        let meta_b = dir.path().join("b.json");
        std::fs::write(&meta_a, meta_json).unwrap();
        std::fs::write(&meta_b, meta_json).unwrap();

        let ts = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let table = |value: f64| {
            df!(
                "time" => vec![ts.naive_utc()],
                "rlat_idx" => vec![0u32],
                "rlon_idx" => vec![0u32],
                "value" => vec![value],
            )
            .unwrap()
        };

        let data_a = dir.path().join("a.parquet");
        let data_b = dir.path().join("b.parquet");
        cache_dataframe(table(280.0), &data_a).await.unwrap();
        cache_dataframe(table(290.0), &data_b).await.unwrap();

        let series_a = fetcher
            .get_series(&GridSource::Parquet {
                data: data_a,
                metadata: meta_a,
            })
            .await
            .unwrap();
        let series_b = fetcher
            .get_series(&GridSource::Parquet {
                data: data_b,
                metadata: meta_b,
            })
            .await
            .unwrap();

        assert_eq!(series_a.snapshot_at(ts).unwrap().get(0, 0), 280.0);
        assert_eq!(series_b.snapshot_at(ts).unwrap().get(0, 0), 290.0);
    }

    #[tokio::test]
    async fn parquet_round_trip_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid-test.parquet");
        let df = df!(
            "time" => vec![Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap().naive_utc()],
            "rlat_idx" => vec![0u32],
            "rlon_idx" => vec![0u32],
            "value" => vec![285.5],
        )
        .unwrap();

        cache_dataframe(df, &path).await.unwrap();
        let back = scan_grid_parquet(&path).unwrap().collect().unwrap();
        assert_eq!(back.shape(), (1, 4));
    }
}
