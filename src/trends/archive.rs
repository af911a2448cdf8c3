//! Loading the historical statistics archive.
//!
//! The archive is one flat table spanning 1981–2023: a `Timestamp` column,
//! an `Indice` column naming the heat-stress index each row belongs to, and
//! per-timestamp spatial statistics, of which the 99th-percentile column is
//! the one the trend charts aggregate.

use crate::trends::aggregate::TrendArchive;
use crate::trends::error::TrendError;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::collections::{hash_map::Entry, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Name of the statistic column the trend analyzer aggregates.
pub const STAT_COLUMN: &str = "99° Perc. (°C)";

/// Human-readable label for [`STAT_COLUMN`].
pub const STAT_LABEL: &str = "99th percentile";

/// Where the archive comes from.
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// A local CSV file; converted to parquet in the cache dir on first load.
    Csv(PathBuf),
    /// A gzipped CSV fetched over HTTP, then cached as parquet.
    Url(String),
}

impl ArchiveSource {
    fn cache_file_name(&self) -> String {
        let stem = match self {
            ArchiveSource::Csv(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "archive".to_string()),
            ArchiveSource::Url(url) => url
                .rsplit('/')
                .next()
                .unwrap_or("archive")
                .trim_end_matches(".gz")
                .trim_end_matches(".csv")
                .to_string(),
        };
        format!("trends-{stem}.parquet")
    }
}

/// Loads trend archives and memoizes the resulting frames, the equivalent
/// of the dashboard's page-level data cache.
pub struct TrendFetcher {
    cache_dir: PathBuf,
    download_client: Client,
    frame_cache: Mutex<HashMap<String, LazyFrame>>,
}

impl TrendFetcher {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            download_client: Client::new(),
            frame_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Gets an archive handle for a source, using the memo cache if possible.
    pub async fn get_archive(&self, source: &ArchiveSource) -> Result<TrendArchive, TrendError> {
        let key = source.cache_file_name();

        {
            let cache = self.frame_cache.lock().await;
            if let Some(frame) = cache.get(&key) {
                return Ok(TrendArchive::new(frame.clone()));
            }
        }

        let frame = self.load_frame(source, &key).await?;

        let mut cache = self.frame_cache.lock().await;
        match cache.entry(key) {
            Entry::Occupied(entry) => Ok(TrendArchive::new(entry.get().clone())),
            Entry::Vacant(entry) => {
                entry.insert(frame.clone());
                Ok(TrendArchive::new(frame))
            }
        }
    }

    async fn load_frame(
        &self,
        source: &ArchiveSource,
        cache_name: &str,
    ) -> Result<LazyFrame, TrendError> {
        let parquet_path = self.cache_dir.join(cache_name);

        if fs::metadata(&parquet_path).await.is_ok() {
            info!("Archive cache hit at {:?}", parquet_path);
        } else {
            warn!("Archive cache miss for {:?}. Reading source.", source);
            let bytes = match source {
                ArchiveSource::Csv(path) => fs::read(path)
                    .await
                    .map_err(|e| TrendError::CsvReadIo(path.clone(), e))?,
                ArchiveSource::Url(url) => self.download(url).await?,
            };
            let df = csv_to_dataframe(bytes).await?;

            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| TrendError::CacheDirCreation(self.cache_dir.clone(), e))?;
            cache_dataframe(df, &parquet_path).await?;
            info!("Cached archive to {:?}", parquet_path);
        }

        let frame = LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| TrendError::ParquetScan(parquet_path.clone(), e))?;
        Ok(with_derived_columns(frame))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TrendError> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| TrendError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    TrendError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    TrendError::NetworkRequest(url.to_string(), e)
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
            "Downloaded and decompressed {} archive bytes from {}",
            decompressed.len(),
            url
        );
        Ok(decompressed)
    }
}

/// Adds the grouping columns every aggregation needs: `Year`, `DayOfYear`
/// and `Date`, all derived from the parsed `Timestamp`.
pub(crate) fn with_derived_columns(frame: LazyFrame) -> LazyFrame {
    frame.with_columns([
        col("Timestamp").dt().year().alias("Year"),
        col("Timestamp")
            .dt()
            .ordinal_day()
            .cast(DataType::Int32)
            .alias("DayOfYear"),
        col("Timestamp").dt().date().alias("Date"),
    ])
}

async fn csv_to_dataframe(bytes: Vec<u8>) -> Result<DataFrame, TrendError> {
    task::spawn_blocking(move || {
        let mut temp_file = NamedTempFile::new()
            .map_err(|e| TrendError::CsvReadIo(PathBuf::from("<archive>"), e))?;
        temp_file
            .write_all(&bytes)
            .and_then(|_| temp_file.flush())
            .map_err(|e| TrendError::CsvReadIo(temp_file.path().to_path_buf(), e))?;

        let path = temp_file.path().to_path_buf();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.clone()))
            .map_err(|e| TrendError::CsvReadPolars(path.clone(), e))?
            .finish()
            .map_err(|e| TrendError::CsvReadPolars(path, e))?;

        for column in ["Timestamp", "Indice", STAT_COLUMN] {
            if df.column(column).is_err() {
                return Err(TrendError::MissingColumn(column.to_string()));
            }
        }

        Ok(df)
    })
    .await?
}

async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), TrendError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| TrendError::ParquetWriteIo(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| TrendError::ParquetWritePolars(path_buf, e))?;
        Ok::<(), TrendError>(())
    })
    .await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn csv_parses_archive_columns() {
        let csv = format!(
            "Timestamp,Indice,{STAT_COLUMN}\n\
             2020-07-01 12:00:00,Humidex,43.1\n\
             2020-07-01 13:00:00,WBGT,29.0\n"
        )
        .into_bytes();
        let df = csv_to_dataframe(csv).await.unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert!(df.column("Timestamp").unwrap().dtype().is_temporal());
    }

    #[tokio::test]
    async fn missing_stat_column_is_reported() {
        let csv = b"Timestamp,Indice\n2020-07-01 12:00:00,Humidex\n".to_vec();
        let err = csv_to_dataframe(csv).await.unwrap_err();
        assert!(matches!(err, TrendError::MissingColumn(_)));
    }

    #[test]
    fn cache_names_are_stable_per_source() {
        let a = ArchiveSource::Csv(PathBuf::from("data/heatstress_reduced.csv"));
        assert_eq!(a.cache_file_name(), "trends-heatstress_reduced.parquet");

        let b = ArchiveSource::Url("https://example.org/archive/heatstress.csv.gz".to_string());
        assert_eq!(b.cache_file_name(), "trends-heatstress.parquet");
    }

    #[tokio::test]
    async fn local_csv_round_trips_through_parquet_cache() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("mini.csv");
        std::fs::write(
            &csv_path,
            format!(
                "Timestamp,Indice,{STAT_COLUMN}\n\
                 2020-07-01 12:00:00,Humidex,46.0\n\
                 2020-07-02 12:00:00,Humidex,44.0\n"
            ),
        )
        .unwrap();

        let fetcher = TrendFetcher::new(dir.path());
        let archive = fetcher
            .get_archive(&ArchiveSource::Csv(csv_path))
            .await
            .unwrap();

        let counts = archive
            .annual_exceedances(crate::HeatIndexKind::Humidex)
            .unwrap();
        assert_eq!(counts.years, vec![2020]);
        assert_eq!(counts.counts, vec![1]);
    }
}
