//! A loaded gridded time series: the rotated-grid geometry plus a lazy view
//! over the hourly values of one variable.

use crate::grid::error::GridDataError;
use crate::grid::field::GriddedField;
use crate::projection::RotatedPole;
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::{col, lit, DataType, IntoLazy, LazyFrame, TimeUnit};
use serde::{Deserialize, Serialize};

fn default_pole_lat() -> f64 {
    43.0
}

fn default_pole_lon() -> f64 {
    -170.0
}

/// Sidecar metadata describing a gridded variable: its name, units, the
/// rotated-grid axes and the rotated-pole attributes.
///
/// Stored as JSON next to the data table. The pole defaults match the
/// COSMO/ICON Lombardy grid the archive was produced from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMetadata {
    /// Variable name, e.g. `T_2M` or `TD_2M`.
    pub variable: String,
    /// Physical units of the stored values, e.g. `K`.
    pub units: String,
    /// Rotated-latitude axis values (degrees), one per grid row.
    pub rlat: Vec<f64>,
    /// Rotated-longitude axis values (degrees), one per grid column.
    pub rlon: Vec<f64>,
    #[serde(default = "default_pole_lat")]
    pub grid_north_pole_latitude: f64,
    #[serde(default = "default_pole_lon")]
    pub grid_north_pole_longitude: f64,
}

impl GridMetadata {
    /// Grid shape as `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rlat.len(), self.rlon.len())
    }

    /// The rotated-pole transform for this grid.
    pub fn rotated_pole(&self) -> RotatedPole {
        RotatedPole::new(
            self.grid_north_pole_latitude,
            self.grid_north_pole_longitude,
        )
    }
}

/// An hourly multi-month series of one gridded variable.
///
/// Holds the metadata eagerly and the values lazily; a snapshot is
/// materialized per timestamp on request, mirroring the dashboard's
/// date-and-hour selection.
#[derive(Clone)]
pub struct GridSeries {
    meta: GridMetadata,
    frame: LazyFrame,
    times: Vec<DateTime<Utc>>,
}

impl GridSeries {
    pub(crate) fn new(meta: GridMetadata, frame: LazyFrame, times: Vec<DateTime<Utc>>) -> Self {
        Self { meta, frame, times }
    }

    pub fn metadata(&self) -> &GridMetadata {
        &self.meta
    }

    /// All timestamps present in the series, sorted ascending.
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// The distinct calendar dates covered by the series, sorted.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.times.iter().map(|t| t.date_naive()).collect();
        dates.dedup();
        dates
    }

    /// Timestamps falling on one calendar date, for hour selection.
    pub fn times_for_date(&self, date: NaiveDate) -> Vec<DateTime<Utc>> {
        self.times
            .iter()
            .copied()
            .filter(|t| t.date_naive() == date)
            .collect()
    }

    /// Materializes the field at an exact timestamp.
    ///
    /// Cells absent from the table come out as NaN. Errors if the timestamp
    /// has no rows at all.
    pub fn snapshot_at(&self, timestamp: DateTime<Utc>) -> Result<GriddedField, GridDataError> {
        let (ny, nx) = self.meta.shape();

        let df = self
            .frame
            .clone()
            .filter(
                col("time")
                    .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                    .eq(lit(timestamp.naive_utc())),
            )
            .select([
                col("rlat_idx").cast(DataType::UInt32),
                col("rlon_idx").cast(DataType::UInt32),
                col("value").cast(DataType::Float64),
            ])
            .collect()?;

        if df.height() == 0 {
            return Err(GridDataError::SnapshotNotFound {
                variable: self.meta.variable.clone(),
                timestamp,
            });
        }

        let rows = df.column("rlat_idx")?.u32()?;
        let cols = df.column("rlon_idx")?.u32()?;
        let vals = df.column("value")?.f64()?;

        let mut values = vec![f64::NAN; ny * nx];
        for ((row, col_idx), value) in rows.into_iter().zip(cols).zip(vals) {
            let (row, col_idx) = match (row, col_idx) {
                (Some(r), Some(c)) => (r as usize, c as usize),
                _ => {
                    return Err(GridDataError::UnexpectedData {
                        variable: self.meta.variable.clone(),
                        message: "null grid cell index".to_string(),
                    })
                }
            };
            if row >= ny || col_idx >= nx {
                return Err(GridDataError::CellOutOfRange {
                    row,
                    col: col_idx,
                    ny,
                    nx,
                });
            }
            values[row * nx + col_idx] = value.unwrap_or(f64::NAN);
        }

        GriddedField::new(values, ny, nx, timestamp)
    }
}

/// Builds a series directly from an in-memory table, used by tests and by
/// callers that synthesize grids.
impl GridSeries {
    pub fn from_dataframe(
        meta: GridMetadata,
        df: polars::frame::DataFrame,
    ) -> Result<Self, GridDataError> {
        let times = super::loader::distinct_times(&df.clone().lazy())?;
        Ok(Self::new(meta, df.lazy(), times))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use polars::prelude::*;

    fn meta_2x3() -> GridMetadata {
        GridMetadata {
            variable: "T_2M".to_string(),
            units: "K".to_string(),
            rlat: vec![-0.1, 0.0],
            rlon: vec![0.0, 0.1, 0.2],
            grid_north_pole_latitude: 43.0,
            grid_north_pole_longitude: -170.0,
        }
    }

    fn table(times: &[DateTime<Utc>]) -> DataFrame {
        let mut t = Vec::new();
        let mut ri = Vec::new();
        let mut ci = Vec::new();
        let mut v = Vec::new();
        for (k, ts) in times.iter().enumerate() {
            for row in 0..2u32 {
                for col in 0..3u32 {
                    t.push(ts.naive_utc());
                    ri.push(row);
                    ci.push(col);
                    v.push(280.0 + k as f64 + (row * 3 + col) as f64);
                }
            }
        }
        df!(
            "time" => t,
            "rlat_idx" => ri,
            "rlon_idx" => ci,
            "value" => v,
        )
        .unwrap()
    }

    #[test]
    fn snapshot_extraction_by_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2023, 4, 1, 1, 0, 0).unwrap();
        let series = GridSeries::from_dataframe(meta_2x3(), table(&[t0, t1])).unwrap();

        assert_eq!(series.times(), &[t0, t1]);

        let snap = series.snapshot_at(t1).unwrap();
        assert_eq!(snap.shape(), (2, 3));
        assert_eq!(snap.get(0, 0), 281.0);
        assert_eq!(snap.get(1, 2), 286.0);
        assert_eq!(snap.timestamp(), t1);
    }

    #[test]
    fn missing_timestamp_errors() {
        let t0 = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let series = GridSeries::from_dataframe(meta_2x3(), table(&[t0])).unwrap();

        let absent = Utc.with_ymd_and_hms(2023, 9, 30, 0, 0, 0).unwrap();
        let err = series.snapshot_at(absent).unwrap_err();
        assert!(matches!(err, GridDataError::SnapshotNotFound { .. }));
    }

    #[test]
    fn date_and_hour_listing() {
        let t0 = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2023, 4, 2, 0, 0, 0).unwrap();
        let series = GridSeries::from_dataframe(meta_2x3(), table(&[t0, t1, t2])).unwrap();

        let dates = series.dates();
        assert_eq!(dates.len(), 2);
        assert_eq!(
            series.times_for_date(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()),
            vec![t0, t1]
        );
    }

    #[test]
    fn default_pole_attributes_apply() {
        let json = r#"{"variable":"T_2M","units":"K","rlat":[0.0],"rlon":[0.0]}"#;
        let meta: GridMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.grid_north_pole_latitude, 43.0);
        assert_eq!(meta.grid_north_pole_longitude, -170.0);
    }
}
