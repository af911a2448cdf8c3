//! Aggregations over the historical archive: per-year threshold exceedance
//! counts and per-year daily-maximum curves.

use crate::indices::catalog::HeatIndexKind;
use crate::trends::archive::STAT_COLUMN;
use crate::trends::error::TrendError;
use chrono::NaiveDate;
use polars::frame::DataFrame;
use polars::prelude::*;

/// Offset between polars epoch days (1970-01-01) and chrono's
/// day-zero (0001-01-01).
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A handle over the loaded archive frame, exposing the trend-analyzer
/// aggregations. Cheap to clone; nothing materializes until an aggregation
/// is called.
#[derive(Clone)]
pub struct TrendArchive {
    frame: LazyFrame,
}

impl TrendArchive {
    pub(crate) fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    fn for_index(&self, kind: HeatIndexKind) -> LazyFrame {
        self.frame
            .clone()
            .filter(col("Indice").eq(lit(kind.archive_name())))
    }

    /// The years the archive covers for one index, sorted ascending.
    pub fn years(&self, kind: HeatIndexKind) -> Result<Vec<i32>, TrendError> {
        let df = self
            .for_index(kind)
            .select([col("Year").unique().sort(SortOptions::default())])
            .collect()?;
        let years = df.column("Year")?.i32()?;
        Ok(years.into_iter().flatten().collect())
    }

    /// How many days per year the index's daily maximum (of the archived
    /// 99th-percentile statistic) exceeded its danger threshold.
    ///
    /// Grouping is by (year, day-of-year) with a per-day max, then a strict
    /// `>` comparison against [`HeatIndexKind::threshold_c`], counted per
    /// year. Years with archive rows but no exceedances report zero.
    pub fn annual_exceedances(
        &self,
        kind: HeatIndexKind,
    ) -> Result<AnnualExceedances, TrendError> {
        let threshold = kind.threshold_c();

        let df = self
            .for_index(kind)
            .group_by([col("Year"), col("DayOfYear")])
            .agg([col(STAT_COLUMN).max().alias("day_max")])
            .group_by([col("Year")])
            .agg([col("day_max")
                .gt(lit(threshold))
                .sum()
                .cast(DataType::UInt32)
                .alias("exceedances")])
            .sort(["Year"], Default::default())
            .collect()?;

        let years = df.column("Year")?.i32()?;
        let counts = df.column("exceedances")?.u32()?;

        Ok(AnnualExceedances {
            kind,
            threshold_c: threshold,
            years: years.into_iter().flatten().collect(),
            counts: counts.into_iter().flatten().collect(),
        })
    }

    /// The per-date maxima of the archived statistic across one year, for
    /// the detailed line chart.
    pub fn daily_max_series(
        &self,
        kind: HeatIndexKind,
        year: i32,
    ) -> Result<DailyMaxSeries, TrendError> {
        let df = self
            .for_index(kind)
            .filter(col("Year").eq(lit(year)))
            .group_by([col("Date")])
            .agg([col(STAT_COLUMN).max().alias("day_max")])
            .sort(["Date"], Default::default())
            .collect()?;

        let date_col = df.column("Date")?.date()?;
        let value_col = df.column("day_max")?.f64()?;

        let mut dates = Vec::with_capacity(date_col.len());
        for days in date_col.into_iter().flatten() {
            let date = NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
                .ok_or(TrendError::InvalidDate(days as i64))?;
            dates.push(date);
        }

        Ok(DailyMaxSeries {
            kind,
            year,
            threshold_c: kind.threshold_c(),
            dates,
            values: value_col.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        })
    }
}

/// Per-year exceedance counts for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualExceedances {
    pub kind: HeatIndexKind,
    pub threshold_c: f64,
    pub years: Vec<i32>,
    pub counts: Vec<u32>,
}

impl AnnualExceedances {
    /// The bar-chart table: one row per year.
    pub fn to_dataframe(&self) -> Result<DataFrame, TrendError> {
        Ok(df!(
            "Year" => &self.years,
            "Exceedances" => &self.counts,
        )?)
    }
}

/// Daily maxima across one year for one index.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMaxSeries {
    pub kind: HeatIndexKind,
    pub year: i32,
    pub threshold_c: f64,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl DailyMaxSeries {
    pub fn to_dataframe(&self) -> Result<DataFrame, TrendError> {
        Ok(df!(
            "Date" => &self.dates,
            "DailyMax" => &self.values,
        )?)
    }
}
