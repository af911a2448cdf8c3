//! The per-timestamp dashboard pipeline: from raw temperature and dew point
//! fields to every derived indicator plus a statistical summary.

use crate::grid::{GridAxis, GridDataError, GriddedField};
use crate::indices::catalog::{HeatIndexKind, MapLayer};
use crate::indices::formulas;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Grid(#[from] GridDataError),

    #[error("Temperature snapshot is at {temperature} but dew point is at {dew_point}")]
    TimestampMismatch {
        temperature: DateTime<Utc>,
        dew_point: DateTime<Utc>,
    },
}

/// All derived fields for one timestamp.
///
/// Built by [`IndexSnapshot::compute`] from a 2-meter temperature field and
/// a 2-meter dew point field, both in Kelvin. Dew points below 243.15 K are
/// treated as missing and filled by linear interpolation along rotated
/// latitude, then rotated longitude, before anything is derived.
pub struct IndexSnapshot {
    timestamp: DateTime<Utc>,
    temperature_c: GriddedField,
    relative_humidity: GriddedField,
    humidex: GriddedField,
    heat_index: GriddedField,
    wet_bulb: GriddedField,
    wbgt: GriddedField,
    lethal_heat_stress: GriddedField,
    utci: GriddedField,
}

impl IndexSnapshot {
    pub fn compute(
        temperature_k: &GriddedField,
        dew_point_k: &GriddedField,
    ) -> Result<Self, SnapshotError> {
        if temperature_k.timestamp() != dew_point_k.timestamp() {
            return Err(SnapshotError::TimestampMismatch {
                temperature: temperature_k.timestamp(),
                dew_point: dew_point_k.timestamp(),
            });
        }

        let dew_k = dew_point_k
            .mask_where(|v| v > formulas::DEW_POINT_VALID_MIN_K)
            .fill_gaps_linear(GridAxis::RotatedLat)
            .fill_gaps_linear(GridAxis::RotatedLon);

        let temperature_c = temperature_k.map(formulas::kelvin_to_celsius);
        let dew_c = dew_k.map(formulas::kelvin_to_celsius);

        let relative_humidity = temperature_c.zip_with(&dew_c, formulas::relative_humidity)?;
        let humidex = temperature_k.zip_with(&dew_k, formulas::humidex)?;
        let heat_index = temperature_c.zip_with(&relative_humidity, formulas::heat_index)?;
        let wet_bulb = temperature_c.zip_with(&relative_humidity, formulas::wet_bulb)?;
        let wbgt = temperature_c.zip_with(&wet_bulb, formulas::wbgt)?;
        let lethal_heat_stress =
            wet_bulb.zip_with(&relative_humidity, formulas::lethal_heat_stress)?;
        let utci = temperature_c.zip_with(&relative_humidity, formulas::utci)?;

        Ok(Self {
            timestamp: temperature_k.timestamp(),
            temperature_c,
            relative_humidity,
            humidex,
            heat_index,
            wet_bulb,
            wbgt,
            lethal_heat_stress,
            utci,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The field backing a map layer.
    pub fn field(&self, layer: MapLayer) -> &GriddedField {
        match layer {
            MapLayer::Temperature => &self.temperature_c,
            MapLayer::RelativeHumidity => &self.relative_humidity,
            MapLayer::Index(kind) => self.index_field(kind),
        }
    }

    pub fn index_field(&self, kind: HeatIndexKind) -> &GriddedField {
        match kind {
            HeatIndexKind::Humidex => &self.humidex,
            HeatIndexKind::Wbgt => &self.wbgt,
            HeatIndexKind::LethalHeatStress => &self.lethal_heat_stress,
            HeatIndexKind::Utci => &self.utci,
        }
    }

    /// Heat Index field; computed alongside the catalog indices but not
    /// part of the threshold summary.
    pub fn heat_index(&self) -> &GriddedField {
        &self.heat_index
    }

    pub fn wet_bulb(&self) -> &GriddedField {
        &self.wet_bulb
    }

    /// The statistical summary matrix of the dashboard: one row per
    /// threshold index. All statistics ignore NaN cells; an all-NaN field
    /// yields NaN statistics.
    pub fn summary(&self) -> Vec<SummaryRow> {
        HeatIndexKind::ALL
            .iter()
            .map(|&kind| {
                let field = self.index_field(kind);
                SummaryRow {
                    kind,
                    mean: field.nan_mean().unwrap_or(f64::NAN),
                    median: field.nan_median().unwrap_or(f64::NAN),
                    p95: field.nan_percentile(95.0).unwrap_or(f64::NAN),
                    p99: field.nan_percentile(99.0).unwrap_or(f64::NAN),
                    max: field.nan_max().unwrap_or(f64::NAN),
                    threshold_c: kind.threshold_c(),
                }
            })
            .collect()
    }
}

/// One row of the summary matrix (°C throughout).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub kind: HeatIndexKind,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub threshold_c: f64,
}
