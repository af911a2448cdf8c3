//! The in-memory representation of one gridded scalar field.

use crate::grid::error::GridDataError;
use chrono::{DateTime, Utc};

/// Which grid axis an operation runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    /// Along rotated latitude (down a column).
    RotatedLat,
    /// Along rotated longitude (across a row).
    RotatedLon,
}

/// A 2D scalar field on the rotated grid, tagged with its timestamp.
///
/// Values are stored row-major: `values[row * nx + col]` where `row` indexes
/// rotated latitude and `col` rotated longitude. Fields are immutable once
/// built; every transform returns a new field carrying the same timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    values: Vec<f64>,
    ny: usize,
    nx: usize,
    timestamp: DateTime<Utc>,
}

impl GriddedField {
    /// Builds a field from row-major values, validating the shape.
    pub fn new(
        values: Vec<f64>,
        ny: usize,
        nx: usize,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, GridDataError> {
        if values.len() != ny * nx {
            return Err(GridDataError::ShapeMismatch {
                expected: ny * nx,
                found: values.len(),
            });
        }
        Ok(Self {
            values,
            ny,
            nx,
            timestamp,
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Grid shape as `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.nx + col]
    }

    /// Applies an element-wise transform, producing a new field.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> GriddedField {
        GriddedField {
            values: self.values.iter().map(|&v| f(v)).collect(),
            ny: self.ny,
            nx: self.nx,
            timestamp: self.timestamp,
        }
    }

    /// Combines two same-shaped fields element-wise.
    pub fn zip_with(
        &self,
        other: &GriddedField,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<GriddedField, GridDataError> {
        if self.shape() != other.shape() {
            return Err(GridDataError::ShapeMismatch {
                expected: self.ny * self.nx,
                found: other.ny * other.nx,
            });
        }
        Ok(GriddedField {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            ny: self.ny,
            nx: self.nx,
            timestamp: self.timestamp,
        })
    }

    /// Replaces values failing the predicate with NaN.
    pub fn mask_where(&self, keep: impl Fn(f64) -> bool) -> GriddedField {
        self.map(|v| if keep(v) { v } else { f64::NAN })
    }

    /// Minimum over non-NaN cells, if any.
    pub fn nan_min(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
    }

    /// Maximum over non-NaN cells, if any.
    pub fn nan_max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// Mean over non-NaN cells, if any.
    pub fn nan_mean(&self) -> Option<f64> {
        let (sum, n) = self
            .values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Percentile over non-NaN cells with linear interpolation between
    /// order statistics (numpy's default). `p` is in `[0, 100]`.
    pub fn nan_percentile(&self, p: f64) -> Option<f64> {
        let mut clean: Vec<f64> = self.values.iter().copied().filter(|v| !v.is_nan()).collect();
        if clean.is_empty() {
            return None;
        }
        clean.sort_by(|a, b| a.total_cmp(b));
        let rank = p.clamp(0.0, 100.0) / 100.0 * (clean.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let frac = rank - lo as f64;
        Some(clean[lo] + (clean[hi] - clean[lo]) * frac)
    }

    pub fn nan_median(&self) -> Option<f64> {
        self.nan_percentile(50.0)
    }

    /// Fills interior NaN runs along one axis by linear interpolation
    /// between the nearest valid neighbors. Runs touching a grid edge stay
    /// NaN (interpolation, not extrapolation), and valid cells are never
    /// modified.
    pub fn fill_gaps_linear(&self, axis: GridAxis) -> GriddedField {
        let mut out = self.values.clone();
        let (lines, len, stride, line_stride) = match axis {
            GridAxis::RotatedLon => (self.ny, self.nx, 1usize, self.nx),
            GridAxis::RotatedLat => (self.nx, self.ny, self.nx, 1usize),
        };

        for line in 0..lines {
            let base = line * line_stride;
            let mut prev_valid: Option<usize> = None;
            for i in 0..len {
                let idx = base + i * stride;
                if !out[idx].is_nan() {
                    if let Some(p) = prev_valid {
                        if i > p + 1 {
                            let a = out[base + p * stride];
                            let b = out[idx];
                            let span = (i - p) as f64;
                            for k in (p + 1)..i {
                                let t = (k - p) as f64 / span;
                                out[base + k * stride] = a + (b - a) * t;
                            }
                        }
                    }
                    prev_valid = Some(i);
                }
            }
        }

        GriddedField {
            values: out,
            ny: self.ny,
            nx: self.nx,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 7, 1, 12, 0, 0).unwrap()
    }

    fn field(values: Vec<f64>, ny: usize, nx: usize) -> GriddedField {
        GriddedField::new(values, ny, nx, ts()).unwrap()
    }

    #[test]
    fn rejects_wrong_shape() {
        let err = GriddedField::new(vec![1.0, 2.0, 3.0], 2, 2, ts());
        assert!(matches!(
            err,
            Err(GridDataError::ShapeMismatch { expected: 4, found: 3 })
        ));
    }

    #[test]
    fn map_preserves_timestamp_and_shape() {
        let f = field(vec![273.15, 283.15, 293.15, 303.15], 2, 2);
        let c = f.map(|k| k - 273.15);
        assert_eq!(c.timestamp(), f.timestamp());
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c.get(0, 0), 0.0);
        assert_eq!(c.get(1, 1), 30.0);
    }

    #[test]
    fn zip_with_rejects_shape_mismatch() {
        let a = field(vec![1.0; 4], 2, 2);
        let b = field(vec![1.0; 6], 2, 3);
        assert!(a.zip_with(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn stats_ignore_nan() {
        let f = field(vec![1.0, f64::NAN, 3.0, 5.0, f64::NAN, 7.0], 2, 3);
        assert_eq!(f.nan_min(), Some(1.0));
        assert_eq!(f.nan_max(), Some(7.0));
        assert_eq!(f.nan_mean(), Some(4.0));
        assert_eq!(f.nan_median(), Some(4.0));
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let f = field(vec![0.0, 10.0, 20.0, 30.0, 40.0, f64::NAN], 2, 3);
        assert_eq!(f.nan_percentile(0.0), Some(0.0));
        assert_eq!(f.nan_percentile(100.0), Some(40.0));
        assert_eq!(f.nan_percentile(50.0), Some(20.0));
        // Between 30 and 40 at 95%: rank 3.8 -> 38.0
        assert!((f.nan_percentile(95.0).unwrap() - 38.0).abs() < 1e-12);
    }

    #[test]
    fn all_nan_stats_are_none() {
        let f = field(vec![f64::NAN; 4], 2, 2);
        assert_eq!(f.nan_min(), None);
        assert_eq!(f.nan_mean(), None);
        assert_eq!(f.nan_percentile(95.0), None);
    }

    #[test]
    fn gap_fill_interpolates_interior_runs_rowwise() {
        let f = field(vec![0.0, f64::NAN, f64::NAN, 3.0], 1, 4);
        let filled = f.fill_gaps_linear(GridAxis::RotatedLon);
        assert_eq!(filled.values(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn gap_fill_leaves_edges_nan() {
        let f = field(vec![f64::NAN, 1.0, 2.0, f64::NAN], 1, 4);
        let filled = f.fill_gaps_linear(GridAxis::RotatedLon);
        assert!(filled.values()[0].is_nan());
        assert!(filled.values()[3].is_nan());
        assert_eq!(filled.values()[1], 1.0);
    }

    #[test]
    fn gap_fill_columnwise() {
        // One column with a gap, one intact.
        let f = field(vec![10.0, 1.0, f64::NAN, 1.0, 30.0, 1.0], 3, 2);
        let filled = f.fill_gaps_linear(GridAxis::RotatedLat);
        assert_eq!(filled.get(1, 0), 20.0);
        assert_eq!(filled.get(1, 1), 1.0);
    }

    #[test]
    fn gap_fill_never_touches_valid_cells() {
        let vals = vec![5.0, 6.0, f64::NAN, 8.0, 9.0, 10.0];
        let f = field(vals.clone(), 2, 3);
        let filled = f.fill_gaps_linear(GridAxis::RotatedLon);
        for (i, v) in vals.iter().enumerate() {
            if !v.is_nan() {
                assert_eq!(filled.values()[i], *v);
            }
        }
    }
}
