//! Compositing a gridded field over a basemap tile.
//!
//! The basemap covers a regular lat/lon extent; the field lives on the
//! rotated grid. Each basemap pixel is mapped back into rotated coordinates
//! and takes the nearest grid cell's value, which is then colormapped and
//! alpha-blended over the tile. Pixels outside the grid, or over NaN cells,
//! keep the plain basemap.

use crate::grid::{GridMetadata, GriddedField};
use crate::projection::GeoBounds;
use crate::render::colormap::Colormap;
use image::{Rgba, RgbaImage};

/// Default overlay opacity, as used by the dashboard maps.
pub const DEFAULT_ALPHA: f64 = 0.6;

/// Vertical exaggeration applied to the 3D surface relief.
pub const SURFACE_Z_EXAGGERATION: f64 = 0.05;

/// Nearest entry of an ascending axis, or None when `v` falls outside the
/// axis by more than half the local spacing.
fn nearest_index(axis: &[f64], v: f64) -> Option<usize> {
    if axis.is_empty() || v.is_nan() {
        return None;
    }
    if axis.len() == 1 {
        return Some(0);
    }

    let i = axis.partition_point(|&a| a < v);
    let best = if i == 0 {
        0
    } else if i >= axis.len() {
        axis.len() - 1
    } else if (v - axis[i - 1]).abs() <= (axis[i] - v).abs() {
        i - 1
    } else {
        i
    };

    let gap = if best == 0 {
        axis[1] - axis[0]
    } else if best == axis.len() - 1 {
        axis[best] - axis[best - 1]
    } else {
        (axis[best + 1] - axis[best]).min(axis[best] - axis[best - 1])
    };

    ((v - axis[best]).abs() <= gap * 0.5 + f64::EPSILON).then_some(best)
}

/// Blends a colormapped field over a basemap tile covering `bounds`.
///
/// The returned image has the basemap's dimensions. `vmin`/`vmax` come from
/// the field's own NaN-aware range, matching the per-map normalization of
/// the dashboard.
pub fn overlay_field(
    basemap: &RgbaImage,
    field: &GriddedField,
    meta: &GridMetadata,
    bounds: GeoBounds,
    colormap: Colormap,
    alpha: f64,
) -> RgbaImage {
    let (width, height) = basemap.dimensions();
    let mut out = basemap.clone();

    let vmin = field.nan_min().unwrap_or(0.0);
    let vmax = field.nan_max().unwrap_or(1.0);
    let alpha = alpha.clamp(0.0, 1.0);
    let pole = meta.rotated_pole();

    for py in 0..height {
        // Basemap rows run north to south.
        let lat = bounds.lat_max - (py as f64 + 0.5) / height as f64 * bounds.height();
        for px in 0..width {
            let lon = bounds.lon_min + (px as f64 + 0.5) / width as f64 * bounds.width();
            let (rlat, rlon) = pole.from_geographic(lat, lon);

            let (Some(row), Some(col)) = (
                nearest_index(&meta.rlat, rlat),
                nearest_index(&meta.rlon, rlon),
            ) else {
                continue;
            };

            let value = field.get(row, col);
            if value.is_nan() {
                continue;
            }

            let Rgba([r, g, b, _]) = colormap.color_for(value, vmin, vmax, 255);
            let under = out.get_pixel(px, py).0;
            let blend = |top: u8, bottom: u8| -> u8 {
                (top as f64 * alpha + bottom as f64 * (1.0 - alpha)).round() as u8
            };
            out.put_pixel(
                px,
                py,
                Rgba([
                    blend(r, under[0]),
                    blend(g, under[1]),
                    blend(b, under[2]),
                    255,
                ]),
            );
        }
    }

    out
}

/// Converts a basemap tile to grayscale (channel mean), the underlay the
/// 3D surface view uses.
pub fn grayscale(basemap: &RgbaImage) -> RgbaImage {
    let mut out = basemap.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let mean = ((r as u16 + g as u16 + b as u16) / 3) as u8;
        *pixel = Rgba([mean, mean, mean, a]);
    }
    out
}

/// Relief heights for the 3D surface view: the field normalized to `[0, 1]`,
/// inverted (warm cells sit low, as the dashboard draws it) and scaled by
/// the z-exaggeration. NaN cells stay NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRelief {
    pub z: Vec<f64>,
    pub ny: usize,
    pub nx: usize,
    pub z_exaggeration: f64,
}

pub fn surface_relief(field: &GriddedField, z_exaggeration: f64) -> SurfaceRelief {
    let (ny, nx) = field.shape();
    let base = field.nan_min().unwrap_or(0.0);
    let top = field.nan_max().unwrap_or(1.0);
    let range = (top - base).max(f64::MIN_POSITIVE);

    let z = field
        .values()
        .iter()
        .map(|&v| (top - v) / range * z_exaggeration)
        .collect();

    SurfaceRelief {
        z,
        ny,
        nx,
        z_exaggeration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meta_identity_pole() -> GridMetadata {
        // Pole at (90, 180) keeps rotated == geographic, so the overlay
        // geometry is easy to reason about.
        GridMetadata {
            variable: "T_2M".to_string(),
            units: "K".to_string(),
            rlat: vec![44.0, 45.0, 46.0],
            rlon: vec![8.0, 9.0, 10.0],
            grid_north_pole_latitude: 90.0,
            grid_north_pole_longitude: 180.0,
        }
    }

    fn field(values: Vec<f64>) -> GriddedField {
        GriddedField::new(values, 3, 3, Utc.with_ymd_and_hms(2023, 7, 1, 12, 0, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn nearest_index_picks_closest_cell() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&axis, 1.2), Some(1));
        assert_eq!(nearest_index(&axis, 1.6), Some(2));
        assert_eq!(nearest_index(&axis, 0.0), Some(0));
        assert_eq!(nearest_index(&axis, 3.4), Some(3));
        assert_eq!(nearest_index(&axis, 4.0), None);
        assert_eq!(nearest_index(&axis, -0.6), None);
    }

    #[test]
    fn overlay_tints_pixels_over_the_grid() {
        let basemap = RgbaImage::from_pixel(8, 8, Rgba([100, 100, 100, 255]));
        let meta = meta_identity_pole();
        let f = field(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let bounds = GeoBounds {
            lat_min: 43.5,
            lat_max: 46.5,
            lon_min: 7.5,
            lon_max: 10.5,
        };

        let out = overlay_field(&basemap, &f, &meta, bounds, Colormap::Inferno, 0.6);
        assert_eq!(out.dimensions(), (8, 8));
        // Center pixel sits over the grid and must differ from the basemap.
        assert_ne!(out.get_pixel(4, 4), basemap.get_pixel(4, 4));
    }

    #[test]
    fn pixels_outside_the_grid_keep_the_basemap() {
        let basemap = RgbaImage::from_pixel(8, 8, Rgba([100, 100, 100, 255]));
        let meta = meta_identity_pole();
        let f = field(vec![1.0; 9]);
        // Bounds far wider than the 2°x2° grid extent.
        let bounds = GeoBounds {
            lat_min: 30.0,
            lat_max: 60.0,
            lon_min: -10.0,
            lon_max: 30.0,
        };

        let out = overlay_field(&basemap, &f, &meta, bounds, Colormap::Viridis, 0.6);
        // Corner pixels are hundreds of km from the grid.
        assert_eq!(out.get_pixel(0, 0), basemap.get_pixel(0, 0));
        assert_eq!(out.get_pixel(7, 7), basemap.get_pixel(7, 7));
    }

    #[test]
    fn nan_cells_keep_the_basemap() {
        let basemap = RgbaImage::from_pixel(6, 6, Rgba([50, 50, 50, 255]));
        let meta = meta_identity_pole();
        let f = field(vec![f64::NAN; 9]);
        let bounds = GeoBounds {
            lat_min: 43.5,
            lat_max: 46.5,
            lon_min: 7.5,
            lon_max: 10.5,
        };

        let out = overlay_field(&basemap, &f, &meta, bounds, Colormap::Viridis, 0.6);
        assert_eq!(out, basemap);
    }

    #[test]
    fn grayscale_averages_channels() {
        let img = RgbaImage::from_pixel(2, 1, Rgba([30, 60, 90, 255]));
        let gray = grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0), &Rgba([60, 60, 60, 255]));
    }

    #[test]
    fn surface_relief_inverts_and_scales() {
        let f = field(vec![0.0, 2.0, 4.0, 0.0, 2.0, 4.0, 0.0, 2.0, 4.0]);
        let relief = surface_relief(&f, SURFACE_Z_EXAGGERATION);
        // Hottest cell sits at z = 0, coldest at the full exaggeration.
        assert_eq!(relief.z[2], 0.0);
        assert_eq!(relief.z[0], SURFACE_Z_EXAGGERATION);
        assert_eq!(relief.z[1], SURFACE_Z_EXAGGERATION / 2.0);
    }

    #[test]
    fn surface_relief_keeps_nan() {
        let f = field(vec![0.0, 1.0, f64::NAN, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        let relief = surface_relief(&f, 0.05);
        assert!(relief.z[2].is_nan());
    }
}
