//! Rotated-pole coordinate transforms.
//!
//! Regional climate models place the coordinate pole so their domain sits on
//! the rotated equator, keeping grid cells near-square. Display needs true
//! geographic coordinates, so this module implements the closed-form
//! spherical rotation between the two systems (the CF
//! `rotated_latitude_longitude` grid mapping).
//!
//! The rotation is `Rz(pole_lon) · Ry(90° − pole_lat) · Rz(180°)` applied to
//! the unit sphere; the inverse transform applies the transposed sequence.
//! An unrotated grid corresponds to a pole at (90°, 180°).

use std::f64::consts::PI;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Rotated-pole transform parameters.
///
/// `pole_lat` / `pole_lon` are the true geographic coordinates of the grid
/// north pole, in degrees (the CF attributes `grid_north_pole_latitude` and
/// `grid_north_pole_longitude`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedPole {
    pub pole_lat: f64,
    pub pole_lon: f64,
    /// sin/cos of the pole latitude, precomputed.
    sin_pole_lat: f64,
    cos_pole_lat: f64,
}

impl RotatedPole {
    pub fn new(pole_lat_deg: f64, pole_lon_deg: f64) -> Self {
        let pole_lat_rad = pole_lat_deg * DEG_TO_RAD;
        Self {
            pole_lat: pole_lat_deg,
            pole_lon: pole_lon_deg,
            sin_pole_lat: pole_lat_rad.sin(),
            cos_pole_lat: pole_lat_rad.cos(),
        }
    }

    /// Rotated (rlat, rlon) to geographic (lat, lon), all in degrees.
    pub fn to_geographic(&self, rlat_deg: f64, rlon_deg: f64) -> (f64, f64) {
        let rlat = rlat_deg * DEG_TO_RAD;
        let rlon = rlon_deg * DEG_TO_RAD;
        let pole_lon = self.pole_lon * DEG_TO_RAD;

        let (sin_rlat, cos_rlat) = rlat.sin_cos();
        let (sin_rlon, cos_rlon) = rlon.sin_cos();

        // Rz(180°) then Ry(90° − pole_lat) on the unit vector.
        let x = -cos_rlat * cos_rlon * self.sin_pole_lat + sin_rlat * self.cos_pole_lat;
        let y = -cos_rlat * sin_rlon;
        let z = cos_rlat * cos_rlon * self.cos_pole_lat + sin_rlat * self.sin_pole_lat;

        // Rz(pole_lon).
        let (sin_pl, cos_pl) = pole_lon.sin_cos();
        let xg = x * cos_pl - y * sin_pl;
        let yg = x * sin_pl + y * cos_pl;

        let lat = z.clamp(-1.0, 1.0).asin() * RAD_TO_DEG;
        let lon = yg.atan2(xg) * RAD_TO_DEG;
        (lat, lon)
    }

    /// Geographic (lat, lon) to rotated (rlat, rlon), all in degrees.
    pub fn from_geographic(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg * DEG_TO_RAD;
        let lon = lon_deg * DEG_TO_RAD;
        let pole_lon = self.pole_lon * DEG_TO_RAD;

        let (sin_lat, cos_lat) = lat.sin_cos();

        // Rz(−pole_lon).
        let (sin_dl, cos_dl) = (lon - pole_lon).sin_cos();
        let x = cos_lat * cos_dl;
        let y = cos_lat * sin_dl;
        let z = sin_lat;

        // Ry(−(90° − pole_lat)) then Rz(180°).
        let xr = -(x * self.sin_pole_lat - z * self.cos_pole_lat);
        let yr = -y;
        let zr = x * self.cos_pole_lat + z * self.sin_pole_lat;

        let rlat = zr.clamp(-1.0, 1.0).asin() * RAD_TO_DEG;
        let rlon = yr.atan2(xr) * RAD_TO_DEG;
        (rlat, rlon)
    }

    /// Reprojects 1-D rotated axes into the 2-D geographic mesh used for
    /// display, row-major over `(rlat, rlon)`.
    pub fn reproject_axes(&self, rlat: &[f64], rlon: &[f64]) -> LatLonMesh {
        let ny = rlat.len();
        let nx = rlon.len();
        let mut lat = Vec::with_capacity(ny * nx);
        let mut lon = Vec::with_capacity(ny * nx);
        for &ra in rlat {
            for &ro in rlon {
                let (la, lo) = self.to_geographic(ra, ro);
                lat.push(la);
                lon.push(lo);
            }
        }
        LatLonMesh { lat, lon, ny, nx }
    }
}

/// Geographic coordinates for every cell of a rotated grid, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonMesh {
    lat: Vec<f64>,
    lon: Vec<f64>,
    ny: usize,
    nx: usize,
}

impl LatLonMesh {
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    #[inline]
    pub fn lat(&self, row: usize, col: usize) -> f64 {
        self.lat[row * self.nx + col]
    }

    #[inline]
    pub fn lon(&self, row: usize, col: usize) -> f64 {
        self.lon[row * self.nx + col]
    }

    pub fn lats(&self) -> &[f64] {
        &self.lat
    }

    pub fn lons(&self) -> &[f64] {
        &self.lon
    }

    /// NaN-aware bounding box over the mesh.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let mut b: Option<GeoBounds> = None;
        for (&la, &lo) in self.lat.iter().zip(self.lon.iter()) {
            if la.is_nan() || lo.is_nan() {
                continue;
            }
            b = Some(match b {
                None => GeoBounds {
                    lat_min: la,
                    lat_max: la,
                    lon_min: lo,
                    lon_max: lo,
                },
                Some(cur) => GeoBounds {
                    lat_min: cur.lat_min.min(la),
                    lat_max: cur.lat_max.max(la),
                    lon_min: cur.lon_min.min(lo),
                    lon_max: cur.lon_max.max(lo),
                },
            });
        }
        b
    }
}

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GeoBounds {
    /// The map-view padding the dashboard applies around the data extent.
    pub const MAP_PADDING_DEG: f64 = 1.5;

    /// Expands the box by `pad` degrees on every side.
    pub fn padded(&self, pad: f64) -> GeoBounds {
        GeoBounds {
            lat_min: self.lat_min - pad,
            lat_max: self.lat_max + pad,
            lon_min: self.lon_min - pad,
            lon_max: self.lon_max + pad,
        }
    }

    pub fn width(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn identity_pole_is_a_no_op() {
        let p = RotatedPole::new(90.0, 180.0);
        for (lat, lon) in [(0.0, 0.0), (45.5, 9.2), (-33.0, 151.0), (70.0, -120.0)] {
            let (la, lo) = p.to_geographic(lat, lon);
            assert!((la - lat).abs() < TOL, "lat {lat} -> {la}");
            assert!((lo - lon).abs() < TOL, "lon {lon} -> {lo}");
        }
    }

    #[test]
    fn lombardy_pole_maps_origin_into_the_alps() {
        // The dashboard's grid pole: the rotated origin must land near
        // (47°N, 10°E).
        let p = RotatedPole::new(43.0, -170.0);
        let (lat, lon) = p.to_geographic(0.0, 0.0);
        assert!((lat - 47.0).abs() < 1e-6, "lat {lat}");
        assert!((lon - 10.0).abs() < 1e-6, "lon {lon}");
    }

    #[test]
    fn inverse_of_forward_is_identity() {
        let p = RotatedPole::new(43.0, -170.0);
        for (rlat, rlon) in [(0.0, 0.0), (-2.5, 1.0), (1.75, -3.0), (5.0, 5.0)] {
            let (lat, lon) = p.to_geographic(rlat, rlon);
            let (rla, rlo) = p.from_geographic(lat, lon);
            assert!((rla - rlat).abs() < 1e-9, "rlat {rlat} -> {rla}");
            assert!((rlo - rlon).abs() < 1e-9, "rlon {rlon} -> {rlo}");
        }
    }

    #[test]
    fn mesh_reprojection_matches_pointwise_transform() {
        let p = RotatedPole::new(43.0, -170.0);
        let rlat = [-1.0, 0.0, 1.0];
        let rlon = [-1.0, 0.5];
        let mesh = p.reproject_axes(&rlat, &rlon);
        assert_eq!(mesh.shape(), (3, 2));

        let (lat, lon) = p.to_geographic(rlat[2], rlon[0]);
        assert_eq!(mesh.lat(2, 0), lat);
        assert_eq!(mesh.lon(2, 0), lon);
    }

    #[test]
    fn bounds_with_padding() {
        let p = RotatedPole::new(90.0, 180.0);
        let mesh = p.reproject_axes(&[44.0, 46.0], &[8.0, 11.0]);
        let b = mesh.bounds().unwrap();
        assert!((b.lat_min - 44.0).abs() < TOL);
        assert!((b.lat_max - 46.0).abs() < TOL);
        assert!((b.lon_min - 8.0).abs() < TOL);
        assert!((b.lon_max - 11.0).abs() < TOL);

        let padded = b.padded(GeoBounds::MAP_PADDING_DEG);
        assert!((padded.lat_min - 42.5).abs() < TOL);
        assert!((padded.lon_max - 12.5).abs() < TOL);
    }
}
