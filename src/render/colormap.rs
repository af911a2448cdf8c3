//! Colormaps for field rendering.
//!
//! Each map is a fixed set of control points sampled from the matplotlib
//! colormap of the same name, interpolated linearly in RGB. Values are
//! normalized over the field's value range before lookup; NaN maps to a
//! fully transparent pixel so the basemap shows through missing cells.

use image::Rgba;

type Stop = (f64, [u8; 3]);

const TURBO: &[Stop] = &[
    (0.0, [48, 18, 59]),
    (0.1, [69, 91, 205]),
    (0.2, [62, 155, 254]),
    (0.3, [24, 214, 203]),
    (0.4, [72, 248, 130]),
    (0.5, [164, 252, 59]),
    (0.6, [226, 220, 56]),
    (0.7, [254, 163, 49]),
    (0.8, [239, 89, 17]),
    (0.9, [194, 36, 3]),
    (1.0, [122, 4, 3]),
];

const INFERNO: &[Stop] = &[
    (0.0, [0, 0, 4]),
    (0.2, [66, 10, 104]),
    (0.4, [147, 38, 103]),
    (0.6, [221, 81, 58]),
    (0.8, [252, 165, 10]),
    (1.0, [252, 255, 164]),
];

const PLASMA: &[Stop] = &[
    (0.0, [13, 8, 135]),
    (0.25, [156, 23, 158]),
    (0.5, [237, 121, 83]),
    (0.75, [252, 185, 44]),
    (1.0, [240, 249, 33]),
];

const VIRIDIS: &[Stop] = &[
    (0.0, [68, 1, 84]),
    (0.25, [59, 82, 139]),
    (0.5, [33, 145, 140]),
    (0.75, [94, 201, 98]),
    (1.0, [253, 231, 37]),
];

const CIVIDIS: &[Stop] = &[
    (0.0, [0, 32, 76]),
    (0.25, [64, 84, 107]),
    (0.5, [124, 123, 120]),
    (0.75, [196, 174, 94]),
    (1.0, [255, 234, 70]),
];

const COOLWARM: &[Stop] = &[
    (0.0, [59, 76, 192]),
    (0.25, [144, 178, 254]),
    (0.5, [221, 221, 221]),
    (0.75, [245, 156, 125]),
    (1.0, [180, 4, 38]),
];

const BLUES: &[Stop] = &[
    (0.0, [247, 251, 255]),
    (0.25, [198, 219, 239]),
    (0.5, [106, 174, 214]),
    (0.75, [33, 113, 181]),
    (1.0, [8, 48, 107]),
];

/// The colormaps the dashboard assigns to its layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Colormap {
    Turbo,
    Inferno,
    Plasma,
    Viridis,
    Cividis,
    Coolwarm,
    Blues,
}

impl Colormap {
    fn stops(&self) -> &'static [Stop] {
        match self {
            Colormap::Turbo => TURBO,
            Colormap::Inferno => INFERNO,
            Colormap::Plasma => PLASMA,
            Colormap::Viridis => VIRIDIS,
            Colormap::Cividis => CIVIDIS,
            Colormap::Coolwarm => COOLWARM,
            Colormap::Blues => BLUES,
        }
    }

    /// Samples the map at `t` in `[0, 1]` (clamped outside).
    pub fn sample(&self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = t.clamp(0.0, 1.0);

        let mut upper = 1;
        while upper < stops.len() - 1 && stops[upper].0 < t {
            upper += 1;
        }
        let (t0, c0) = stops[upper - 1];
        let (t1, c1) = stops[upper];
        let frac = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };

        let mut rgb = [0u8; 3];
        for (i, channel) in rgb.iter_mut().enumerate() {
            let v = c0[i] as f64 + (c1[i] as f64 - c0[i] as f64) * frac;
            *channel = v.round().clamp(0.0, 255.0) as u8;
        }
        rgb
    }

    /// Maps a raw value onto the `[vmin, vmax]` range and samples. NaN
    /// yields a transparent pixel; `alpha` applies to everything else.
    pub fn color_for(&self, value: f64, vmin: f64, vmax: f64, alpha: u8) -> Rgba<u8> {
        if value.is_nan() {
            return Rgba([0, 0, 0, 0]);
        }
        let t = if vmax > vmin {
            (value - vmin) / (vmax - vmin)
        } else {
            0.5
        };
        let [r, g, b] = self.sample(t);
        Rgba([r, g, b, alpha])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_match_control_points() {
        assert_eq!(Colormap::Viridis.sample(0.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.sample(1.0), [253, 231, 37]);
        assert_eq!(Colormap::Turbo.sample(0.0), [48, 18, 59]);
    }

    #[test]
    fn midpoints_interpolate() {
        // Halfway between the 0.0 and 0.25 viridis stops.
        let c = Colormap::Viridis.sample(0.125);
        assert_eq!(c, [64, 42, 112]);
    }

    #[test]
    fn out_of_range_clamps() {
        assert_eq!(Colormap::Inferno.sample(-1.0), Colormap::Inferno.sample(0.0));
        assert_eq!(Colormap::Inferno.sample(2.0), Colormap::Inferno.sample(1.0));
    }

    #[test]
    fn nan_is_transparent() {
        let px = Colormap::Plasma.color_for(f64::NAN, 0.0, 1.0, 200);
        assert_eq!(px, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn degenerate_range_uses_midpoint() {
        let px = Colormap::Coolwarm.color_for(5.0, 5.0, 5.0, 255);
        assert_eq!(px, Rgba([221, 221, 221, 255]));
    }
}
