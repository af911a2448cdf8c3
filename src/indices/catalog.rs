//! The catalog of heat-stress indicators the crate works with: the four
//! danger-threshold indices tracked by the historical archive, plus the two
//! plain climatological fields shown alongside them on maps.

use crate::render::colormap::Colormap;
use std::fmt;

/// A heat-stress index with a danger threshold and a row in the historical
/// archive.
///
/// Each variant carries a fixed operative threshold (°C), the name used in
/// the archive's `Indice` column, a colormap for map rendering and a pastel
/// color for trend charts.
///
/// # Examples
///
/// ```
/// use heatstress::HeatIndexKind;
///
/// assert_eq!(HeatIndexKind::Humidex.threshold_c(), 45.0);
/// assert_eq!(HeatIndexKind::Wbgt.archive_name(), "WBGT");
/// assert_eq!(format!("{}", HeatIndexKind::LethalHeatStress), "Lethal Heat Stress Index");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatIndexKind {
    /// Perceived temperature from temperature and dew point (Canada).
    Humidex,
    /// Wet Bulb Globe Temperature, the occupational-health standard.
    Wbgt,
    /// Wet-bulb temperature plus a humidity penalty; flags conditions where
    /// heat becomes life-threatening.
    LethalHeatStress,
    /// Universal Thermal Climate Index (simplified form).
    Utci,
}

impl HeatIndexKind {
    /// All indices, in the order the dashboard lists them.
    pub const ALL: [HeatIndexKind; 4] = [
        HeatIndexKind::Humidex,
        HeatIndexKind::Wbgt,
        HeatIndexKind::LethalHeatStress,
        HeatIndexKind::Utci,
    ];

    /// The name used in the archive's `Indice` column and on chart labels.
    pub fn archive_name(&self) -> &'static str {
        match self {
            HeatIndexKind::Humidex => "Humidex",
            HeatIndexKind::Wbgt => "WBGT",
            HeatIndexKind::LethalHeatStress => "Lethal Heat Stress Index",
            HeatIndexKind::Utci => "UTCI",
        }
    }

    /// The operative danger threshold in °C.
    ///
    /// Exceedance counting in [`crate::trends`] uses these values. For UTCI
    /// the archive threshold is 42 °C (the 46 °C figure sometimes quoted for
    /// UTCI is a caption-level reference, not the counted threshold).
    pub fn threshold_c(&self) -> f64 {
        match self {
            HeatIndexKind::Humidex => 45.0,
            HeatIndexKind::Wbgt => 30.0,
            HeatIndexKind::LethalHeatStress => 27.0,
            HeatIndexKind::Utci => 42.0,
        }
    }

    /// Colormap used when rendering this index on a map.
    pub fn colormap(&self) -> Colormap {
        match self {
            HeatIndexKind::Humidex => Colormap::Plasma,
            HeatIndexKind::Wbgt => Colormap::Viridis,
            HeatIndexKind::LethalHeatStress => Colormap::Coolwarm,
            HeatIndexKind::Utci => Colormap::Cividis,
        }
    }

    /// Fill color for trend bar/line charts, as an `(r, g, b)` triple.
    pub fn chart_color(&self) -> (u8, u8, u8) {
        match self {
            HeatIndexKind::Humidex => (0xB6, 0xE2, 0xD3),
            HeatIndexKind::Wbgt => (0xFF, 0xD8, 0xA8),
            HeatIndexKind::LethalHeatStress => (0xE2, 0xC6, 0xF3),
            HeatIndexKind::Utci => (0xC3, 0xCB, 0xEF),
        }
    }

    /// Human-readable caption describing the danger threshold.
    pub fn threshold_caption(&self) -> String {
        format!("Danger above {:.0}°C", self.threshold_c())
    }
}

impl fmt::Display for HeatIndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.archive_name())
    }
}

/// A field that can be drawn on a map: either one of the four indices or a
/// plain climatological indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapLayer {
    /// 2-meter air temperature in °C.
    Temperature,
    /// Relative humidity in percent.
    RelativeHumidity,
    /// One of the heat-stress indices.
    Index(HeatIndexKind),
}

impl MapLayer {
    pub fn label(&self) -> &'static str {
        match self {
            MapLayer::Temperature => "Temperature",
            MapLayer::RelativeHumidity => "Relative Humidity",
            MapLayer::Index(kind) => kind.archive_name(),
        }
    }

    pub fn colormap(&self) -> Colormap {
        match self {
            MapLayer::Temperature => Colormap::Inferno,
            MapLayer::RelativeHumidity => Colormap::Blues,
            MapLayer::Index(kind) => kind.colormap(),
        }
    }

    /// Unit suffix for colorbar labels.
    pub fn unit(&self) -> &'static str {
        match self {
            MapLayer::RelativeHumidity => "%",
            _ => "°C",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_round_trip_through_display() {
        for kind in HeatIndexKind::ALL {
            assert_eq!(kind.to_string(), kind.archive_name());
        }
    }

    #[test]
    fn thresholds_match_dashboard_config() {
        assert_eq!(HeatIndexKind::Humidex.threshold_c(), 45.0);
        assert_eq!(HeatIndexKind::Wbgt.threshold_c(), 30.0);
        assert_eq!(HeatIndexKind::LethalHeatStress.threshold_c(), 27.0);
        assert_eq!(HeatIndexKind::Utci.threshold_c(), 42.0);
    }

    #[test]
    fn map_layer_units() {
        assert_eq!(MapLayer::RelativeHumidity.unit(), "%");
        assert_eq!(MapLayer::Index(HeatIndexKind::Wbgt).unit(), "°C");
    }
}
