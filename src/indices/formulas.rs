//! Scalar heat-stress formulas.
//!
//! Every function here is a closed-form, side-effect-free transform over
//! `f64` values. NaN inputs propagate to NaN outputs. Field-level application
//! happens through [`crate::grid::GriddedField::map`] / `zip_with`; this
//! module stays unit-testable on plain numbers.
//!
//! Sources: Masterton & Richardson (Humidex), Rothfusz/NWS (Heat Index),
//! Stull 2011 (wet-bulb approximation), the 0.7/0.3 WBGT blend, and the
//! simplified linear UTCI correction.

/// Offset between Kelvin and Celsius scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Lowest dew point (°C) accepted by the Humidex vapor-pressure term,
/// roughly 200 K. Values below are clamped before exponentiation.
pub const HUMIDEX_DEW_POINT_FLOOR_C: f64 = -73.15;

/// Dew points below this (K) are treated as missing in snapshot pipelines.
pub const DEW_POINT_VALID_MIN_K: f64 = 243.15;

#[inline]
pub fn kelvin_to_celsius(t_k: f64) -> f64 {
    t_k - KELVIN_OFFSET
}

#[inline]
pub fn celsius_to_kelvin(t_c: f64) -> f64 {
    t_c + KELVIN_OFFSET
}

/// Relative humidity (%) from air temperature and dew point, both in °C.
///
/// Uses the Magnus saturation-vapor-pressure approximation
/// (17.625, 243.04 coefficients). Returns exactly 100 when `td_c == ta_c`.
pub fn relative_humidity(ta_c: f64, td_c: f64) -> f64 {
    100.0
        * ((17.625 * td_c) / (243.04 + td_c) - (17.625 * ta_c) / (243.04 + ta_c)).exp()
}

/// Humidex (°C) from air temperature and dew point, both in Kelvin.
///
/// Masterton/Richardson formula. The dew point is floored at
/// [`HUMIDEX_DEW_POINT_FLOOR_C`] so the exponential term cannot blow up on
/// unphysical inputs; this is the only domain guard in the formula layer.
/// A NaN dew point stays NaN rather than being pulled onto the floor.
pub fn humidex(ta_k: f64, td_k: f64) -> f64 {
    if td_k.is_nan() {
        return f64::NAN;
    }
    let ta_c = kelvin_to_celsius(ta_k);
    let td_c = kelvin_to_celsius(td_k).max(HUMIDEX_DEW_POINT_FLOOR_C);

    // Vapor pressure in hPa.
    let exponent = 5417.7530 * (1.0 / 273.16 - 1.0 / (td_c + 273.16));
    let e = 6.11 * exponent.exp();

    ta_c + 0.5555 * (e - 10.0)
}

/// Heat Index (°C) from air temperature (°C) and relative humidity (%).
///
/// The Rothfusz regression is fit in Fahrenheit, so the input is converted,
/// evaluated, and converted back.
pub fn heat_index(ta_c: f64, rh: f64) -> f64 {
    let ta_f = ta_c * 9.0 / 5.0 + 32.0;

    let hi_f = -42.379
        + 2.04901523 * ta_f
        + 10.14333127 * rh
        - 0.22475541 * ta_f * rh
        - 6.8378e-3 * ta_f * ta_f
        - 5.48172e-2 * rh * rh
        + 1.229e-3 * ta_f * ta_f * rh
        + 8.528e-4 * ta_f * rh * rh
        - 1.99e-6 * ta_f * ta_f * rh * rh;

    (hi_f - 32.0) * 5.0 / 9.0
}

/// Wet-bulb temperature (°C) from air temperature (°C) and relative
/// humidity (%), using Stull's empirical arctan fit.
pub fn wet_bulb(ta_c: f64, rh: f64) -> f64 {
    ta_c * (0.151977 * (rh + 8.313659).sqrt()).atan() + (ta_c + rh).atan()
        - (rh - 1.676331).atan()
        + 0.00391838 * rh.powf(1.5) * (0.023101 * rh).atan()
        - 4.686035
}

/// Wet Bulb Globe Temperature (°C) as the fixed 0.7/0.3 blend of wet-bulb
/// and dry-bulb temperature. Being a convex combination, the result always
/// lies between its two inputs.
pub fn wbgt(ta_c: f64, wbt_c: f64) -> f64 {
    0.7 * wbt_c + 0.3 * ta_c
}

/// Lethal Heat Stress Index (°C): wet-bulb temperature plus a humidity
/// penalty that vanishes at saturation.
pub fn lethal_heat_stress(wbt_c: f64, rh: f64) -> f64 {
    let f = rh / 100.0;
    wbt_c + 4.5 * (1.0 - f * f)
}

/// Simplified UTCI (°C): a linear correction to the dry-bulb temperature in
/// temperature and relative humidity. The full UTCI model also takes wind
/// and radiation; this is the reduced form used by the dashboard.
pub fn utci(ta_c: f64, rh: f64) -> f64 {
    ta_c + 0.607562 + 0.022771 * ta_c - 0.003578 * rh - 0.000119 * ta_c * rh
}
