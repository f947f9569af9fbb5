//! Light-equation primitives shared by every coupling edge.
//!
//! An edge receives irradiance `Irr0 × ε × T` from its source. Under
//! raster scanning that power is concentrated into a periodic dwell
//! window instead of being delivered uniformly, and when the simulation
//! step exceeds the dwell time an oversampling scale keeps the delivered
//! energy per step correct. Photon flux is irradiance divided by photon
//! energy.

/// Planck constant (J·s).
pub const H_PLANCK: f64 = 6.63e-34;

/// Speed of light in vacuum (m/s).
pub const C_LIGHT: f64 = 2.998e8;

/// Photon energy $E = hc/\lambda$ (J) at a wavelength in nm.
pub fn photon_energy_j(wavelength_nm: f64) -> f64 {
    H_PLANCK * C_LIGHT / (wavelength_nm * 1e-9)
}

/// Raster scan period (s) from the scan frequency (Hz).
pub fn scan_period_s(scan_freq_hz: f64) -> f64 {
    1.0 / scan_freq_hz
}

/// Dwell time (s) of the scanned spot on one target.
///
/// Ratio of the spot area (π × 10⁻¹⁰ m²) to the scanned field-of-view
/// area, times the scan period.
pub fn raster_dwell_s(fov_m: f64, scan_freq_hz: f64) -> f64 {
    let spot_area = std::f64::consts::PI * 1e-10;
    let fov_area = std::f64::consts::PI * (fov_m / 2.0).powi(2);
    spot_area / fov_area / scan_freq_hz
}

/// Oversampling correction when the integrator step exceeds the dwell
/// time: `1 + max(0, dt/dwell − 1)`.
pub fn oversampling_scale(dt_s: f64, dwell_s: f64) -> f64 {
    if dt_s > dwell_s {
        dt_s / dwell_s
    } else {
        1.0
    }
}

/// Raster-scanned irradiance for one edge at simulation time `t`.
///
/// The scanned spot revisits each source's targets once per period, with
/// a per-source phase offset `source_phase` ∈ [0, 1). Inside the widened
/// dwell window the uniform irradiance is divided by `scale × 10` so the
/// delivered energy per period matches the uniform case.
pub fn raster_irradiance(
    uniform_irr: f64,
    t_s: f64,
    source_phase: f64,
    scan_period: f64,
    dwell: f64,
    scale: f64,
) -> f64 {
    let window = (t_s + scan_period * source_phase) % scan_period < dwell * scale * 10.0;
    if window {
        uniform_irr / (scale * 10.0)
    } else {
        0.0
    }
}

/// Blend uniform and raster-scanned irradiance by the raster enable flag.
pub fn blend_irradiance(uniform: f64, raster: f64, raster_enable: bool) -> f64 {
    if raster_enable {
        raster
    } else {
        uniform
    }
}

/// Photon flux (photons/m²/s) from irradiance (W/m²) and photon energy (J).
pub fn photon_flux(irradiance: f64, photon_energy: f64) -> f64 {
    irradiance / photon_energy
}
