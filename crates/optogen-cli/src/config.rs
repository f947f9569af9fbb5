//! TOML configuration deserialisation for stimulation scenarios.

use serde::Deserialize;

/// Top-level scenario configuration.
#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub light: Vec<LightConfig>,
    #[serde(default)]
    pub opsin: Vec<OpsinConfig>,
    pub raster: Option<RasterConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Clock and recording parameters.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Integrator step size (s).
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Number of steps to run.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Membrane voltage held across all targets (V).
    #[serde(default = "default_voltage")]
    pub voltage: f64,
}

fn default_dt() -> f64 {
    1e-4
}
fn default_steps() -> usize {
    1000
}
fn default_voltage() -> f64 {
    -70e-3
}

/// Target population: evenly spaced elements along a segment.
#[derive(Debug, Deserialize)]
pub struct PopulationConfig {
    pub name: String,
    /// Segment start (m).
    pub start: [f64; 3],
    /// Segment end (m).
    pub end: [f64; 3],
    /// Element count.
    pub n: usize,
}

/// A fiber light source in the scenario.
#[derive(Debug, Deserialize)]
pub struct LightConfig {
    pub name: String,
    /// Fiber tip location (m).
    pub location: [f64; 3],
    /// Pointing direction (normalised on load).
    pub direction: [f64; 3],
    /// Driven irradiance (W/m²).
    #[serde(default)]
    pub irradiance: f64,
    /// Source wavelength (nm). Default is the 473 nm blue fiber.
    #[serde(default = "default_wavelength")]
    pub wavelength: f64,
    /// Raster scan frequency (Hz).
    #[serde(default = "default_scan_freq")]
    pub scan_freq: f64,
    /// Hardware irradiance ceiling (W/m²), if any.
    pub max_irradiance: Option<f64>,
}

fn default_wavelength() -> f64 {
    473.0
}
fn default_scan_freq() -> f64 {
    30.0
}

/// An opsin expressed across the population.
#[derive(Debug, Deserialize)]
pub struct OpsinConfig {
    pub name: String,
    /// Action spectrum: "chr2", "vf_chrimson", or "flat".
    #[serde(default = "default_spectrum")]
    pub spectrum: String,
    /// Flat-spectrum sensitivity, used only when `spectrum = "flat"`.
    #[serde(default = "default_one")]
    pub epsilon: f64,
    /// Expression density relative to the standard fit.
    #[serde(default = "default_one")]
    pub rho_rel: f64,
}

fn default_spectrum() -> String {
    "chr2".into()
}
fn default_one() -> f64 {
    1.0
}

/// Raster scanning, off unless present.
#[derive(Debug, Deserialize)]
pub struct RasterConfig {
    /// Scanned field of view (m).
    pub fov: f64,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save current traces as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_currents: bool,
    /// Whether to also save the coupling summary as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_currents: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a scenario file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<ScenarioConfig> {
    use anyhow::Context;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file {}", path.display()))?;
    let config: ScenarioConfig =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_scenario_parses() {
        let text = r#"
            [simulation]
            dt = 1e-4

            [population]
            name = "layer5"
            start = [0.0, 0.0, 0.0]
            end = [0.0, 0.0, 1e-3]
            n = 10

            [[light]]
            name = "fiber"
            location = [0.0, 0.0, 0.0]
            direction = [0.0, 0.0, 1.0]
            irradiance = 5.0

            [[opsin]]
            name = "chr2"
        "#;
        let config: ScenarioConfig = toml::from_str(text).unwrap();
        assert_eq!(config.population.n, 10);
        assert_eq!(config.light.len(), 1);
        assert_eq!(config.light[0].wavelength, 473.0);
        assert_eq!(config.opsin[0].spectrum, "chr2");
        assert!(config.raster.is_none());
        assert!(config.output.save_currents);
    }
}
