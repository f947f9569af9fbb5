//! Scenario execution: build a simulation from configuration, register
//! every device, drive the lights, and record the opsin currents.

use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::{Point3, Vector3};

use optogen_core::device::{DeviceSpec, Light, LightId, Photoreceptor};
use optogen_core::host::Simulation;
use optogen_core::population::Population;
use optogen_optics::projection::SourcePose;
use optogen_optics::spectrum::ActionSpectrum;
use optogen_optics::transmittance::FiberParams;

use crate::config::{OpsinConfig, ScenarioConfig};

/// Recorded traces from a scenario run.
pub struct RunResult {
    /// Step times (s).
    pub times: Vec<f64>,
    /// One column label per coupling: "sensor/population".
    pub labels: Vec<String>,
    /// Summed opsin current (A) per coupling, one row per step.
    pub currents: Vec<Vec<f64>>,
}

fn spectrum_for(opsin: &OpsinConfig) -> Result<ActionSpectrum> {
    match opsin.spectrum.as_str() {
        "chr2" => Ok(ActionSpectrum::chr2()),
        "vf_chrimson" => Ok(ActionSpectrum::vf_chrimson()),
        "flat" => Ok(ActionSpectrum::flat(opsin.epsilon)),
        other => bail!("opsin '{}': unknown action spectrum '{other}'", opsin.name),
    }
}

/// Build the simulation and register every configured device.
pub fn build_simulation(config: &ScenarioConfig) -> Result<(Simulation, Vec<LightId>)> {
    let mut sim = Simulation::new(config.simulation.dt);
    let population = Population::along_segment(
        &config.population.name,
        Point3::from(config.population.start),
        Point3::from(config.population.end),
        config.population.n,
    );

    if let Some(raster) = &config.raster {
        let (registry, _) = sim.parts_mut();
        if let Some(warning) = registry.update_field_of_view(raster.fov) {
            log::warn!("{warning}");
        }
    }

    for opsin in &config.opsin {
        let sensor = Photoreceptor {
            spectrum: spectrum_for(opsin)?,
            rho_rel: opsin.rho_rel,
            ..Photoreceptor::chr2(&opsin.name)
        };
        let (registry, network) = sim.parts_mut();
        registry
            .register(network, DeviceSpec::sensor(sensor), &population)
            .with_context(|| format!("registering opsin '{}'", opsin.name))?;
    }

    let mut light_ids = Vec::new();
    for light_config in &config.light {
        let mut fiber = FiberParams::default_blue();
        fiber.wavelength_nm = light_config.wavelength;
        let pose = SourcePose::new(
            Point3::from(light_config.location),
            Vector3::from(light_config.direction),
        );
        let mut light = Light::fiber(&light_config.name, pose, fiber);
        light.scan_freq_hz = light_config.scan_freq;
        light.max_irradiance = light_config.max_irradiance;

        let (registry, network) = sim.parts_mut();
        let registration = registry
            .register(network, DeviceSpec::emitter(light), &population)
            .with_context(|| format!("registering light '{}'", light_config.name))?;
        let id = registration
            .light
            .context("light registration returned no light id")?;
        registry
            .set_light_irradiance(id, light_config.irradiance)
            .with_context(|| format!("driving light '{}'", light_config.name))?;
        light_ids.push(id);
    }

    Ok((sim, light_ids))
}

/// Run the configured number of steps and record per-coupling currents.
pub fn run_scenario(sim: &mut Simulation, config: &ScenarioConfig) -> Result<RunResult> {
    let dt = config.simulation.dt;
    let voltage = config.simulation.voltage;

    let (registry, _) = sim.parts_mut();
    let bank_values = match registry.bank() {
        Some(bank) => bank.values().to_owned(),
        None => bail!("scenario has no registered light source"),
    };
    let labels: Vec<String> = registry
        .couplings()
        .map(|(&(sensor, population), _)| {
            let sensor_name = registry.sensor(sensor).map_or("?", |s| s.name.as_str());
            let pop_name = registry.population(population).map_or("?", |p| p.name.as_str());
            format!("{sensor_name}/{pop_name}")
        })
        .collect();
    if labels.is_empty() {
        bail!("scenario produced no couplings; check wavelengths against action spectra");
    }

    let mut times = Vec::with_capacity(config.simulation.steps);
    let mut currents = Vec::with_capacity(config.simulation.steps);
    for step in 0..config.simulation.steps {
        let t = step as f64 * dt;
        let mut row = Vec::with_capacity(labels.len());
        for (_, coupling) in registry.couplings_mut() {
            let flux = coupling.target_flux(bank_values.view(), t);
            coupling.step(&flux, dt);
            row.push(coupling.currents(voltage).sum());
        }
        times.push(t);
        currents.push(row);
    }

    Ok(RunResult {
        times,
        labels,
        currents,
    })
}

/// Write the recorded current traces as CSV.
pub fn write_currents_csv(result: &RunResult, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;

    write!(file, "time_s")?;
    for label in &result.labels {
        write!(file, ",{label}")?;
    }
    writeln!(file)?;
    for (t, row) in result.times.iter().zip(result.currents.iter()) {
        write!(file, "{t:.6e}")?;
        for value in row {
            write!(file, ",{value:.6e}")?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write a JSON summary of the coupling graph after registration.
pub fn write_coupling_json(sim: &Simulation, path: &Path) -> Result<()> {
    use serde_json::json;

    let registry = sim.registry();
    let couplings: Vec<_> = registry
        .couplings()
        .map(|(&(sensor, population), coupling)| {
            json!({
                "sensor": registry.sensor(sensor).map(|s| s.name.clone()),
                "population": registry.population(population).map(|p| p.name.clone()),
                "generation": coupling.generation,
                "n_sources": coupling.n_sources(),
                "n_targets": coupling.n_targets(),
                "mean_transmittance": coupling.transmittance.mean(),
            })
        })
        .collect();
    let summary = json!({
        "connections": registry.connections().len(),
        "bank_elements": registry.bank().map_or(0, |b| b.len()),
        "couplings": couplings,
    });

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
