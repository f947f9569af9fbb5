//! The coupling registry.
//!
//! Maintains the bipartite graph of light ↔ photoreceptor relationships
//! per population, the shared [`SourceBank`], and the lazily created
//! [`Coupling`] structures parameterizing every edge. Registering a new
//! light is the one multi-structure transaction: the bank is replaced,
//! every coupling derived from the old bank is torn down, and all
//! previously established connections are replayed against the new
//! layout. Replay must reproduce the connection set exactly; a mismatch
//! is a defect and fails loudly.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use optogen_kinetics::irradiance::{
    oversampling_scale, photon_energy_j, raster_dwell_s, scan_period_s,
};
use optogen_optics::transmittance::transmittance_default;

use crate::bank::SourceBank;
use crate::coupling::{Coupling, EdgeCoefficients};
use crate::device::{DeviceSpec, Expression, Light, LightId, Photoreceptor, PopulationId, SensorId};
use crate::host::{SimulationHost, StructureHandle};
use crate::population::Population;

/// Default raster field of view: 500 µm.
const DEFAULT_FOV_M: f64 = 500e-6;

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("light '{light}' is already connected to '{sensor}' for population '{population}'")]
    DuplicateConnection {
        light: String,
        sensor: String,
        population: String,
    },

    #[error("device '{0}' exposes neither a light-emitting nor a light-sensitive capability")]
    MissingCapability(String),

    #[error("light {0:?} was never registered")]
    UnknownLight(LightId),

    #[error("sensor {0:?} was never registered")]
    UnknownSensor(SensorId),

    #[error("population {0:?} was never registered")]
    UnknownPopulation(PopulationId),

    #[error(
        "sensor '{sensor}': expression mask has {mask} entries for \
         population '{population}' with {elements} elements"
    )]
    ExpressionMaskMismatch {
        sensor: String,
        population: String,
        mask: usize,
        elements: usize,
    },

    #[error("light '{light}': irradiance must be non-negative, got {value}")]
    NegativeIrradiance { light: String, value: f64 },
}

/// Non-fatal compatibility warning: the scanning field of view changed
/// after raster mode was first activated. The newest value wins.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "only one scanning field of view is supported per simulation; \
     replacing {previous_m} m with {new_m} m"
)]
pub struct ConfigWarning {
    pub previous_m: f64,
    pub new_m: f64,
}

/// Identities assigned by a [`Registry::register`] call.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub light: Option<LightId>,
    pub sensor: Option<SensorId>,
    pub population: PopulationId,
}

/// Registry of many-to-many light/photoreceptor couplings.
///
/// One registry per simulation, owned by the simulation object itself
/// (see [`crate::host::Simulation`]).
#[derive(Debug, Default)]
pub struct Registry {
    bank: Option<SourceBank>,
    slice_for_light: HashMap<LightId, Range<usize>>,
    lights: Vec<Light>,
    sensors: Vec<Photoreceptor>,
    populations: Vec<Population>,
    population_ids: HashMap<String, PopulationId>,
    /// Photoreceptors injected into each population. Monotone: devices
    /// are never removed.
    sensors_for_pop: BTreeMap<PopulationId, BTreeSet<SensorId>>,
    /// Lights injected into each population. Monotone.
    lights_for_pop: BTreeMap<PopulationId, BTreeSet<LightId>>,
    couplings: BTreeMap<(SensorId, PopulationId), Coupling>,
    /// Fully parameterized (light, sensor, population) triples for the
    /// current bank generation.
    connections: BTreeSet<(LightId, SensorId, PopulationId)>,
    raster_fov_m: f64,
    raster_enable: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            raster_fov_m: DEFAULT_FOV_M,
            ..Default::default()
        }
    }

    /// Register a device injection, dispatching on its capability tag.
    ///
    /// A device with both capabilities is registered as a light first,
    /// then as a sensor, under the same name.
    pub fn register(
        &mut self,
        host: &mut dyn SimulationHost,
        device: DeviceSpec,
        population: &Population,
    ) -> Result<Registration, RegistryError> {
        // Resolve the role before touching any map: a capability-less
        // device must leave the registry untouched.
        device.role()?;
        let population = self.intern_population(population);

        let DeviceSpec { light, sensor, .. } = device;
        let mut registration = Registration {
            light: None,
            sensor: None,
            population,
        };
        if let Some(light) = light {
            registration.light = Some(self.register_light(host, light, population)?);
        }
        if let Some(sensor) = sensor {
            registration.sensor = Some(self.register_sensor(host, sensor, population)?);
        }
        Ok(registration)
    }

    /// Register a light-sensitive device into a population and connect
    /// it to every light already injected there.
    ///
    /// An expression mask must cover the population exactly; the check
    /// runs before any map mutation so a rejected sensor leaves the
    /// registry as it was.
    pub fn register_sensor(
        &mut self,
        host: &mut dyn SimulationHost,
        sensor: Photoreceptor,
        population: PopulationId,
    ) -> Result<SensorId, RegistryError> {
        self.check_population(population)?;
        if let Expression::Mask(mask) = &sensor.expression {
            let pop = &self.populations[population.0];
            if mask.len() != pop.len() {
                return Err(RegistryError::ExpressionMaskMismatch {
                    sensor: sensor.name.clone(),
                    population: pop.name.clone(),
                    mask: mask.len(),
                    elements: pop.len(),
                });
            }
        }
        let id = SensorId(self.sensors.len());
        self.sensors.push(sensor);
        self.sensors_for_pop.entry(population).or_default().insert(id);

        let prior_lights: Vec<LightId> = self
            .lights_for_pop
            .get(&population)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for light in prior_lights {
            self.connect(host, light, id, population)?;
        }
        Ok(id)
    }

    /// Register a light source: rebuild the bank to make room for its
    /// elements, replay all prior connections, then connect the new
    /// light to every sensor already injected into its population.
    pub fn register_light(
        &mut self,
        host: &mut dyn SimulationHost,
        light: Light,
        population: PopulationId,
    ) -> Result<LightId, RegistryError> {
        self.check_population(population)?;
        let id = LightId(self.lights.len());
        let elements = light.element_count();
        self.lights.push(light);
        self.rebuild_bank(host, id, elements);

        self.lights_for_pop.entry(population).or_default().insert(id);
        let prior_sensors: Vec<SensorId> = self
            .sensors_for_pop
            .get(&population)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for sensor in prior_sensors {
            self.connect(host, id, sensor, population)?;
        }
        Ok(id)
    }

    /// Fully parameterize the edges between one light and one sensor for
    /// a population.
    ///
    /// A zero sensitivity at the light's wavelength means there is no
    /// physical coupling: the call is a silent no-op and creates nothing.
    /// Connections are write-once per bank generation; connecting an
    /// already-connected triple is an error.
    pub fn connect(
        &mut self,
        host: &mut dyn SimulationHost,
        light: LightId,
        sensor: SensorId,
        population: PopulationId,
    ) -> Result<(), RegistryError> {
        let light_spec = self
            .lights
            .get(light.0)
            .ok_or(RegistryError::UnknownLight(light))?;
        let sensor_spec = self
            .sensors
            .get(sensor.0)
            .ok_or(RegistryError::UnknownSensor(sensor))?;
        self.check_population(population)?;
        let slice = self
            .slice_for_light
            .get(&light)
            .cloned()
            .ok_or(RegistryError::UnknownLight(light))?;

        let epsilon = sensor_spec.sensitivity(light_spec.wavelength_nm());
        if epsilon == 0.0 {
            return Ok(());
        }

        self.ensure_coupling(host, sensor, population)?;
        if self.connections.contains(&(light, sensor, population)) {
            return Err(RegistryError::DuplicateConnection {
                light: self.lights[light.0].name.clone(),
                sensor: self.sensors[sensor.0].name.clone(),
                population: self.populations[population.0].name.clone(),
            });
        }

        let light_spec = &self.lights[light.0];
        let pop = &self.populations[population.0];
        let mut transmittance = Array2::zeros((slice.len(), pop.len()));
        for (row, pose) in light_spec.poses.iter().enumerate() {
            for (col, point) in pop.coords.iter().enumerate() {
                let (r, z) = pose.project(point);
                transmittance[[row, col]] = transmittance_default(r, z, &light_spec.fiber);
            }
        }
        let dwell_s = raster_dwell_s(self.raster_fov_m, light_spec.scan_freq_hz);
        let coeffs = EdgeCoefficients {
            epsilon,
            transmittance,
            photon_energy_j: photon_energy_j(light_spec.wavelength_nm()),
            scan_period_s: scan_period_s(light_spec.scan_freq_hz),
            dwell_s,
            scale: oversampling_scale(host.step_size(), dwell_s),
        };

        let coupling = self
            .couplings
            .get_mut(&(sensor, population))
            .expect("coupling exists for a pair being connected");
        coupling.raster_enable = self.raster_enable;
        coupling.write_rows(slice, &coeffs);

        self.connections.insert((light, sensor, population));
        Ok(())
    }

    /// View of the bank slice representing one light's source elements.
    pub fn source_for(&self, light: LightId) -> Result<ArrayView1<'_, f64>, RegistryError> {
        let slice = self
            .slice_for_light
            .get(&light)
            .cloned()
            .ok_or(RegistryError::UnknownLight(light))?;
        let bank = self
            .bank
            .as_ref()
            .ok_or(RegistryError::UnknownLight(light))?;
        Ok(bank.slice(slice))
    }

    /// Drive a light: set the irradiance of every element in its slice.
    ///
    /// Negative intensities are rejected; values above the light's
    /// hardware ceiling are clamped to it.
    pub fn set_light_irradiance(
        &mut self,
        light: LightId,
        irradiance: f64,
    ) -> Result<(), RegistryError> {
        let spec = self
            .lights
            .get(light.0)
            .ok_or(RegistryError::UnknownLight(light))?;
        if irradiance < 0.0 {
            return Err(RegistryError::NegativeIrradiance {
                light: spec.name.clone(),
                value: irradiance,
            });
        }
        let irradiance = match spec.max_irradiance {
            Some(max) if irradiance > max => max,
            _ => irradiance,
        };
        let slice = self
            .slice_for_light
            .get(&light)
            .cloned()
            .ok_or(RegistryError::UnknownLight(light))?;
        if let Some(bank) = self.bank.as_mut() {
            bank.slice_mut(slice).fill(irradiance);
        }
        Ok(())
    }

    /// Activate raster scanning with a new field of view (m).
    ///
    /// Last write wins. Changing the value after raster mode was first
    /// activated returns (and logs) a compatibility warning: only one
    /// concurrent field of view is supported.
    pub fn update_field_of_view(&mut self, new_fov_m: f64) -> Option<ConfigWarning> {
        let warning = if self.raster_enable && self.raster_fov_m != new_fov_m {
            Some(ConfigWarning {
                previous_m: self.raster_fov_m,
                new_m: new_fov_m,
            })
        } else {
            None
        };
        self.raster_enable = true;
        self.raster_fov_m = new_fov_m;
        if let Some(warning) = &warning {
            log::warn!("{warning}");
        }
        warning
    }

    // --- accessors -------------------------------------------------------

    /// The shared light-source bank, if any light is registered.
    pub fn bank(&self) -> Option<&SourceBank> {
        self.bank.as_ref()
    }

    /// Currently established connection triples.
    pub fn connections(&self) -> &BTreeSet<(LightId, SensorId, PopulationId)> {
        &self.connections
    }

    /// The coupling structure for a (sensor, population) pair, if one
    /// was ever needed.
    pub fn coupling(&self, sensor: SensorId, population: PopulationId) -> Option<&Coupling> {
        self.couplings.get(&(sensor, population))
    }

    /// All coupling structures.
    pub fn couplings(
        &self,
    ) -> impl Iterator<Item = (&(SensorId, PopulationId), &Coupling)> {
        self.couplings.iter()
    }

    /// All coupling structures, mutably (for stepping the photocycles).
    pub fn couplings_mut(
        &mut self,
    ) -> impl Iterator<Item = (&(SensorId, PopulationId), &mut Coupling)> {
        self.couplings.iter_mut()
    }

    /// A light's slice of the bank.
    pub fn light_slice(&self, light: LightId) -> Option<Range<usize>> {
        self.slice_for_light.get(&light).cloned()
    }

    pub fn light(&self, light: LightId) -> Option<&Light> {
        self.lights.get(light.0)
    }

    pub fn sensor(&self, sensor: SensorId) -> Option<&Photoreceptor> {
        self.sensors.get(sensor.0)
    }

    pub fn population(&self, population: PopulationId) -> Option<&Population> {
        self.populations.get(population.0)
    }

    /// Look up a population id by stable name.
    pub fn population_id(&self, name: &str) -> Option<PopulationId> {
        self.population_ids.get(name).copied()
    }

    /// Active scanning field of view (m).
    pub fn field_of_view_m(&self) -> f64 {
        self.raster_fov_m
    }

    /// Whether raster scanning has been activated.
    pub fn raster_enabled(&self) -> bool {
        self.raster_enable
    }

    // --- internals -------------------------------------------------------

    /// Intern a population by stable name. Coordinates are captured on
    /// first registration; later registrations under the same name refer
    /// to the same population.
    fn intern_population(&mut self, population: &Population) -> PopulationId {
        if let Some(&id) = self.population_ids.get(&population.name) {
            return id;
        }
        let id = PopulationId(self.populations.len());
        self.populations.push(population.clone());
        self.population_ids.insert(population.name.clone(), id);
        id
    }

    fn check_population(&self, population: PopulationId) -> Result<(), RegistryError> {
        if population.0 < self.populations.len() {
            Ok(())
        } else {
            Err(RegistryError::UnknownPopulation(population))
        }
    }

    /// Replace the bank with one grown by `elements`, reassign slices,
    /// tear down every coupling derived from the old layout, and replay
    /// all prior connections. Atomic as observed by the caller: the
    /// replayed connection set must equal the snapshot exactly.
    fn rebuild_bank(
        &mut self,
        host: &mut dyn SimulationHost,
        new_light: LightId,
        elements: usize,
    ) {
        let (new_bank, new_slice) = match &self.bank {
            Some(old) => {
                host.detach(&StructureHandle::SourceBank {
                    generation: old.generation(),
                });
                old.grown(elements)
            }
            None => (SourceBank::new(elements), 0..elements),
        };
        let generation = new_bank.generation();
        host.attach(StructureHandle::SourceBank { generation });
        self.bank = Some(new_bank);

        // Rewrite the slice map wholesale in registration order.
        self.slice_for_light.clear();
        let mut offset = 0;
        for (i, light) in self.lights.iter().enumerate() {
            self.slice_for_light
                .insert(LightId(i), offset..offset + light.element_count());
            offset += light.element_count();
        }
        debug_assert_eq!(self.slice_for_light[&new_light], new_slice);

        // Every coupling references the old bank's layout and is stale.
        for ((sensor, population), coupling) in &self.couplings {
            host.detach(&StructureHandle::Coupling {
                sensor: *sensor,
                population: *population,
                generation: coupling.generation,
            });
        }
        self.couplings.clear();

        // Snapshot, clear, replay.
        let snapshot = std::mem::take(&mut self.connections);
        for &(light, sensor, population) in &snapshot {
            self.connect(host, light, sensor, population)
                .expect("replaying a previously valid connection cannot fail");
        }
        assert_eq!(
            snapshot, self.connections,
            "bank rebuild must reproduce the connection set exactly"
        );
        log::debug!(
            "rebuilt source bank: generation {generation}, {offset} elements, \
             {} connections replayed",
            snapshot.len()
        );
    }

    /// Create (and attach) the coupling structure for a pair on first
    /// need.
    fn ensure_coupling(
        &mut self,
        host: &mut dyn SimulationHost,
        sensor: SensorId,
        population: PopulationId,
    ) -> Result<(), RegistryError> {
        if self.couplings.contains_key(&(sensor, population)) {
            return Ok(());
        }
        let sensor_spec = &self.sensors[sensor.0];
        let pop = &self.populations[population.0];
        let rho_rel = match &sensor_spec.expression {
            Expression::Uniform => Array1::from_elem(pop.len(), sensor_spec.rho_rel),
            Expression::Mask(mask) => {
                if mask.len() != pop.len() {
                    return Err(RegistryError::ExpressionMaskMismatch {
                        sensor: sensor_spec.name.clone(),
                        population: pop.name.clone(),
                        mask: mask.len(),
                        elements: pop.len(),
                    });
                }
                mask.iter()
                    .map(|&expresses| if expresses { sensor_spec.rho_rel } else { 0.0 })
                    .collect()
            }
        };
        let (n_sources, generation) = self
            .bank
            .as_ref()
            .map_or((0, 0), |bank| (bank.len(), bank.generation()));
        let coupling = Coupling::new(
            n_sources,
            pop.len(),
            generation,
            sensor_spec.kinetics.clone(),
            rho_rel,
        );
        host.attach(StructureHandle::Coupling {
            sensor,
            population,
            generation,
        });
        self.couplings.insert((sensor, population), coupling);
        Ok(())
    }
}
