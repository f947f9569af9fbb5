//! Device capability model.
//!
//! A device is registered against a population with an explicit
//! capability tag resolved once at registration: it emits light, responds
//! to light, or both. The registry never inspects a type hierarchy; it
//! dispatches on [`DeviceRole`].

use optogen_kinetics::four_state::FourStateParams;
use optogen_optics::projection::SourcePose;
use optogen_optics::spectrum::ActionSpectrum;
use optogen_optics::transmittance::FiberParams;

use crate::registry::RegistryError;

/// Identity of a registered light, assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(pub usize);

/// Identity of a registered light-sensitive device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorId(pub usize);

/// Identity of a population, interned by stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PopulationId(pub usize);

/// What a device can do, resolved once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    LightEmitter,
    LightSensitive,
    Both,
}

/// A light-emitting device: one or more fiber tips sharing a wavelength
/// and scan frequency.
#[derive(Debug, Clone)]
pub struct Light {
    /// Unique device name.
    pub name: String,
    /// Pose of each emitting element. The element count is `poses.len()`.
    pub poses: Vec<SourcePose>,
    /// Fiber and tissue optics (carries the wavelength).
    pub fiber: FiberParams,
    /// Raster scan frequency (Hz).
    pub scan_freq_hz: f64,
    /// Hardware ceiling on emitted irradiance (W/m²), if any.
    pub max_irradiance: Option<f64>,
}

impl Light {
    /// A single-fiber light with default scan frequency.
    pub fn fiber(name: impl Into<String>, pose: SourcePose, fiber: FiberParams) -> Self {
        Self {
            name: name.into(),
            poses: vec![pose],
            fiber,
            scan_freq_hz: 30.0,
            max_irradiance: None,
        }
    }

    /// Number of emitting elements.
    pub fn element_count(&self) -> usize {
        self.poses.len()
    }

    /// Source wavelength (nm).
    pub fn wavelength_nm(&self) -> f64 {
        self.fiber.wavelength_nm
    }
}

/// How opsin expression is distributed over a population's elements.
#[derive(Debug, Clone, Default)]
pub enum Expression {
    /// Every element expresses at the device's `rho_rel`.
    #[default]
    Uniform,
    /// Only masked elements express; the rest get zero density.
    Mask(Vec<bool>),
}

/// A light-sensitive device: an opsin (or indicator) with an action
/// spectrum and photocycle parameters.
#[derive(Debug, Clone)]
pub struct Photoreceptor {
    /// Unique device name.
    pub name: String,
    /// Relative sensitivity ε(λ).
    pub spectrum: ActionSpectrum,
    /// Photocycle kinetics.
    pub kinetics: FourStateParams,
    /// Expression density relative to the standard model fit.
    pub rho_rel: f64,
    /// Which population elements express the opsin.
    pub expression: Expression,
}

impl Photoreceptor {
    /// ChR2 with uniform, standard-density expression.
    pub fn chr2(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spectrum: ActionSpectrum::chr2(),
            kinetics: FourStateParams::default(),
            rho_rel: 1.0,
            expression: Expression::Uniform,
        }
    }

    /// Sensitivity at a wavelength (nm); zero outside the action spectrum.
    pub fn sensitivity(&self, wavelength_nm: f64) -> f64 {
        self.spectrum.epsilon(wavelength_nm)
    }
}

/// A device presented for registration: any combination of the two
/// capabilities, under one name.
#[derive(Debug, Clone)]
pub struct DeviceSpec {
    pub name: String,
    pub light: Option<Light>,
    pub sensor: Option<Photoreceptor>,
}

impl DeviceSpec {
    /// A purely light-emitting device.
    pub fn emitter(light: Light) -> Self {
        Self {
            name: light.name.clone(),
            light: Some(light),
            sensor: None,
        }
    }

    /// A purely light-sensitive device.
    pub fn sensor(sensor: Photoreceptor) -> Self {
        Self {
            name: sensor.name.clone(),
            light: None,
            sensor: Some(sensor),
        }
    }

    /// Resolve the capability tag, or fail if the device has neither.
    pub fn role(&self) -> Result<DeviceRole, RegistryError> {
        match (&self.light, &self.sensor) {
            (Some(_), Some(_)) => Ok(DeviceRole::Both),
            (Some(_), None) => Ok(DeviceRole::LightEmitter),
            (None, Some(_)) => Ok(DeviceRole::LightSensitive),
            (None, None) => Err(RegistryError::MissingCapability(self.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_role_resolution() {
        let pose = SourcePose::new(Point3::origin(), Vector3::z());
        let light = Light::fiber("fiber", pose, FiberParams::default_blue());
        assert_eq!(
            DeviceSpec::emitter(light).role().unwrap(),
            DeviceRole::LightEmitter
        );
        assert_eq!(
            DeviceSpec::sensor(Photoreceptor::chr2("opsin")).role().unwrap(),
            DeviceRole::LightSensitive
        );

        let inert = DeviceSpec {
            name: "probe".into(),
            light: None,
            sensor: None,
        };
        assert!(matches!(
            inert.role(),
            Err(RegistryError::MissingCapability(name)) if name == "probe"
        ));
    }

    #[test]
    fn test_chr2_peak_sensitivity() {
        let opsin = Photoreceptor::chr2("chr2");
        assert!((opsin.sensitivity(470.0) - 1.0).abs() < 1e-12);
        assert_eq!(opsin.sensitivity(650.0), 0.0);
    }
}
