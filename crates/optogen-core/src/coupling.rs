//! Per-(sensor, population) coupling structures.
//!
//! A [`Coupling`] is the edge-set between every element of the source
//! bank and every element of one population, created lazily the first
//! time a light must reach a sensor in that population. Edge
//! coefficients are written one source slice at a time by the registry;
//! the structure itself evaluates the shared irradiance/photon-flux
//! equation and advances the photocycle it drives.

use ndarray::{s, Array1, Array2, ArrayView1};

use optogen_kinetics::four_state::{current, FourStateParams, Photocycle};
use optogen_kinetics::irradiance::{blend_irradiance, photon_flux, raster_irradiance};

use std::ops::Range;

/// Edge coefficients written by the registry for one light's slice.
#[derive(Debug, Clone)]
pub struct EdgeCoefficients {
    /// Sensitivity of the sensor at the light's wavelength.
    pub epsilon: f64,
    /// Transmittance per (source element, target), row-major over the
    /// light's elements.
    pub transmittance: Array2<f64>,
    /// Photon energy at the light's wavelength (J).
    pub photon_energy_j: f64,
    /// Raster scan period (s).
    pub scan_period_s: f64,
    /// Raster dwell time per target (s).
    pub dwell_s: f64,
    /// Oversampling correction for steps longer than the dwell.
    pub scale: f64,
}

/// The coupling structure for one (sensor, population) pair.
///
/// Rows index source-bank elements, columns index population elements.
/// The per-source fields (`epsilon`, `photon_energy_j`, timing) are
/// constant across a source's targets, so they are stored once per row.
#[derive(Debug, Clone)]
pub struct Coupling {
    /// Bank generation this structure's rows were derived against.
    pub generation: u64,
    /// Per-edge transmittance, shape (bank len, population len).
    pub transmittance: Array2<f64>,
    /// Per-source-element sensitivity.
    pub epsilon: Array1<f64>,
    /// Per-source-element photon energy (J). Initialised to 1 so an
    /// unconnected row never divides flux by zero.
    pub photon_energy_j: Array1<f64>,
    /// Per-source-element scan period (s).
    pub scan_period_s: Array1<f64>,
    /// Per-source-element raster dwell time (s).
    pub dwell_s: Array1<f64>,
    /// Per-source-element oversampling scale.
    pub scale: Array1<f64>,
    /// Whether raster scanning is active for these edges.
    pub raster_enable: bool,
    /// Per-target expression density relative to the standard fit.
    pub rho_rel: Array1<f64>,
    /// Per-target photocycle occupancy.
    pub states: Vec<Photocycle>,
    /// Photocycle parameters of the owning sensor.
    pub kinetics: FourStateParams,
}

impl Coupling {
    /// An all-dark coupling with no edges written yet.
    pub fn new(
        n_sources: usize,
        n_targets: usize,
        generation: u64,
        kinetics: FourStateParams,
        rho_rel: Array1<f64>,
    ) -> Self {
        debug_assert_eq!(rho_rel.len(), n_targets);
        Self {
            generation,
            transmittance: Array2::zeros((n_sources, n_targets)),
            epsilon: Array1::zeros(n_sources),
            photon_energy_j: Array1::ones(n_sources),
            scan_period_s: Array1::ones(n_sources),
            dwell_s: Array1::ones(n_sources),
            scale: Array1::ones(n_sources),
            raster_enable: false,
            rho_rel,
            states: vec![Photocycle::dark(); n_targets],
            kinetics,
        }
    }

    /// Number of source-bank elements these edges address.
    pub fn n_sources(&self) -> usize {
        self.transmittance.nrows()
    }

    /// Number of population elements.
    pub fn n_targets(&self) -> usize {
        self.transmittance.ncols()
    }

    /// Write the edge coefficients for one light's slice of rows.
    pub fn write_rows(&mut self, slice: Range<usize>, coeffs: &EdgeCoefficients) {
        debug_assert_eq!(coeffs.transmittance.nrows(), slice.len());
        debug_assert_eq!(coeffs.transmittance.ncols(), self.n_targets());
        self.transmittance
            .slice_mut(s![slice.clone(), ..])
            .assign(&coeffs.transmittance);
        for row in slice {
            self.epsilon[row] = coeffs.epsilon;
            self.photon_energy_j[row] = coeffs.photon_energy_j;
            self.scan_period_s[row] = coeffs.scan_period_s;
            self.dwell_s[row] = coeffs.dwell_s;
            self.scale[row] = coeffs.scale;
        }
    }

    /// Photon flux summed over all source edges, per target
    /// (photons/m²/s), at simulation time `t_s` given the bank's current
    /// irradiance values.
    pub fn target_flux(&self, bank_values: ArrayView1<'_, f64>, t_s: f64) -> Array1<f64> {
        debug_assert_eq!(bank_values.len(), self.n_sources());
        let n = self.n_sources();
        let mut flux = Array1::zeros(self.n_targets());
        for (i, &irr0) in bank_values.iter().enumerate() {
            if irr0 == 0.0 {
                continue;
            }
            let phase = i as f64 / n as f64;
            for j in 0..self.n_targets() {
                let uniform = self.epsilon[i] * self.transmittance[[i, j]] * irr0;
                let raster = raster_irradiance(
                    uniform,
                    t_s,
                    phase,
                    self.scan_period_s[i],
                    self.dwell_s[i],
                    self.scale[i],
                );
                let irr = blend_irradiance(uniform, raster, self.raster_enable);
                flux[j] += photon_flux(irr, self.photon_energy_j[i]);
            }
        }
        flux
    }

    /// Advance every target's photocycle one step under the given flux.
    pub fn step(&mut self, flux: &Array1<f64>, dt_s: f64) {
        debug_assert_eq!(flux.len(), self.states.len());
        for (state, &phi) in self.states.iter_mut().zip(flux.iter()) {
            state.step(phi, dt_s, &self.kinetics);
        }
    }

    /// Opsin current per target (A) at a common membrane voltage.
    pub fn currents(&self, v: f64) -> Array1<f64> {
        self.states
            .iter()
            .zip(self.rho_rel.iter())
            .map(|(state, &rho)| current(state, v, rho, &self.kinetics))
            .collect()
    }

    /// Return every target to the dark-adapted state.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = Photocycle::dark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupling_2x3() -> Coupling {
        Coupling::new(2, 3, 1, FourStateParams::default(), Array1::ones(3))
    }

    #[test]
    fn test_unwritten_rows_contribute_nothing() {
        let coupling = coupling_2x3();
        let bank = Array1::from_vec(vec![10.0, 10.0]);
        let flux = coupling.target_flux(bank.view(), 0.0);
        assert!(flux.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_written_rows_drive_flux() {
        let mut coupling = coupling_2x3();
        coupling.write_rows(
            0..1,
            &EdgeCoefficients {
                epsilon: 0.5,
                transmittance: Array2::from_shape_vec((1, 3), vec![1.0, 0.5, 0.25]).unwrap(),
                photon_energy_j: 4.2e-19,
                scan_period_s: 1.0 / 30.0,
                dwell_s: 1e-4,
                scale: 1.0,
            },
        );
        let bank = Array1::from_vec(vec![8.0, 8.0]);
        let flux = coupling.target_flux(bank.view(), 0.0);

        // Only row 0 was written; row 1 has ε = 0.
        let expected0 = 0.5 * 1.0 * 8.0 / 4.2e-19;
        assert!((flux[0] - expected0).abs() / expected0 < 1e-12);
        assert!((flux[1] - expected0 * 0.5).abs() / expected0 < 1e-12);
        assert!((flux[2] - expected0 * 0.25).abs() / expected0 < 1e-12);
    }

    #[test]
    fn test_step_and_reset() {
        let mut coupling = coupling_2x3();
        coupling.write_rows(
            0..2,
            &EdgeCoefficients {
                epsilon: 1.0,
                transmittance: Array2::ones((2, 3)),
                photon_energy_j: 4.2e-19,
                scan_period_s: 1.0 / 30.0,
                dwell_s: 1e-4,
                scale: 1.0,
            },
        );
        let bank = Array1::from_vec(vec![100.0, 100.0]);
        for step in 0..100 {
            let flux = coupling.target_flux(bank.view(), step as f64 * 1e-4);
            coupling.step(&flux, 1e-4);
        }
        let i = coupling.currents(-70e-3);
        assert!(i.iter().all(|&x| x < 0.0), "expected inward current");

        coupling.reset();
        assert!(coupling.currents(-70e-3).iter().all(|&x| x == 0.0));
    }
}
