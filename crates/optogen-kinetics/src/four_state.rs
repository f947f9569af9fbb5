//! Four-state opsin photocycle.
//!
//! The model of Evans et al., *Front. Neuroinform.* **10**, 8 (2016)
//! (PyRhO): two closed states C1, C2 and two open states O1, O2, with
//! light-dependent transition rates gated by Hill-type saturating
//! functions of photon flux. Three states are integrated; C2 is derived
//! from conservation of occupancy:
//!
//! $$ C_2 = 1 - C_1 - O_1 - O_2 $$
//!
//! Output current is conductance × light factor × rectifying driving
//! force × relative expression density.

use serde::{Deserialize, Serialize};

/// Rate and conductance parameters for the four-state photocycle.
///
/// All rates in 1/s, flux in photons/m²/s, voltages in V, conductance
/// density in S.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FourStateParams {
    /// Conductance density fit $g_0$ (S).
    pub g0: f64,
    /// O2 conductance relative to O1.
    pub gamma: f64,
    /// Half-saturation photon flux $\phi_m$ (photons/m²/s).
    pub phi_m: f64,
    /// C1 → O1 activation rate constant $k_1$ (1/s).
    pub k1: f64,
    /// C2 → O2 activation rate constant $k_2$ (1/s).
    pub k2: f64,
    /// Hill exponent for primary photoactivation.
    pub p: f64,
    /// Dark O1 → O2 transition rate $G_{f0}$ (1/s).
    pub gf0: f64,
    /// Light-dependent O1 → O2 rate constant $k_f$ (1/s).
    pub kf: f64,
    /// Dark O2 → O1 transition rate $G_{b0}$ (1/s).
    pub gb0: f64,
    /// Light-dependent O2 → O1 rate constant $k_b$ (1/s).
    pub kb: f64,
    /// Hill exponent for secondary state transitions.
    pub q: f64,
    /// O1 → C1 deactivation rate $G_{d1}$ (1/s).
    pub gd1: f64,
    /// O2 → C2 deactivation rate $G_{d2}$ (1/s).
    pub gd2: f64,
    /// C2 → C1 dark recovery rate $G_{r0}$ (1/s).
    pub gr0: f64,
    /// Reversal potential $E$ (V).
    pub e_rev: f64,
    /// Rectification scale $v_0$ (V).
    pub v0: f64,
}

impl Default for FourStateParams {
    /// ChR2 fit from the PyRhO default four-state parameters.
    fn default() -> Self {
        Self {
            g0: 114_000e-12,
            gamma: 0.00742,
            phi_m: 2.33e17 * 1e6, // 2.33e17 photons/mm²/s in photons/m²/s
            k1: 4.15e3,
            k2: 0.868e3,
            p: 0.833,
            gf0: 0.0373e3,
            kf: 0.0581e3,
            gb0: 0.0161e3,
            kb: 0.063e3,
            q: 1.94,
            gd1: 0.105e3,
            gd2: 0.0138e3,
            gr0: 0.33,
            e_rev: 0.0,
            v0: 43e-3,
        }
    }
}

impl FourStateParams {
    /// Hill saturation $H(\phi) = \phi^n / (\phi^n + \phi_m^n)$, gated to
    /// zero for non-positive flux.
    fn hill(&self, phi: f64, exponent: f64) -> f64 {
        if phi <= 0.0 {
            return 0.0;
        }
        let phi_n = phi.powf(exponent);
        phi_n / (phi_n + self.phi_m.powf(exponent))
    }

    /// Light-dependent rates at a given photon flux:
    /// (Ga1, Ga2, Gf, Gb) in 1/s.
    fn rates(&self, phi: f64) -> (f64, f64, f64, f64) {
        let hp = self.hill(phi, self.p);
        let hq = self.hill(phi, self.q);
        (
            self.k1 * hp,
            self.k2 * hp,
            self.kf * hq + self.gf0,
            self.kb * hq + self.gb0,
        )
    }
}

/// Occupancy of the four photocycle states (C2 derived).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Photocycle {
    /// Ground closed-state occupancy.
    pub c1: f64,
    /// Primary open-state occupancy.
    pub o1: f64,
    /// Secondary open-state occupancy.
    pub o2: f64,
}

impl Default for Photocycle {
    fn default() -> Self {
        Self::dark()
    }
}

impl Photocycle {
    /// The dark-adapted state: all channels closed in C1.
    pub fn dark() -> Self {
        Self {
            c1: 1.0,
            o1: 0.0,
            o2: 0.0,
        }
    }

    /// Derived C2 occupancy.
    pub fn c2(&self) -> f64 {
        1.0 - self.c1 - self.o1 - self.o2
    }

    /// Light factor $f_\phi = O_1 + \gamma O_2$.
    pub fn light_factor(&self, params: &FourStateParams) -> f64 {
        self.o1 + params.gamma * self.o2
    }

    fn derivative(&self, phi: f64, params: &FourStateParams) -> (f64, f64, f64) {
        let (ga1, ga2, gf, gb) = params.rates(phi);
        let c2 = self.c2();
        let dc1 = params.gd1 * self.o1 + params.gr0 * c2 - ga1 * self.c1;
        let do1 = ga1 * self.c1 + gb * self.o2 - (params.gd1 + gf) * self.o1;
        let do2 = ga2 * c2 + gf * self.o1 - (params.gd2 + gb) * self.o2;
        (dc1, do1, do2)
    }

    /// Advance the occupancies by one step of RK2 (midpoint) under a
    /// photon flux held constant over the step.
    ///
    /// # Arguments
    /// * `phi` - Photon flux (photons/m²/s).
    /// * `dt` - Step size (s).
    pub fn step(&mut self, phi: f64, dt: f64, params: &FourStateParams) {
        let (k1c, k1o1, k1o2) = self.derivative(phi, params);
        let mid = Self {
            c1: self.c1 + 0.5 * dt * k1c,
            o1: self.o1 + 0.5 * dt * k1o1,
            o2: self.o2 + 0.5 * dt * k1o2,
        };
        let (k2c, k2o1, k2o2) = mid.derivative(phi, params);
        self.c1 += dt * k2c;
        self.o1 += dt * k2o1;
        self.o2 += dt * k2o2;
    }
}

/// Rectifying driving-force term $f_v = (1 - e^{-(v - E)/v_0}) / -2$.
pub fn driving_force(v: f64, params: &FourStateParams) -> f64 {
    (1.0 - (-(v - params.e_rev) / params.v0).exp()) / -2.0
}

/// Opsin current (A) at membrane voltage `v` for a channel population
/// with relative expression density `rho_rel`.
///
/// $I = g_0 \, f_\phi \, f_v \, (v - E) \, \rho_{rel}$
pub fn current(state: &Photocycle, v: f64, rho_rel: f64, params: &FourStateParams) -> f64 {
    params.g0 * state.light_factor(params) * driving_force(v, params) * (v - params.e_rev) * rho_rel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_state_is_equilibrium() {
        let params = FourStateParams::default();
        let mut state = Photocycle::dark();
        for _ in 0..1000 {
            state.step(0.0, 1e-4, &params);
        }
        assert!((state.c1 - 1.0).abs() < 1e-12);
        assert_eq!(state.o1, 0.0);
        assert_eq!(state.o2, 0.0);
        assert_eq!(current(&state, -70e-3, 1.0, &params), 0.0);
    }

    #[test]
    fn test_light_opens_channels() {
        let params = FourStateParams::default();
        let mut state = Photocycle::dark();
        // Saturating flux for 10 ms.
        for _ in 0..100 {
            state.step(10.0 * params.phi_m, 1e-4, &params);
        }
        assert!(state.o1 > 0.1, "O1 = {}", state.o1);
        // Inward (negative) current at hyperpolarised voltage.
        assert!(current(&state, -70e-3, 1.0, &params) < 0.0);
    }

    #[test]
    fn test_occupancy_conserved() {
        let params = FourStateParams::default();
        let mut state = Photocycle::dark();
        for i in 0..200 {
            let phi = if i < 100 { params.phi_m } else { 0.0 };
            state.step(phi, 1e-4, &params);
            let total = state.c1 + state.o1 + state.o2 + state.c2();
            assert!((total - 1.0).abs() < 1e-9);
            assert!(state.c1 >= -1e-9 && state.o1 >= -1e-9 && state.o2 >= -1e-9);
        }
    }

    #[test]
    fn test_hill_saturates_monotonically() {
        let params = FourStateParams::default();
        let mut prev = 0.0;
        for exp10 in 14..24 {
            let phi = 10f64.powi(exp10);
            let h = params.hill(phi, params.p);
            assert!(h >= prev);
            assert!(h < 1.0);
            prev = h;
        }
        assert!((params.hill(params.phi_m, params.p) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_current_scales_with_expression() {
        let params = FourStateParams::default();
        let state = Photocycle {
            c1: 0.5,
            o1: 0.4,
            o2: 0.1,
        };
        let i1 = current(&state, -70e-3, 1.0, &params);
        let i2 = current(&state, -70e-3, 2.0, &params);
        assert!((i2 - 2.0 * i1).abs() < 1e-24);
    }
}
