//! Tabulated opsin action spectra.
//!
//! An action spectrum gives the relative sensitivity ε(λ) of a
//! photoreceptor, normalised so the peak wavelength has ε = 1. Data is
//! embedded at compile time and linearly interpolated; outside the
//! tabulated range the sensitivity is taken as zero (the opsin simply
//! does not respond), which is what lets the coupling registry skip
//! physically meaningless connections.

use thiserror::Error;

/// Errors from action spectrum construction.
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("Action spectrum needs at least two points, got {0}")]
    TooFewPoints(usize),

    #[error("Action spectrum wavelengths must be strictly increasing at index {0}")]
    NotSorted(usize),

    #[error("Action spectrum has {wavelengths} wavelengths but {epsilon} sensitivity values")]
    LengthMismatch { wavelengths: usize, epsilon: usize },
}

/// A tabulated action spectrum with linear interpolation.
#[derive(Debug, Clone)]
pub struct ActionSpectrum {
    name: String,
    wavelengths_nm: Vec<f64>,
    epsilon: Vec<f64>,
}

impl ActionSpectrum {
    /// Construct from tabulated data.
    ///
    /// # Arguments
    /// * `name` - Opsin name (e.g. "ChR2").
    /// * `wavelengths_nm` - Strictly increasing wavelengths in nm.
    /// * `epsilon` - Relative sensitivity at each wavelength, peak = 1.
    pub fn new(
        name: impl Into<String>,
        wavelengths_nm: Vec<f64>,
        epsilon: Vec<f64>,
    ) -> Result<Self, SpectrumError> {
        if wavelengths_nm.len() != epsilon.len() {
            return Err(SpectrumError::LengthMismatch {
                wavelengths: wavelengths_nm.len(),
                epsilon: epsilon.len(),
            });
        }
        if wavelengths_nm.len() < 2 {
            return Err(SpectrumError::TooFewPoints(wavelengths_nm.len()));
        }
        for i in 1..wavelengths_nm.len() {
            if wavelengths_nm[i] <= wavelengths_nm[i - 1] {
                return Err(SpectrumError::NotSorted(i));
            }
        }
        Ok(Self {
            name: name.into(),
            wavelengths_nm,
            epsilon,
        })
    }

    /// A spectrum that responds identically at every wavelength.
    ///
    /// Useful for tests and for generic light-dependent devices whose
    /// wavelength dependence is unknown.
    pub fn flat(epsilon: f64) -> Self {
        Self {
            name: "flat".into(),
            wavelengths_nm: vec![0.0, 1e6],
            epsilon: vec![epsilon, epsilon],
        }
    }

    /// ChR2 (H134R) action spectrum, digitised from Nagel et al. 2003.
    pub fn chr2() -> Self {
        Self::new(
            "ChR2",
            vec![400.0, 422.0, 460.0, 470.0, 473.0, 500.0, 520.0, 540.0, 560.0],
            vec![0.34, 0.65, 0.96, 1.0, 0.997, 0.57, 0.22, 0.06, 0.01],
        )
        .expect("builtin spectrum is valid")
    }

    /// Vf-Chrimson action spectrum, digitised from Mager et al. 2018.
    pub fn vf_chrimson() -> Self {
        Self::new(
            "Vf-Chrimson",
            vec![470.0, 525.0, 560.0, 590.0, 594.0, 620.0, 640.0, 660.0],
            vec![0.34, 0.58, 0.87, 1.0, 0.997, 0.78, 0.52, 0.23],
        )
        .expect("builtin spectrum is valid")
    }

    /// Opsin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wavelength range over which the spectrum is non-zero (nm).
    pub fn wavelength_range(&self) -> (f64, f64) {
        (
            *self.wavelengths_nm.first().expect("validated non-empty"),
            *self.wavelengths_nm.last().expect("validated non-empty"),
        )
    }

    /// Relative sensitivity at a wavelength (nm).
    ///
    /// Zero outside the tabulated range.
    pub fn epsilon(&self, wavelength_nm: f64) -> f64 {
        let (min, max) = self.wavelength_range();
        if wavelength_nm < min || wavelength_nm > max {
            return 0.0;
        }
        // partition_point gives the first index with w > wavelength.
        let hi = self
            .wavelengths_nm
            .partition_point(|&w| w <= wavelength_nm)
            .min(self.wavelengths_nm.len() - 1)
            .max(1);
        let lo = hi - 1;
        let (w0, w1) = (self.wavelengths_nm[lo], self.wavelengths_nm[hi]);
        let (e0, e1) = (self.epsilon[lo], self.epsilon[hi]);
        e0 + (e1 - e0) * (wavelength_nm - w0) / (w1 - w0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabulated_points_reproduced() {
        let spec = ActionSpectrum::chr2();
        assert!((spec.epsilon(470.0) - 1.0).abs() < 1e-12);
        assert!((spec.epsilon(400.0) - 0.34).abs() < 1e-12);
        assert!((spec.epsilon(560.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_interpolation_between_points() {
        let spec = ActionSpectrum::new(
            "test",
            vec![400.0, 500.0],
            vec![0.0, 1.0],
        )
        .unwrap();
        assert!((spec.epsilon(450.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_outside_range() {
        let spec = ActionSpectrum::chr2();
        assert_eq!(spec.epsilon(350.0), 0.0);
        assert_eq!(spec.epsilon(700.0), 0.0);
    }

    #[test]
    fn test_flat_spectrum() {
        let spec = ActionSpectrum::flat(0.7);
        assert!((spec.epsilon(473.0) - 0.7).abs() < 1e-12);
        assert!((spec.epsilon(594.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unsorted() {
        let err = ActionSpectrum::new("bad", vec![500.0, 400.0], vec![1.0, 0.5]);
        assert!(matches!(err, Err(SpectrumError::NotSorted(1))));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let err = ActionSpectrum::new("bad", vec![400.0, 500.0, 600.0], vec![1.0, 0.5]);
        assert!(matches!(
            err,
            Err(SpectrumError::LengthMismatch {
                wavelengths: 3,
                epsilon: 2,
            })
        ));
    }
}
