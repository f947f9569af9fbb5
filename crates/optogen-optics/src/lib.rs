//! # Optogen Optics
//!
//! Leaf photophysics for the optogen framework: how much light from a
//! fiber-coupled source actually reaches a point in tissue, and how
//! sensitive a photoreceptor is at a given wavelength.
//!
//! ## Modules
//!
//! - [`transmittance`] — Gaussian-cone / Kubelka–Munk fractional
//!   transmittance model (Foutz et al. 2012).
//! - [`projection`] — source pose and 3D point → (radial, axial) offset
//!   projection.
//! - [`spectrum`] — tabulated opsin action spectra with interpolation.

pub mod projection;
pub mod spectrum;
pub mod transmittance;
