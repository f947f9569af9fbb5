//! # Optogen Kinetics
//!
//! Photocycle kinetics for light-sensitive channels and the light
//! equations that drive them. Independent of the coupling registry: this
//! crate knows nothing about devices or populations, only about photon
//! flux in and current out.
//!
//! ## Modules
//!
//! - [`four_state`] — four-state opsin photocycle (Evans et al. 2016).
//! - [`irradiance`] — photon energy, raster-scan timing, and the
//!   uniform/raster irradiance blend.

pub mod four_state;
pub mod irradiance;
