//! # Optogen Core
//!
//! The coupling registry at the heart of the optogen framework. This
//! crate maintains the many-to-many relationships between light-emitting
//! devices and the light-sensitive elements expressed in neuron
//! populations, and keeps the shared structures implementing those
//! relationships consistent as devices are injected mid-simulation.
//!
//! ## Architecture
//!
//! All light sources share a single growable irradiance array, the
//! [`bank::SourceBank`]; each light owns a contiguous slice of it.
//! Registering a new light replaces the bank wholesale (slices must stay
//! contiguous), tears down every structure derived from the old bank, and
//! replays all previously established connections against the new layout.
//! Per-(sensor, population) [`coupling::Coupling`] structures hold the
//! edge coefficients that feed the photocycle model in
//! [`optogen_kinetics`].
//!
//! ## Modules
//!
//! - [`bank`] — the versioned light-source container.
//! - [`device`] — device capability model and identity keys.
//! - [`population`] — neuron population interface.
//! - [`coupling`] — per-pair edge structures and light equations.
//! - [`host`] — simulation host seam and reference implementation.
//! - [`registry`] — the coupling registry itself.

pub mod bank;
pub mod coupling;
pub mod device;
pub mod host;
pub mod population;
pub mod registry;
