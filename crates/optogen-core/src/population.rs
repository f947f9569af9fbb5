//! Neuron population interface.
//!
//! The registry only needs three things from a population: a stable name
//! usable as a map key, its element count, and per-element 3D
//! coordinates for evaluating transmittance.

use nalgebra::Point3;

/// A population of spatially embedded neurons.
#[derive(Debug, Clone)]
pub struct Population {
    /// Stable identity; two registrations with the same name refer to the
    /// same population.
    pub name: String,
    /// Per-element coordinates (m).
    pub coords: Vec<Point3<f64>>,
}

impl Population {
    pub fn new(name: impl Into<String>, coords: Vec<Point3<f64>>) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }

    /// Evenly spaced elements along a line segment, end inclusive.
    pub fn along_segment(
        name: impl Into<String>,
        start: Point3<f64>,
        end: Point3<f64>,
        n: usize,
    ) -> Self {
        assert!(n >= 2, "a segment population needs at least two elements");
        let coords = (0..n)
            .map(|i| {
                let frac = i as f64 / (n - 1) as f64;
                start + (end - start) * frac
            })
            .collect();
        Self::new(name, coords)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}
