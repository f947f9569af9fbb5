//! The shared light-source container.
//!
//! Every registered light's current irradiance lives in one flat array,
//! the [`SourceBank`]; a light's elements occupy a contiguous slice of
//! it. The bank is never resized in place: growing it produces a new,
//! larger bank with all prior values copied forward at the same offsets
//! and a bumped generation counter. Structures that cached coefficients
//! addressed by slice offsets record the generation they were derived
//! against, so a stale reference is detectable rather than silently
//! aliased.

use ndarray::{s, Array1, ArrayView1, ArrayViewMut1};
use std::ops::Range;

/// Growable array of per-source-element irradiance values (W/m²).
#[derive(Debug, Clone)]
pub struct SourceBank {
    irradiance: Array1<f64>,
    generation: u64,
}

impl SourceBank {
    /// A fresh bank holding `len` elements, all dark (zero irradiance).
    pub fn new(len: usize) -> Self {
        Self {
            irradiance: Array1::zeros(len),
            generation: 1,
        }
    }

    /// Number of source elements across all lights.
    pub fn len(&self) -> usize {
        self.irradiance.len()
    }

    /// True when no light has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.irradiance.is_empty()
    }

    /// Generation counter, bumped on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// View of one light's slice.
    pub fn slice(&self, range: Range<usize>) -> ArrayView1<'_, f64> {
        self.irradiance.slice(s![range])
    }

    /// Mutable view of one light's slice.
    pub fn slice_mut(&mut self, range: Range<usize>) -> ArrayViewMut1<'_, f64> {
        self.irradiance.slice_mut(s![range])
    }

    /// All irradiance values in slice order.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.irradiance.view()
    }

    /// Build the replacement bank with `extra` new elements at the tail.
    ///
    /// All existing values are copied forward at their current offsets;
    /// the new tail elements are dark. Returns the new bank and the slice
    /// assigned to the newly registered light.
    pub fn grown(&self, extra: usize) -> (SourceBank, Range<usize>) {
        let n_prev = self.len();
        let mut irradiance = Array1::zeros(n_prev + extra);
        if n_prev > 0 {
            irradiance.slice_mut(s![..n_prev]).assign(&self.irradiance);
        }
        (
            SourceBank {
                irradiance,
                generation: self.generation + 1,
            },
            n_prev..n_prev + extra,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_copies_forward() {
        let mut bank = SourceBank::new(2);
        bank.slice_mut(0..2).fill(5.0);
        let (grown, new_slice) = bank.grown(3);

        assert_eq!(grown.len(), 5);
        assert_eq!(new_slice, 2..5);
        assert_eq!(grown.generation(), bank.generation() + 1);
        assert!(grown.slice(0..2).iter().all(|&v| v == 5.0));
        assert!(grown.slice(2..5).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_grow_from_empty() {
        let bank = SourceBank::new(0);
        let (grown, new_slice) = bank.grown(4);
        assert_eq!(grown.len(), 4);
        assert_eq!(new_slice, 0..4);
    }
}
