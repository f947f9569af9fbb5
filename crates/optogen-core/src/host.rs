//! The simulation host seam.
//!
//! The registry does not own the execution graph or the clock; it
//! attaches and detaches its structures through the [`SimulationHost`]
//! trait and queries the current step size for oversampling corrections.
//! [`Network`] is the reference implementation, and [`Simulation`] ties a
//! network and its registry together under explicit ownership — there is
//! no ambient global registry lookup.

use std::collections::HashSet;

use crate::device::{PopulationId, SensorId};
use crate::registry::Registry;

/// Handle identifying a registry-owned structure inside the host's
/// execution graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructureHandle {
    /// The shared light-source bank of a given generation.
    SourceBank { generation: u64 },
    /// The coupling structure for a (sensor, population) pair, derived
    /// against a given bank generation.
    Coupling {
        sensor: SensorId,
        population: PopulationId,
        generation: u64,
    },
}

/// Execution-graph operations the registry needs from its host.
pub trait SimulationHost {
    /// Attach a registry-owned structure to the execution graph.
    fn attach(&mut self, handle: StructureHandle);

    /// Detach a previously attached structure.
    fn detach(&mut self, handle: &StructureHandle);

    /// Current integrator step size (s).
    fn step_size(&self) -> f64;
}

/// Reference host: a flat set of attached structures and a fixed step.
#[derive(Debug)]
pub struct Network {
    dt_s: f64,
    attached: HashSet<StructureHandle>,
}

impl Network {
    pub fn new(dt_s: f64) -> Self {
        assert!(dt_s > 0.0, "step size must be positive");
        Self {
            dt_s,
            attached: HashSet::new(),
        }
    }

    /// Whether a structure is currently part of the execution graph.
    pub fn contains(&self, handle: &StructureHandle) -> bool {
        self.attached.contains(handle)
    }

    /// Number of attached structures.
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }
}

impl SimulationHost for Network {
    fn attach(&mut self, handle: StructureHandle) {
        self.attached.insert(handle);
    }

    fn detach(&mut self, handle: &StructureHandle) {
        self.attached.remove(handle);
    }

    fn step_size(&self) -> f64 {
        self.dt_s
    }
}

/// A simulation owns its execution network and its coupling registry
/// side by side; registry operations borrow the network explicitly.
#[derive(Debug)]
pub struct Simulation {
    network: Network,
    registry: Registry,
}

impl Simulation {
    pub fn new(dt_s: f64) -> Self {
        Self {
            network: Network::new(dt_s),
            registry: Registry::new(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Split borrow for registry operations that mutate the network.
    pub fn parts_mut(&mut self) -> (&mut Registry, &mut Network) {
        (&mut self.registry, &mut self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_detach() {
        let mut network = Network::new(1e-4);
        let handle = StructureHandle::SourceBank { generation: 1 };
        network.attach(handle.clone());
        assert!(network.contains(&handle));
        network.detach(&handle);
        assert!(!network.contains(&handle));
    }
}
