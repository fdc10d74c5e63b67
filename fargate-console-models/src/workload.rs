//! Workload definition records

use serde::{Deserialize, Serialize};

use crate::{ContainerSpec, StorageVolume};

/// Task-level compute budget
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskBudget {
    pub cpu_units: u32,
    pub memory_mib: u32,
}

/// Template for one deployable unit
///
/// Identity is the family name: declaring the same family again replaces the
/// active revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadDefinition {
    pub family: String,
    pub budget: TaskBudget,
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub volumes: Vec<StorageVolume>,
}

impl WorkloadDefinition {
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn cpu_allocated(&self) -> u32 {
        self.containers.iter().map(|c| c.cpu_share).sum()
    }

    pub fn memory_allocated(&self) -> u32 {
        self.containers.iter().map(|c| c.memory_share).sum()
    }

    pub fn fits_budget(&self) -> bool {
        self.cpu_allocated() <= self.budget.cpu_units
            && self.memory_allocated() <= self.budget.memory_mib
    }

    /// Containers mounting `volume` read-write
    pub fn writers_of(&self, volume: &str) -> Vec<&ContainerSpec> {
        self.containers
            .iter()
            .filter(|c| c.mounts.iter().any(|m| m.volume == volume && !m.read_only))
            .collect()
    }
}
