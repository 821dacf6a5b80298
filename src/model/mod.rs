//! Model graph: atomic leaves, coupled nodes, ports and couplings.

pub mod atomic;
pub mod coupled;

pub use atomic::{Atomic, AtomicModel};
pub use coupled::{CoupledModel, InputCoupling, InternalCoupling, OutputCoupling};

use crate::error::SimResult;
use crate::scale::Scale;

/// A node of the model tree.
#[derive(Debug)]
pub enum Model {
    /// A leaf behavior.
    Atomic(AtomicModel),
    /// An internal node aggregating children via couplings.
    Coupled(CoupledModel),
}

impl Model {
    /// The model name.
    pub fn name(&self) -> &str {
        match self {
            Model::Atomic(m) => m.name(),
            Model::Coupled(m) => m.name(),
        }
    }

    /// Whether the model has an input port with this name.
    pub fn has_input(&self, port: &str) -> bool {
        match self {
            Model::Atomic(m) => m.has_input(port),
            Model::Coupled(m) => m.has_input(port),
        }
    }

    /// Whether the model has an output port with this name.
    pub fn has_output(&self, port: &str) -> bool {
        match self {
            Model::Atomic(m) => m.has_output(port),
            Model::Coupled(m) => m.has_output(port),
        }
    }

    /// The scale the model schedules at; for a coupled model, the finest
    /// scale among its children.
    pub fn precision(&self) -> Scale {
        match self {
            Model::Atomic(m) => m.precision(),
            Model::Coupled(m) => m
                .children
                .iter()
                .map(Model::precision)
                .min()
                .unwrap_or(Scale::BASE),
        }
    }

    /// Walks the tree checking ports and couplings.
    pub fn validate(&self) -> SimResult<()> {
        match self {
            Model::Atomic(m) => m.validate(),
            Model::Coupled(m) => m.validate(),
        }
    }
}

impl From<AtomicModel> for Model {
    fn from(model: AtomicModel) -> Self {
        Model::Atomic(model)
    }
}

impl From<CoupledModel> for Model {
    fn from(model: CoupledModel) -> Self {
        Model::Coupled(model)
    }
}
