//! Coupled models: children wired by couplings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{SimResult, SimulationError};
use crate::port::{Port, PortMode};

use super::Model;

/// Wires a child's output port to a sibling's input port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalCoupling {
    /// Index of the producing child.
    pub source: usize,
    /// Output port on the producing child.
    pub source_port: String,
    /// Index of the consuming child.
    pub target: usize,
    /// Input port on the consuming child.
    pub target_port: String,
}

/// Wires the coupled model's own input port to a child's input port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCoupling {
    /// Input port on the coupled model.
    pub source_port: String,
    /// Index of the consuming child.
    pub target: usize,
    /// Input port on the consuming child.
    pub target_port: String,
}

/// Wires a child's output port to the coupled model's own output port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCoupling {
    /// Index of the producing child.
    pub source: usize,
    /// Output port on the producing child.
    pub source_port: String,
    /// Output port on the coupled model.
    pub target_port: String,
}

/// An internal node of the model tree: children plus their couplings.
///
/// Coupling endpoints are validated eagerly, so a mis-wired graph fails
/// while it is being built rather than mid-run.
///
/// # Example
///
/// ```
/// use feldspar::{Atomic, AtomicModel, CoupledModel, Duration};
///
/// struct Quiet;
/// impl Atomic for Quiet {
///     fn time_advance(&self) -> Duration {
///         Duration::INFINITY
///     }
/// }
///
/// let mut net = CoupledModel::new("net");
/// net.add_child(AtomicModel::new("a", Quiet).with_output("out").into()).unwrap();
/// net.add_child(AtomicModel::new("b", Quiet).with_input("in").into()).unwrap();
/// net.add_internal_coupling("a", "out", "b", "in").unwrap();
/// ```
#[derive(Debug)]
pub struct CoupledModel {
    pub(crate) name: String,
    pub(crate) children: Vec<Model>,
    pub(crate) child_index: HashMap<String, usize>,
    pub(crate) inputs: Vec<Port>,
    pub(crate) outputs: Vec<Port>,
    pub(crate) internal_couplings: Vec<InternalCoupling>,
    pub(crate) input_couplings: Vec<InputCoupling>,
    pub(crate) output_couplings: Vec<OutputCoupling>,
}

impl CoupledModel {
    /// Creates an empty coupled model.
    pub fn new(name: impl Into<String>) -> Self {
        CoupledModel {
            name: name.into(),
            children: Vec::new(),
            child_index: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            internal_couplings: Vec::new(),
            input_couplings: Vec::new(),
            output_couplings: Vec::new(),
        }
    }

    /// Declares an input port on the coupled model itself.
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(Port::input(name));
        self
    }

    /// Declares an output port on the coupled model itself.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Port::output(name));
        self
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The child models.
    pub fn children(&self) -> &[Model] {
        &self.children
    }

    /// Whether an input port with this name exists on the coupled model.
    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p.name == port)
    }

    /// Whether an output port with this name exists on the coupled model.
    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|p| p.name == port)
    }

    /// Adds a child model. Child names are unique within their parent.
    pub fn add_child(&mut self, model: Model) -> SimResult<()> {
        let name = model.name().to_string();
        if self.child_index.contains_key(&name) {
            return Err(SimulationError::InvalidModel {
                reason: format!("coupled model '{}' has two children named '{name}'", self.name),
            });
        }
        self.child_index.insert(name, self.children.len());
        self.children.push(model);
        Ok(())
    }

    fn resolve_child(&self, name: &str) -> SimResult<usize> {
        self.child_index.get(name).copied().ok_or_else(|| {
            SimulationError::InvalidModel {
                reason: format!("coupled model '{}' has no child named '{name}'", self.name),
            }
        })
    }

    fn check_child_port(&self, child: usize, port: &str, mode: PortMode) -> SimResult<()> {
        let model = &self.children[child];
        let ok = match mode {
            PortMode::Input => model.has_input(port),
            PortMode::Output => model.has_output(port),
        };
        if ok {
            return Ok(());
        }
        let other = match mode {
            PortMode::Input => model.has_output(port),
            PortMode::Output => model.has_input(port),
        };
        if other {
            Err(SimulationError::InvalidPortHost {
                model: model.name().to_string(),
                port: port.to_string(),
                expected: match mode {
                    PortMode::Input => "input",
                    PortMode::Output => "output",
                },
            })
        } else {
            Err(SimulationError::NoSuchPort {
                model: model.name().to_string(),
                port: port.to_string(),
            })
        }
    }

    /// Wires `source.source_port -> target.target_port` between two
    /// children.
    pub fn add_internal_coupling(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> SimResult<()> {
        let source = self.resolve_child(source)?;
        let target = self.resolve_child(target)?;
        self.check_child_port(source, source_port, PortMode::Output)?;
        self.check_child_port(target, target_port, PortMode::Input)?;
        self.internal_couplings.push(InternalCoupling {
            source,
            source_port: source_port.to_string(),
            target,
            target_port: target_port.to_string(),
        });
        Ok(())
    }

    /// Wires the coupled model's own input port to a child's input port.
    pub fn add_input_coupling(
        &mut self,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> SimResult<()> {
        if !self.has_input(source_port) {
            return Err(if self.has_output(source_port) {
                SimulationError::InvalidPortHost {
                    model: self.name.clone(),
                    port: source_port.to_string(),
                    expected: "input",
                }
            } else {
                SimulationError::NoSuchPort {
                    model: self.name.clone(),
                    port: source_port.to_string(),
                }
            });
        }
        let target = self.resolve_child(target)?;
        self.check_child_port(target, target_port, PortMode::Input)?;
        self.input_couplings.push(InputCoupling {
            source_port: source_port.to_string(),
            target,
            target_port: target_port.to_string(),
        });
        Ok(())
    }

    /// Wires a child's output port to the coupled model's own output
    /// port.
    pub fn add_output_coupling(
        &mut self,
        source: &str,
        source_port: &str,
        target_port: &str,
    ) -> SimResult<()> {
        let source = self.resolve_child(source)?;
        self.check_child_port(source, source_port, PortMode::Output)?;
        if !self.has_output(target_port) {
            return Err(if self.has_input(target_port) {
                SimulationError::InvalidPortHost {
                    model: self.name.clone(),
                    port: target_port.to_string(),
                    expected: "output",
                }
            } else {
                SimulationError::NoSuchPort {
                    model: self.name.clone(),
                    port: target_port.to_string(),
                }
            });
        }
        self.output_couplings.push(OutputCoupling {
            source,
            source_port: source_port.to_string(),
            target_port: target_port.to_string(),
        });
        Ok(())
    }

    /// Re-checks the whole subtree: couplings were validated as they
    /// were added, children are walked recursively.
    pub(crate) fn validate(&self) -> SimResult<()> {
        for coupling in &self.internal_couplings {
            self.check_child_port(coupling.source, &coupling.source_port, PortMode::Output)?;
            self.check_child_port(coupling.target, &coupling.target_port, PortMode::Input)?;
        }
        for coupling in &self.input_couplings {
            self.check_child_port(coupling.target, &coupling.target_port, PortMode::Input)?;
        }
        for coupling in &self.output_couplings {
            self.check_child_port(coupling.source, &coupling.source_port, PortMode::Output)?;
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}
