//! Atomic models: user behavior behind the DEVS contract.

use std::collections::HashMap;

use crate::duration::Duration;
use crate::error::{SimResult, SimulationError};
use crate::observer::{Observation, Observer, ObserverTable};
use crate::port::{Bag, Port};
use crate::scale::Scale;

/// The behavior contract an atomic model implements.
///
/// Only [`Atomic::time_advance`] is mandatory; every other operation has
/// a reasonable default. The kernel drives the classical cycle: when the
/// planned duration runs out it collects [`Atomic::output`] and fires
/// [`Atomic::internal_transition`]; input arriving earlier fires
/// [`Atomic::external_transition`] with the elapsed duration; input
/// arriving exactly at expiry fires [`Atomic::confluent_transition`],
/// which defaults to internal-then-external.
///
/// # Example
///
/// ```
/// use feldspar::{Atomic, Bag, Duration};
///
/// struct Pulse {
///     remaining: u32,
/// }
///
/// impl Atomic for Pulse {
///     fn time_advance(&self) -> Duration {
///         if self.remaining > 0 {
///             Duration::base(10)
///         } else {
///             Duration::INFINITY
///         }
///     }
///
///     fn internal_transition(&mut self) {
///         self.remaining -= 1;
///     }
///
///     fn output(&mut self, output: &mut Bag) {
///         output.post("pulse", serde_json::json!(self.remaining));
///     }
/// }
/// ```
pub trait Atomic {
    /// Resets the model to its initial state. Invoked once per run,
    /// before the first scheduling decision.
    fn initialize(&mut self) {}

    /// Elapsed duration already spent in the initial state; zero unless
    /// the model starts mid-cycle.
    fn initial_elapsed(&self) -> Duration {
        Duration::ZERO
    }

    /// Duration until the next internal event; may be infinite.
    fn time_advance(&self) -> Duration;

    /// State change when the planned duration runs out.
    fn internal_transition(&mut self) {}

    /// State change when input arrives before the planned duration runs
    /// out. `elapsed` is the time spent in the current state.
    fn external_transition(&mut self, elapsed: Duration, input: &Bag) {
        let _ = (elapsed, input);
    }

    /// State change when input arrives exactly when the planned duration
    /// runs out. Defaults to the internal transition followed by the
    /// external one with zero elapsed.
    fn confluent_transition(&mut self, input: &Bag) {
        self.internal_transition();
        self.external_transition(Duration::ZERO, input);
    }

    /// Posts this cycle's values on the model's output ports. Invoked
    /// immediately before an internal or confluent transition.
    fn output(&mut self, output: &mut Bag) {
        let _ = output;
    }

    /// The scale this model schedules at. Time advances are fixed at
    /// this scale; returning one they cannot be expressed at aborts the
    /// run.
    fn precision(&self) -> Scale {
        Scale::BASE
    }
}

/// An atomic model: a behavior plus its identity and ports.
pub struct AtomicModel {
    pub(crate) name: String,
    pub(crate) behavior: Box<dyn Atomic>,
    pub(crate) inputs: Vec<Port>,
    pub(crate) outputs: Vec<Port>,
    pub(crate) observers: HashMap<String, ObserverTable>,
    pub(crate) precision: Scale,
}

impl AtomicModel {
    /// Wraps a behavior under a model name.
    pub fn new(name: impl Into<String>, behavior: impl Atomic + 'static) -> Self {
        let precision = behavior.precision();
        AtomicModel {
            name: name.into(),
            behavior: Box::new(behavior),
            inputs: Vec::new(),
            outputs: Vec::new(),
            observers: HashMap::new(),
            precision,
        }
    }

    /// Declares an input port.
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(Port::input(name));
        self
    }

    /// Declares an output port.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Port::output(name));
        self
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scale this model schedules at.
    pub fn precision(&self) -> Scale {
        self.precision
    }

    /// Whether an input port with this name exists.
    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p.name == port)
    }

    /// Whether an output port with this name exists.
    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|p| p.name == port)
    }

    /// Attaches an observer to an output port.
    ///
    /// Only output ports of atomic models are externally visible;
    /// observing an input port is a configuration error.
    pub fn observe_output(&mut self, port: &str, observer: Observer) -> SimResult<()> {
        if self.has_output(port) {
            self.observers.entry(port.to_string()).or_default().attach(observer);
            Ok(())
        } else if self.has_input(port) {
            Err(SimulationError::UnobservablePort {
                model: self.name.clone(),
                port: port.to_string(),
            })
        } else {
            Err(SimulationError::NoSuchPort {
                model: self.name.clone(),
                port: port.to_string(),
            })
        }
    }

    /// Notifies the observers of one output port.
    pub(crate) fn notify_output(&mut self, port: &str, observation: &Observation) {
        if let Some(table) = self.observers.get_mut(port) {
            table.notify_all(observation);
        }
    }

    /// Checks port-name uniqueness per direction.
    pub(crate) fn validate(&self) -> SimResult<()> {
        for ports in [&self.inputs, &self.outputs] {
            for (i, port) in ports.iter().enumerate() {
                if ports[..i].iter().any(|p| p.name == port.name) {
                    return Err(SimulationError::InvalidModel {
                        reason: format!(
                            "model '{}' declares port '{}' twice",
                            self.name, port.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AtomicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicModel")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("precision", &self.precision)
            .finish()
    }
}
