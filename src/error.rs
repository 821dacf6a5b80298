//! Error surface of the simulation kernel.

use thiserror::Error;

use crate::event_set::PlanningError;
use crate::scale::Scale;

/// Errors surfaced to the simulation driver.
///
/// All variants except [`SimulationError::Planning`]'s setup-time uses
/// are fatal to the running cycle: the driver records the error, clears
/// the mutable bags and terminates the loop. Observer failures are not
/// errors; the failing observer is detached and the run continues.
#[derive(Clone, Debug, Error)]
pub enum SimulationError {
    /// A model posted on (or a coupling targets) a port with the wrong
    /// direction or owner.
    #[error("port '{port}' is not an owned {expected} port of model '{model}'")]
    InvalidPortHost {
        /// Model that was expected to own the port.
        model: String,
        /// Offending port name.
        port: String,
        /// The direction that would have been valid.
        expected: &'static str,
    },

    /// A port name is unknown on a model.
    #[error("model '{model}' has no port named '{port}'")]
    NoSuchPort {
        /// Model the lookup ran against.
        model: String,
        /// The unknown port name.
        port: String,
    },

    /// A time advance is not representable at the model's precision
    /// level.
    #[error("time advance {duration} of model '{model}' is not representable at precision {precision}")]
    InvalidDuration {
        /// The offending model.
        model: String,
        /// The model's precision level.
        precision: Scale,
        /// Display form of the rejected duration.
        duration: String,
    },

    /// A processor was driven outside its lifecycle.
    #[error("invalid processor request: {reason}")]
    InvalidProcessor {
        /// What was attempted.
        reason: String,
    },

    /// The scheduler and a processor disagree about the current time;
    /// indicates a kernel bug, not a model bug.
    #[error("bad synchronisation at model '{model}': {details}")]
    BadSynchronisation {
        /// Model at which the mismatch surfaced.
        model: String,
        /// Diagnostic detail.
        details: String,
    },

    /// The event set cannot represent a planned duration.
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// An observer was attached to a port that is not externally
    /// visible.
    #[error("port '{port}' of model '{model}' is not observable")]
    UnobservablePort {
        /// Owning model.
        model: String,
        /// The port that cannot be observed.
        port: String,
    },

    /// The model graph failed validation at setup.
    #[error("invalid model graph: {reason}")]
    InvalidModel {
        /// What the validation pass found.
        reason: String,
    },
}

/// Result type for kernel operations.
pub type SimResult<T> = Result<T, SimulationError>;
