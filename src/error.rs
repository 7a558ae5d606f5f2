//! Failures of a single action or detection tick.

use crate::hardware::HardwareError;
use crate::transport::TransportError;
use thiserror::Error;

/// Error returned by an action invocation.
///
/// Failures stay local to the invocation that raised them: the caller logs
/// and moves on to the next event or tick.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The camera could not produce a picture
    #[error("Capture failed: {0}")]
    Capture(#[from] HardwareError),
    /// The reply could not be delivered
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),
}
