//! Robot-side services called at startup and before replanning.

use std::time::Duration;

use thiserror::Error;

/// Failure of a bounded-wait service call. Always recoverable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// The service did not appear within the wait.
    #[error("service `{0}` not available")]
    Unavailable(String),

    /// The call was sent but no response arrived in time.
    #[error("service `{service}` timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    /// The service answered with a failure.
    #[error("service `{service}` rejected the request: {message}")]
    Rejected { service: String, message: String },
}

/// Services exposed by the robot driver stack.
///
/// Each call must return within `timeout`.
pub trait RobotServices {
    /// Switch the servo input to Cartesian twist commands.
    fn switch_to_twist(&mut self, timeout: Duration) -> Result<(), ServiceError>;

    /// Re-zero the force/torque sensor bias.
    fn zero_ft_sensor(&mut self, timeout: Duration) -> Result<(), ServiceError>;
}

/// Services that are never present. Every call reports `Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoServices;

impl RobotServices for NoServices {
    fn switch_to_twist(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        Err(ServiceError::Unavailable("switch_command_type".to_string()))
    }

    fn zero_ft_sensor(&mut self, _timeout: Duration) -> Result<(), ServiceError> {
        Err(ServiceError::Unavailable("zero_ftsensor".to_string()))
    }
}
