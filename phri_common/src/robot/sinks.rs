//! Downstream command sinks.
//!
//! Sinks are fire-and-forget: no acknowledgement, never blocking the tick.
//! Channel senders implement both traits; a full or disconnected channel
//! drops the command.

use crossbeam_channel::Sender;

use crate::dof::DofVector;
use crate::geometry::TwistCommand;

/// Accepts flat per-DOF joint velocity commands (trajectory mode).
pub trait VelocitySink {
    fn send_velocity(&mut self, velocity: &DofVector);
}

/// Accepts Cartesian twist commands (interaction mode).
pub trait TwistSink {
    fn send_twist(&mut self, twist: &TwistCommand);
}

impl VelocitySink for Sender<DofVector> {
    fn send_velocity(&mut self, velocity: &DofVector) {
        let _ = self.try_send(velocity.clone());
    }
}

impl TwistSink for Sender<TwistCommand> {
    fn send_twist(&mut self, twist: &TwistCommand) {
        let _ = self.try_send(twist.clone());
    }
}

impl<S: VelocitySink + ?Sized> VelocitySink for Box<S> {
    fn send_velocity(&mut self, velocity: &DofVector) {
        (**self).send_velocity(velocity);
    }
}

impl<S: TwistSink + ?Sized> TwistSink for Box<S> {
    fn send_twist(&mut self, twist: &TwistCommand) {
        (**self).send_twist(twist);
    }
}
