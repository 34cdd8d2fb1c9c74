//! Microtwi accessory integration
//!
//! Connects the Microtwi mobile gamepad accessory (an ESP32-class board
//! speaking a line-oriented text protocol over USB serial) to a host game
//! engine's input subsystem:
//!
//! 1. [`transport`] - serial auto-discovery/handshake and the line stream
//! 2. [`protocol`] - frame decoding into virtual gamepad state and outbound
//!    commands
//! 3. [`integration`] - the per-frame controller glue plus timed LED and
//!    vibration sequences
//!
//! The host keeps ownership of the schedule: it drives
//! [`integration::MicrotwiController::poll`] once per frame and receives the
//! decoded state through its own [`integration::InputSink`] implementation.

pub mod config;
pub mod integration;
pub mod protocol;
pub mod transport;

pub use config::MicrotwiConfig;
pub use integration::{ConnectionListener, InputSink, MicrotwiController};
pub use protocol::{Command, GamepadFrame};
pub use transport::{DiscoverySettings, Transport};
