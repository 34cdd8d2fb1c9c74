//! Wire protocol for the Microtwi accessory
//!
//! The accessory streams one text line per message over serial. A line holds
//! space-separated tokens, each token underscore-separated into a tag and its
//! fields:
//!
//! ```text
//! MOVE_<btn>_<x>_<y> CAM_<ignored>_<x>_<y> BTN_<name>
//! ```
//!
//! [`decoder`] turns such a line into a [`frame::GamepadFrame`], the
//! per-poll virtual gamepad state. [`command`] covers the opposite
//! direction: single-line, argument-free command strings the host writes back
//! to the accessory.

pub mod command;
pub mod decoder;
pub mod frame;

pub use command::Command;
pub use decoder::FrameDecoder;
pub use frame::{AccessoryButton, GamepadFrame, StickPosition};
