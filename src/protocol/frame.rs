//! Decoded gamepad state types and the axis normalization rule

use serde::{Deserialize, Serialize};

/// Raw axis magnitude below which a value is treated as stick drift.
pub const AXIS_DEADZONE: f32 = 1.0;

/// Divisor mapping the accessory's raw analog range onto the engine range.
pub const AXIS_SCALE: f32 = 10.0;

/// 2D analog stick position in the engine's normalized range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
}

impl StickPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One fully decoded input frame
///
/// Rebuilt from scratch on every decode and delivered to the host's virtual
/// input device once per poll. It carries no identity across frames; an
/// all-zero frame is still a valid delivery.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadFrame {
    /// Left stick, fed by `MOVE_` tokens
    pub move_axis: StickPosition,

    /// Right stick, fed by `CAM_` tokens
    pub camera_axis: StickPosition,

    /// Button bitmask, fed by `BTN_` tokens
    pub buttons: u16,
}

/// Physical buttons on the accessory, as named on the wire
///
/// Bit positions follow the host engine's gamepad state layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessoryButton {
    Y,
    B,
    A,
    X,
    P,
    S,
}

impl AccessoryButton {
    /// Parses the single-letter wire name of a `BTN_` token.
    ///
    /// The accessory pads button names with trailing whitespace on occasion,
    /// so callers are expected to trim before matching.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Y" => Some(Self::Y),
            "B" => Some(Self::B),
            "A" => Some(Self::A),
            "X" => Some(Self::X),
            "P" => Some(Self::P),
            "S" => Some(Self::S),
            _ => None,
        }
    }

    /// Bit position in the engine's button mask
    pub fn bit_position(self) -> u32 {
        match self {
            Self::Y => 4,
            Self::B => 5,
            Self::A => 6,
            Self::X => 7,
            Self::P => 12,
            Self::S => 13,
        }
    }

    /// Mask with only this button's bit set
    pub fn mask(self) -> u16 {
        1 << self.bit_position()
    }
}

/// Applies the dead-zone and scaling rule to a raw axis field.
///
/// Values inside `[-AXIS_DEADZONE, AXIS_DEADZONE]` clamp to zero, everything
/// else is divided by [`AXIS_SCALE`].
pub fn normalize_axis(raw: f32) -> f32 {
    if (-AXIS_DEADZONE..=AXIS_DEADZONE).contains(&raw) {
        0.0
    } else {
        raw / AXIS_SCALE
    }
}
