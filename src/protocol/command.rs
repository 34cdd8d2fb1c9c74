//! Outbound command strings (host to accessory)

use std::fmt;

/// Fire-and-forget commands understood by the accessory firmware
///
/// Each command is a single line without arguments; no acknowledgement is
/// sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    LedOn,
    LedOff,
    VibrateOn,
    VibrateOff,
    DecreaseFade,
    IncreaseFade,
    ResetFade,
    UseLed,
    DontUseLed,
}

impl Command {
    /// Exact wire representation, without the line terminator
    pub fn as_line(self) -> &'static str {
        match self {
            Self::LedOn => "LED_ON",
            Self::LedOff => "LED_OFF",
            Self::VibrateOn => "VIBRATE_ON",
            Self::VibrateOff => "VIBRATE_OFF",
            Self::DecreaseFade => "DECREASE_FADE",
            Self::IncreaseFade => "INCREASE_FADE",
            Self::ResetFade => "RESET_FADE",
            Self::UseLed => "USE_LED",
            Self::DontUseLed => "DONT_USE_LED",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_line())
    }
}
