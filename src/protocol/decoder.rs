//! Line-to-frame decoding for inbound accessory messages

use tracing::trace;

use crate::protocol::frame::{normalize_axis, AccessoryButton, GamepadFrame, StickPosition};

/// Tag of tokens carrying the left stick (and the handshake banner prefix)
pub const TAG_MOVE: &str = "MOVE";

/// Tag of tokens carrying the right stick
pub const TAG_CAM: &str = "CAM";

/// Tag of tokens carrying a button press
pub const TAG_BTN: &str = "BTN";

/// Threshold above which the `MOVE` button field would count as pressed
const MOVE_BUTTON_THRESHOLD: f32 = 0.3;

/// Decoder for one line of the accessory's text protocol
///
/// Stateless between lines; every call rebuilds the frame from scratch.
/// Malformed numeric fields decode as `0.0` and unknown tags are skipped,
/// matching the accessory's best-effort contract: bad data degrades to a
/// neutral input, it never surfaces as an error.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes one protocol line into a gamepad frame.
    pub fn decode_line(&self, line: &str) -> GamepadFrame {
        let mut frame = GamepadFrame::default();

        for token in line.split_whitespace() {
            let fields: Vec<&str> = token.split('_').collect();
            match fields.first().copied() {
                Some(TAG_MOVE) => self.decode_move(&fields, &mut frame),
                Some(TAG_CAM) => self.decode_cam(&fields, &mut frame),
                Some(TAG_BTN) => self.decode_button(&fields, &mut frame),
                _ => trace!("Ignoring unknown protocol token: {}", token),
            }
        }

        frame
    }

    /// `MOVE_<btn>_<x>_<y>` - left stick plus a reserved button field
    fn decode_move(&self, fields: &[&str], frame: &mut GamepadFrame) {
        let move_btn = numeric_field(fields, 1);
        let x = normalize_axis(numeric_field(fields, 2));
        let y = normalize_axis(numeric_field(fields, 3));

        frame.move_axis = StickPosition::new(x, y);

        if move_btn > MOVE_BUTTON_THRESHOLD {
            // Stub: the firmware reports the stick's click button here, but
            // no engine action is assigned yet (a sprint trigger was the
            // candidate). Kept as a documented no-op.
            trace!("MOVE button field active ({}), no action assigned", move_btn);
        }
    }

    /// `CAM_<ignored>_<x>_<y>` - right stick; the first field is skipped by design
    fn decode_cam(&self, fields: &[&str], frame: &mut GamepadFrame) {
        let x = normalize_axis(numeric_field(fields, 2));
        let y = normalize_axis(numeric_field(fields, 3));

        frame.camera_axis = StickPosition::new(x, y);
    }

    /// `BTN_<name>` - replaces the whole button mask
    ///
    /// Last write wins when a line carries several `BTN_` tokens, and an
    /// unrecognized name clears the mask. Both follow the device contract;
    /// see the decoder tests.
    fn decode_button(&self, fields: &[&str], frame: &mut GamepadFrame) {
        let name = fields.get(1).map(|n| n.trim()).unwrap_or("");
        frame.buttons = match AccessoryButton::from_wire(name) {
            Some(button) => button.mask(),
            None => {
                trace!("Unrecognized button name: {:?}", name);
                0
            }
        };
    }
}

/// Best-effort float parse of an underscore field, defaulting to zero.
fn numeric_field(fields: &[&str], index: usize) -> f32 {
    fields
        .get(index)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> GamepadFrame {
        FrameDecoder::new().decode_line(line)
    }

    #[test]
    fn decodes_full_example_line() {
        let frame = decode("MOVE_0.0_15.0_-20.0 CAM_0_5.0_0.5 BTN_B");

        assert_eq!(frame.move_axis, StickPosition::new(1.5, -2.0));
        assert_eq!(frame.camera_axis, StickPosition::new(0.5, 0.0));
        assert_eq!(frame.buttons, 1 << 5);
    }

    #[test]
    fn move_axes_inside_deadzone_decode_to_zero() {
        let frame = decode("MOVE_0.0_1.0_-1.0");
        assert_eq!(frame.move_axis, StickPosition::new(0.0, 0.0));
    }

    #[test]
    fn cam_leading_field_is_ignored() {
        // The first CAM field carries no meaning; only x/y matter.
        let frame = decode("CAM_99.9_20.0_-15.0");
        assert_eq!(frame.camera_axis, StickPosition::new(2.0, -1.5));
    }

    #[test]
    fn move_button_field_has_no_effect() {
        let pressed = decode("MOVE_1.0_15.0_15.0");
        let released = decode("MOVE_0.0_15.0_15.0");
        assert_eq!(pressed, released);
    }

    #[test]
    fn btn_y_sets_only_bit_four() {
        let frame = decode("BTN_Y");
        assert_eq!(frame.buttons, 1 << 4);
    }

    #[test]
    fn unrecognized_button_clears_mask() {
        let frame = decode("BTN_Q");
        assert_eq!(frame.buttons, 0);
    }

    #[test]
    fn button_name_tolerates_trailing_whitespace() {
        let frame = decode("BTN_A ");
        assert_eq!(frame.buttons, 1 << 6);
    }

    #[test]
    fn second_btn_token_overwrites_first() {
        // Device contract as shipped: the mask is assigned, not OR-ed, so a
        // line with two BTN_ tokens keeps only the second. The firmware never
        // emits more than one per line; if it ever does, OR-ing is the likely
        // intended behavior. This test pins the current behavior on purpose.
        let frame = decode("BTN_Y BTN_B");
        assert_eq!(frame.buttons, 1 << 5);
    }

    #[test]
    fn malformed_numeric_fields_default_to_zero() {
        let frame = decode("MOVE_abc_xyz_15.0");
        assert_eq!(frame.move_axis, StickPosition::new(0.0, 1.5));
    }

    #[test]
    fn short_tokens_decode_to_neutral() {
        let frame = decode("MOVE_ CAM BTN");
        assert_eq!(frame, GamepadFrame::default());
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let frame = decode("GYRO_1.0_2.0 BTN_X");
        assert_eq!(frame.buttons, 1 << 7);
        assert_eq!(frame.move_axis, StickPosition::default());
    }

    #[test]
    fn empty_line_yields_neutral_frame() {
        assert_eq!(decode(""), GamepadFrame::default());
    }
}
