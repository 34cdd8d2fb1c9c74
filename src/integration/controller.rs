//! Microtwi controller - lifecycle and per-frame glue
//!
//! Owns the single transport to the accessory and turns its line stream into
//! per-poll [`GamepadFrame`] deliveries. Every failure mode degrades to
//! "controller inactive": discovery misses and I/O errors disable the
//! integration and are reported through the [`ConnectionListener`], never as
//! a crash path into the host.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::integration::feedback::FeedbackSequencer;
use crate::protocol::{Command, FrameDecoder, GamepadFrame};
use crate::transport::{discover, DiscoverySettings, Transport};

/// Host engine's virtual-input injection point
///
/// Receives exactly one fully-populated frame per poll while the integration
/// is enabled, including all-zero frames when no tokens were recognized.
pub trait InputSink {
    fn inject(&mut self, frame: GamepadFrame);
}

/// Connection status collaborator (settings menu, UI indicator, ...)
///
/// Notified after discovery succeeds or fails, and again on manual disable.
pub trait ConnectionListener {
    fn connection_changed(&mut self, connected: bool);
}

/// Integration between the Microtwi accessory and the host input subsystem
///
/// # Lifecycle
///
/// 1. [`connect`](Self::connect) (or [`attach`](Self::attach) with a
///    platform-native transport) enables the integration.
/// 2. The host scheduler calls [`poll`](Self::poll) once per frame tick.
/// 3. Any transport error, or an explicit [`disable`](Self::disable),
///    destroys the transport and disables further polling until a manual
///    reconnect. There is no automatic re-scan.
///
/// Collaborators are injected per call; the controller holds no global state
/// and can be owned by whichever host component drives the frame loop.
pub struct MicrotwiController {
    transport: Option<Box<dyn Transport>>,
    decoder: FrameDecoder,
    last_frame: GamepadFrame,
    led: FeedbackSequencer,
    vibration: FeedbackSequencer,
    initialized: bool,
}

impl Default for MicrotwiController {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrotwiController {
    pub fn new() -> Self {
        Self {
            transport: None,
            decoder: FrameDecoder::new(),
            last_frame: GamepadFrame::default(),
            led: FeedbackSequencer::led(),
            vibration: FeedbackSequencer::vibration(),
            initialized: false,
        }
    }

    /// Whether a transport is attached and polling is enabled
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Runs serial discovery and attaches the matched transport.
    ///
    /// Blocks up to the handshake budget per candidate port, so call this
    /// from startup or a manual-retry action, not from the frame loop. The
    /// listener is notified of the outcome either way; on failure the
    /// integration stays disabled until the host retries.
    pub fn connect(
        &mut self,
        settings: &DiscoverySettings,
        listener: &mut dyn ConnectionListener,
    ) -> bool {
        match discover(settings) {
            Ok(transport) => {
                info!("Accessory connected on {}", transport.port_name());
                self.attach(Box::new(transport), listener);
                true
            }
            Err(e) => {
                warn!("Accessory discovery failed: {}", e);
                self.initialized = false;
                listener.connection_changed(false);
                false
            }
        }
    }

    /// Attaches an already-open transport and enables the integration.
    pub fn attach(&mut self, transport: Box<dyn Transport>, listener: &mut dyn ConnectionListener) {
        self.transport = Some(transport);
        self.last_frame = GamepadFrame::default();
        self.initialized = true;
        listener.connection_changed(true);
    }

    /// Per-frame tick: read, decode, inject, drive feedback sequences.
    ///
    /// No-op while disabled. One non-blocking line read per call; a fresh
    /// line replaces the decoded state, otherwise the previous frame is
    /// delivered again. A read error tears the transport down, disables the
    /// integration, and notifies the listener; nothing is injected in that
    /// case.
    pub fn poll(
        &mut self,
        sink: &mut dyn InputSink,
        listener: &mut dyn ConnectionListener,
        now: Instant,
    ) {
        if !self.initialized {
            return;
        }

        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        match transport.read_line() {
            Ok(Some(line)) => {
                debug!("Frame line received: {:?}", line);
                self.last_frame = self.decoder.decode_line(&line);
            }
            Ok(None) => {}
            Err(e) => {
                error!("Serial read failed, disabling integration: {}", e);
                self.teardown();
                listener.connection_changed(false);
                return;
            }
        }

        sink.inject(self.last_frame);

        let due: Vec<Command> = self
            .led
            .tick(now)
            .into_iter()
            .chain(self.vibration.tick(now))
            .collect();
        for command in due {
            self.send(command);
        }
    }

    /// Fire-and-forget command to the accessory.
    ///
    /// Silent no-op without an open transport. A write error is treated like
    /// any transport failure: the link is discarded and the integration
    /// disabled.
    pub fn send(&mut self, command: Command) {
        let Some(transport) = self.transport.as_mut() else {
            debug!("Dropping {} - no transport open", command);
            return;
        };

        if let Err(e) = transport.write_line(command.as_line()) {
            error!("Serial write failed, disabling integration: {}", e);
            self.teardown();
        }
    }

    /// Starts an LED blink sequence; returns whether it was accepted.
    pub fn blink_leds(
        &mut self,
        on_duration: Duration,
        iterations: u32,
        priority: i32,
        now: Instant,
    ) -> bool {
        match self.led.request(on_duration, iterations, priority, now) {
            Some(command) => {
                self.send(command);
                true
            }
            None => false,
        }
    }

    /// Starts a vibration sequence; returns whether it was accepted.
    pub fn vibrate(
        &mut self,
        on_duration: Duration,
        iterations: u32,
        priority: i32,
        now: Instant,
    ) -> bool {
        match self.vibration.request(on_duration, iterations, priority, now) {
            Some(command) => {
                self.send(command);
                true
            }
            None => false,
        }
    }

    /// Manual shutdown: closes the transport and notifies the listener.
    pub fn disable(&mut self, listener: &mut dyn ConnectionListener) {
        info!("Disabling Microtwi integration");
        self.teardown();
        listener.connection_changed(false);
    }

    fn teardown(&mut self) {
        self.transport = None;
        self.initialized = false;
        self.last_frame = GamepadFrame::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StickPosition;
    use crate::transport::TransportError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    enum ReadScript {
        Line(&'static str),
        Nothing,
        Fail,
    }

    struct MockTransport {
        reads: VecDeque<ReadScript>,
        written: Arc<Mutex<Vec<String>>>,
        fail_writes: bool,
    }

    impl MockTransport {
        fn scripted(reads: Vec<ReadScript>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let written = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    reads: reads.into(),
                    written: written.clone(),
                    fail_writes: false,
                },
                written,
            )
        }
    }

    impl Transport for MockTransport {
        fn read_line(&mut self) -> Result<Option<String>, TransportError> {
            match self.reads.pop_front() {
                Some(ReadScript::Line(line)) => Ok(Some(line.to_string())),
                Some(ReadScript::Fail) => Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "device detached",
                ))),
                Some(ReadScript::Nothing) | None => Ok(None),
            }
        }

        fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "device detached",
                )));
            }
            self.written.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<GamepadFrame>,
    }

    impl InputSink for RecordingSink {
        fn inject(&mut self, frame: GamepadFrame) {
            self.frames.push(frame);
        }
    }

    #[derive(Default)]
    struct StatusRecorder {
        events: Vec<bool>,
    }

    impl ConnectionListener for StatusRecorder {
        fn connection_changed(&mut self, connected: bool) {
            self.events.push(connected);
        }
    }

    fn attached(reads: Vec<ReadScript>) -> (MicrotwiController, Arc<Mutex<Vec<String>>>, StatusRecorder) {
        let (mock, written) = MockTransport::scripted(reads);
        let mut controller = MicrotwiController::new();
        let mut listener = StatusRecorder::default();
        controller.attach(Box::new(mock), &mut listener);
        (controller, written, listener)
    }

    #[test]
    fn poll_injects_decoded_frame() {
        let (mut controller, _, mut listener) = attached(vec![ReadScript::Line(
            "MOVE_0.0_15.0_-20.0 CAM_0_5.0_0.5 BTN_B",
        )]);
        let mut sink = RecordingSink::default();

        controller.poll(&mut sink, &mut listener, Instant::now());

        assert_eq!(listener.events, vec![true]);
        assert_eq!(sink.frames.len(), 1);
        let frame = sink.frames[0];
        assert_eq!(frame.move_axis, StickPosition::new(1.5, -2.0));
        assert_eq!(frame.camera_axis, StickPosition::new(0.5, 0.0));
        assert_eq!(frame.buttons, 1 << 5);
    }

    #[test]
    fn quiet_poll_redelivers_previous_frame() {
        let (mut controller, _, mut listener) =
            attached(vec![ReadScript::Line("BTN_Y"), ReadScript::Nothing]);
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        controller.poll(&mut sink, &mut listener, now);
        controller.poll(&mut sink, &mut listener, now);

        assert_eq!(sink.frames.len(), 2);
        assert_eq!(sink.frames[0], sink.frames[1]);
        assert_eq!(sink.frames[1].buttons, 1 << 4);
    }

    #[test]
    fn read_error_disables_and_notifies() {
        let (mut controller, _, mut listener) = attached(vec![ReadScript::Fail]);
        let mut sink = RecordingSink::default();

        controller.poll(&mut sink, &mut listener, Instant::now());

        assert!(!controller.is_initialized());
        assert!(sink.frames.is_empty());
        assert_eq!(listener.events, vec![true, false]);

        // Further polls are no-ops.
        controller.poll(&mut sink, &mut listener, Instant::now());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn send_writes_command_line() {
        let (mut controller, written, _) = attached(vec![]);

        controller.send(Command::UseLed);
        controller.send(Command::ResetFade);

        assert_eq!(*written.lock().unwrap(), vec!["USE_LED", "RESET_FADE"]);
    }

    #[test]
    fn send_without_transport_is_a_noop() {
        let mut controller = MicrotwiController::new();
        controller.send(Command::LedOn);
        assert!(!controller.is_initialized());
    }

    #[test]
    fn write_error_disables_integration() {
        let (mut mock, _) = MockTransport::scripted(vec![]);
        mock.fail_writes = true;
        let mut controller = MicrotwiController::new();
        let mut listener = StatusRecorder::default();
        controller.attach(Box::new(mock), &mut listener);

        controller.send(Command::VibrateOn);

        assert!(!controller.is_initialized());
    }

    #[test]
    fn blink_sequence_runs_through_poll_ticks() {
        let (mut controller, written, mut listener) = attached(vec![]);
        let mut sink = RecordingSink::default();
        let on = Duration::from_millis(200);
        let start = Instant::now();

        assert!(controller.blink_leds(on, 2, 1, start));
        assert_eq!(*written.lock().unwrap(), vec!["LED_ON"]);

        // First iteration elapses: off, then on again.
        controller.poll(&mut sink, &mut listener, start + on);
        assert_eq!(
            *written.lock().unwrap(),
            vec!["LED_ON", "LED_OFF", "LED_ON"]
        );

        // Second iteration elapses: final off.
        controller.poll(&mut sink, &mut listener, start + on * 2);
        assert_eq!(
            *written.lock().unwrap(),
            vec!["LED_ON", "LED_OFF", "LED_ON", "LED_OFF"]
        );
    }

    #[test]
    fn lower_priority_vibration_is_rejected_while_active() {
        let (mut controller, written, _) = attached(vec![]);
        let on = Duration::from_millis(200);
        let now = Instant::now();

        assert!(controller.vibrate(on, 5, 2, now));
        assert!(!controller.vibrate(on, 1, 1, now));

        // Only the accepted request reached the wire.
        assert_eq!(*written.lock().unwrap(), vec!["VIBRATE_ON"]);
    }

    #[test]
    fn led_and_vibration_priorities_are_independent() {
        let (mut controller, _, _) = attached(vec![]);
        let on = Duration::from_millis(200);
        let now = Instant::now();

        assert!(controller.vibrate(on, 5, 2, now));
        assert!(controller.blink_leds(on, 5, 1, now));
    }

    #[test]
    fn failed_discovery_disables_and_notifies() {
        // A candidate list with one nonexistent port makes discovery miss
        // without touching real hardware.
        let settings = DiscoverySettings {
            preferred_ports: vec!["/dev/microtwi-test-missing".to_string()],
            ..DiscoverySettings::default()
        };
        let mut controller = MicrotwiController::new();
        let mut listener = StatusRecorder::default();

        assert!(!controller.connect(&settings, &mut listener));
        assert!(!controller.is_initialized());
        assert_eq!(listener.events, vec![false]);
    }

    #[test]
    fn disable_notifies_listener() {
        let (mut controller, _, mut listener) = attached(vec![]);

        controller.disable(&mut listener);

        assert!(!controller.is_initialized());
        assert_eq!(listener.events, vec![true, false]);
    }
}
