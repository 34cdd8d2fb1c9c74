//! Timed blink/vibrate sequences with priority guarding

use std::time::{Duration, Instant};

use tracing::debug;

use crate::protocol::Command;

/// Priority of the idle sequencer; any real request uses a higher value.
pub const NEUTRAL_PRIORITY: i32 = 0;

/// Lower bound on requested iterations
pub const MIN_ITERATIONS: u32 = 1;

/// Upper bound on requested iterations
pub const MAX_ITERATIONS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    On { until: Instant, remaining: u32 },
}

/// Tick-driven state machine toggling an on/off command pair
///
/// An explicit machine the frame scheduler advances through
/// [`FeedbackSequencer::tick`]; no timers or suspend points of its own, so
/// sequences stay deterministic under the caller's clock. A priority
/// token guards concurrent requests: while a sequence runs, only a strictly
/// higher-priority request may start (and it preempts the running one); the
/// guard is checked at start only, so an accepted sequence always runs to
/// completion. On completion the token resets to [`NEUTRAL_PRIORITY`].
#[derive(Debug)]
pub struct FeedbackSequencer {
    on_command: Command,
    off_command: Command,
    on_duration: Duration,
    priority: i32,
    phase: Phase,
}

impl FeedbackSequencer {
    pub fn new(on_command: Command, off_command: Command) -> Self {
        Self {
            on_command,
            off_command,
            on_duration: Duration::ZERO,
            priority: NEUTRAL_PRIORITY,
            phase: Phase::Idle,
        }
    }

    /// Sequencer for the accessory LEDs
    pub fn led() -> Self {
        Self::new(Command::LedOn, Command::LedOff)
    }

    /// Sequencer for the vibration motor
    pub fn vibration() -> Self {
        Self::new(Command::VibrateOn, Command::VibrateOff)
    }

    /// Priority of the running sequence, or neutral when idle
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Starts a sequence of `iterations` on/off toggles.
    ///
    /// Rejected without any state change when a sequence of higher or equal
    /// priority is already running. Iterations are clamped to
    /// [`MIN_ITERATIONS`]..=[`MAX_ITERATIONS`]. On acceptance the priority
    /// token is claimed and the initial ON command returned for immediate
    /// sending.
    pub fn request(
        &mut self,
        on_duration: Duration,
        iterations: u32,
        priority: i32,
        now: Instant,
    ) -> Option<Command> {
        if self.is_active() && self.priority >= priority {
            debug!(
                "Rejecting {:?} request at priority {} ({} still running)",
                self.on_command, priority, self.priority
            );
            return None;
        }

        let iterations = iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS);
        self.on_duration = on_duration;
        self.priority = priority;
        self.phase = Phase::On {
            until: now + on_duration,
            remaining: iterations,
        };

        debug!(
            "Starting {:?} sequence: {} iterations at priority {}",
            self.on_command, iterations, priority
        );
        Some(self.on_command)
    }

    /// Advances the sequence against the caller's clock.
    ///
    /// Returns the commands that became due: OFF at the end of each
    /// on-duration, immediately followed by ON again while iterations remain.
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        let Phase::On { until, remaining } = self.phase else {
            return Vec::new();
        };
        if now < until {
            return Vec::new();
        }

        let mut due = vec![self.off_command];
        let remaining = remaining - 1;

        if remaining > 0 {
            due.push(self.on_command);
            self.phase = Phase::On {
                until: now + self.on_duration,
                remaining,
            };
        } else {
            debug!("{:?} sequence complete, releasing priority", self.on_command);
            self.phase = Phase::Idle;
            self.priority = NEUTRAL_PRIORITY;
        }

        due
    }
}
