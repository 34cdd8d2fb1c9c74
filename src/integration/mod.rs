//! Engine-facing integration glue
//!
//! Wires the transport and protocol layers into something a host engine can
//! drive once per frame:
//!
//! ```text
//! Accessory ──► Transport ──► FrameDecoder ──► InputSink (host engine)
//!                   ▲
//!                   └── Command / FeedbackSequencer (LED, vibration)
//! ```
//!
//! The host owns the schedule: it calls [`controller::MicrotwiController::poll`]
//! on every frame tick and passes its clock in, so the whole integration stays
//! single-threaded and deterministic under test. Collaborators (input sink,
//! connection status listener) are passed in explicitly rather than reached
//! through a global instance.

pub mod controller;
pub mod feedback;

pub use controller::{ConnectionListener, InputSink, MicrotwiController};
pub use feedback::FeedbackSequencer;
