//! Demo host loop for the Microtwi integration
//!
//! Stands in for a game engine's update loop: discovers the accessory,
//! polls it at ~60 Hz, and logs the decoded gamepad frames. In an actual
//! engine embedding, the `InputSink` implementation would queue state events
//! on the engine's virtual input device instead.

use std::time::{Duration, Instant};

use color_eyre::Result;
use microtwi::config::MicrotwiConfig;
use microtwi::integration::{ConnectionListener, InputSink, MicrotwiController};
use microtwi::protocol::GamepadFrame;
use microtwi::transport::DiscoverySettings;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Frame interval of the demo scheduler
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Forwards decoded frames onto a channel for the logging task
struct ChannelSink {
    frames: mpsc::Sender<GamepadFrame>,
}

impl InputSink for ChannelSink {
    fn inject(&mut self, frame: GamepadFrame) {
        if let Err(e) = self.frames.try_send(frame) {
            debug!("Dropping frame: {}", e);
        }
    }
}

/// Publishes connection status on a watch channel
struct WatchListener {
    status: watch::Sender<bool>,
}

impl ConnectionListener for WatchListener {
    fn connection_changed(&mut self, connected: bool) {
        let _ = self.status.send(connected);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    if let Err(e) = MicrotwiConfig::ensure_default_config() {
        warn!("Could not write default config: {}", e);
    }
    let config = MicrotwiConfig::load();
    let settings = DiscoverySettings::from_config(&config.serial);

    let (frame_tx, mut frame_rx) = mpsc::channel(100);
    let (status_tx, mut status_rx) = watch::channel(false);
    let mut sink = ChannelSink { frames: frame_tx };
    let listener = WatchListener { status: status_tx };

    tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            debug!(
                "Frame: move=({:.2}, {:.2}) cam=({:.2}, {:.2}) buttons={:#06x}",
                frame.move_axis.x,
                frame.move_axis.y,
                frame.camera_axis.x,
                frame.camera_axis.y,
                frame.buttons
            );
        }
    });

    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let connected = *status_rx.borrow();
            info!("Accessory connection status: {}", connected);
        }
    });

    // Discovery blocks up to the handshake budget per port.
    info!("Searching for Microtwi accessory");
    let (mut controller, mut listener, connected) = tokio::task::spawn_blocking(move || {
        let mut controller = MicrotwiController::new();
        let mut listener = listener;
        let connected = controller.connect(&settings, &mut listener);
        (controller, listener, connected)
    })
    .await?;

    if !connected {
        warn!("No accessory found, exiting (re-run to retry)");
        return Ok(());
    }

    // Greeting blink so the device visibly acknowledges the connection.
    controller.blink_leds(
        Duration::from_millis(config.feedback.blink_duration_ms),
        config.feedback.connect_blink_iterations,
        1,
        Instant::now(),
    );

    let mut frame_tick = tokio::time::interval(FRAME_INTERVAL);
    loop {
        tokio::select! {
            _ = frame_tick.tick() => {
                controller.poll(&mut sink, &mut listener, Instant::now());
                if !controller.is_initialized() {
                    warn!("Integration disabled itself, stopping frame loop");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    controller.disable(&mut listener);
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
