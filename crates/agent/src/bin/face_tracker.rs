//! Face tracker process
//!
//! Reads face collaborator output as JSON lines and ships one face record
//! per frame to the agent.

use agent::{init_logging, open_input, Settings};
use detectors::{FaceTracker, JsonLinesFaceFeed};
use telemetry::TelemetrySender;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.log_level)?;

    let input = open_input(settings.face_input.as_deref())?;
    let mut feed = JsonLinesFaceFeed::new(input);
    let mut tracker = FaceTracker::new(settings.face_tracker.clone());
    let mut sender = TelemetrySender::new(settings.face_sender.clone());

    tracker.run(&mut feed, |record| {
        // Undeliverable records are dropped; the sender logs the cause
        let _ = sender.send(&record);
    })?;

    info!(
        "Face tracker done: {} frames, {} sent, {} dropped",
        tracker.frames(),
        sender.sent(),
        sender.dropped()
    );
    Ok(())
}
