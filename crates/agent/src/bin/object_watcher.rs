//! Object watcher process
//!
//! Reads object collaborator output as JSON lines and ships one object
//! record per frame to the agent.

use agent::{init_logging, open_input, Settings};
use detectors::{JsonLinesObjectFeed, ObjectWatcher};
use telemetry::TelemetrySender;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.log_level)?;

    let input = open_input(settings.object_input.as_deref())?;
    let mut feed = JsonLinesObjectFeed::new(input);
    let mut watcher = ObjectWatcher::new(settings.object_watcher.clone());
    let mut sender = TelemetrySender::new(settings.object_sender.clone());

    watcher.run(&mut feed, |record| {
        let _ = sender.send(&record);
    })?;

    info!(
        "Object watcher done: {} frames, {} sent, {} dropped",
        watcher.frames(),
        sender.sent(),
        sender.dropped()
    );
    Ok(())
}
