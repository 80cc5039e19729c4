use std::time::Duration;

use anyhow::Result;
use pinchbox::cli::SandboxArgs;
use pinchbox::config::SandboxConfig;
use pinchbox::persistence::FileStore;
use pinchbox::sandbox::Sandbox;
use pinchbox::tracking::{RecordedTracker, ScriptedTracker, SpatialTracker};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = SandboxArgs::parse_from_env()?;
    let mut config = SandboxConfig::load_or_default(&args.config_path)?;
    config.apply_overrides(&args.config_overrides());

    let store = FileStore::new(config.storage.snapshot_path.clone());
    let mut sandbox = Sandbox::new(config, Box::new(store));

    sandbox.restore();
    sandbox.wait_for_pending_objects(STARTUP_TIMEOUT);

    let mut tracker: Box<dyn SpatialTracker> = match &args.recording {
        Some(path) => Box::new(RecordedTracker::open(path)?),
        None => {
            log::info!("No recording given, running without hand input");
            Box::new(ScriptedTracker::new(Vec::new()))
        }
    };

    let mut frames = 0usize;
    let mut presses = 0usize;
    while args.max_frames.map_or(true, |max| frames < max) {
        let Some(frame) = tracker.next_frame() else {
            break;
        };

        let now = Duration::from_millis(frame.time_ms);
        let events = sandbox.frame(&frame, now);
        presses += events.presses.len();

        let moved = sandbox.scene.changed_nodes().len();
        if moved > 0 {
            log::trace!("Frame {frames}: {moved} nodes moved");
        }
        frames += 1;
    }

    sandbox.wait_for_pending_objects(STARTUP_TIMEOUT);
    sandbox.persist();

    log::info!(
        "Replayed {frames} frames, {presses} button presses, {} objects live \
         ({} nodes, {} meshes, {} vertices)",
        sandbox.registry().len(),
        sandbox.scene.node_count(),
        sandbox.scene.meshes.live_meshes(),
        sandbox.scene.meshes.live_vertices()
    );
    for entry in sandbox.snapshot() {
        println!("{} at {:?}", entry.kind, entry.pos);
    }

    Ok(())
}
