use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use serde_json::Value;

use crate::objects::blueprint::Blueprint;
use crate::objects::factory::{FactoryContext, ObjectFactory};

/// Why an object is being spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOrigin {
    /// Respawned from the saved snapshot at startup. Carries the position
    /// of the object in the restore list.
    Restore(usize),
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub kind: String,
    pub params: Value,
    /// World position, or `None` to place it in front of the viewer.
    pub position: Option<Vec3>,
    pub origin: SpawnOrigin,
}

pub struct SpawnResult {
    pub request: SpawnRequest,
    pub blueprint: anyhow::Result<Blueprint>,
}

/// Builds objects on the rayon pool (or inline) and hands the finished
/// blueprints back to the frame loop over a channel.
pub struct ObjectLoader {
    factory: Arc<ObjectFactory>,
    context: Arc<FactoryContext>,
    threaded: bool,
    sender: Sender<SpawnResult>,
    receiver: Receiver<SpawnResult>,
    in_flight: usize,
}

impl ObjectLoader {
    pub fn new(factory: ObjectFactory, context: FactoryContext, threaded: bool) -> Self {
        let (sender, receiver) = channel();

        Self {
            factory: Arc::new(factory),
            context: Arc::new(context),
            threaded,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn request(&mut self, request: SpawnRequest) {
        log::debug!("Queued {} ({:?})", request.kind, request.origin);
        self.in_flight += 1;

        let factory = Arc::clone(&self.factory);
        let context = Arc::clone(&self.context);
        let sender = self.sender.clone();
        let job = move || {
            let blueprint = factory.build(&context, &request.kind, &request.params);
            if sender.send(SpawnResult { request, blueprint }).is_err() {
                log::debug!("Object loader dropped before a job finished");
            }
        };

        if self.threaded {
            rayon::spawn(job);
        } else {
            job();
        }
    }

    /// Results of every job that has finished since the last call.
    pub fn load_pending(&mut self) -> Vec<SpawnResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }
        self.in_flight -= results.len();
        results
    }

    /// Blocks until every queued job has finished or `timeout` has passed.
    pub fn wait_pending(&mut self, timeout: Duration) -> Vec<SpawnResult> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::new();

        while self.in_flight > results.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(result) => results.push(result),
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "{} object jobs still running after {timeout:?}",
                        self.in_flight - results.len()
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.in_flight -= results.len();
        results
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}
