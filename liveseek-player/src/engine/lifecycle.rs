//! Engine lifecycle - ownership of the single live engine
//!
//! **Responsibilities:**
//! - Create, attach and start loading an engine for a descriptor
//! - Tear the engine down completely before another one is created
//! - Forget per-acquisition state (descriptor) on teardown
//!
//! All operations are synchronous, so a `reload` run under the session's
//! lifecycle lock is never observed with two live engines.

use super::{Engine, EngineEnvelope, EngineEventSender, EngineFactory, OutputSink};
use crate::error::{Error, Result};
use crate::source::StreamDescriptor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct EngineLifecycle {
    factory: Arc<dyn EngineFactory>,
    sink: OutputSink,
    events_tx: mpsc::UnboundedSender<EngineEnvelope>,
    engine: Option<Box<dyn Engine>>,
    descriptor: Option<StreamDescriptor>,
}

impl EngineLifecycle {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        sink: OutputSink,
        events_tx: mpsc::UnboundedSender<EngineEnvelope>,
    ) -> Self {
        Self {
            factory,
            sink,
            events_tx,
            engine: None,
            descriptor: None,
        }
    }

    /// Create an engine for `descriptor` whose events carry `generation`
    ///
    /// An already-live engine is destroyed first. On failure no engine is live
    /// and the session may retry with another descriptor.
    pub fn create(&mut self, descriptor: StreamDescriptor, generation: u64) -> Result<()> {
        if self.engine.is_some() {
            warn!("create() called with a live engine, destroying it first");
            self.destroy();
        }

        let events = EngineEventSender::new(generation, self.events_tx.clone());
        let mut engine = self
            .factory
            .create(&descriptor, events)
            .map_err(|e| Error::EngineInstantiation(e.to_string()))?;

        let started = match engine.attach(&self.sink) {
            Ok(()) => engine.load(),
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            warn!("Engine failed to start loading {}: {}", descriptor.url(), e);
            teardown(engine.as_mut());
            return Err(Error::EngineInstantiation(e.to_string()));
        }

        info!(
            "Engine created (generation {}): {}",
            generation,
            descriptor.url()
        );
        self.engine = Some(engine);
        self.descriptor = Some(descriptor);
        Ok(())
    }

    /// Destroy the live engine, if any
    ///
    /// Returns true when an engine was torn down.
    pub fn destroy(&mut self) -> bool {
        self.descriptor = None;
        match self.engine.take() {
            Some(mut engine) => {
                teardown(engine.as_mut());
                debug!("Engine destroyed");
                true
            }
            None => false,
        }
    }

    /// Destroy then create, without any window with two live engines
    pub fn reload(&mut self, descriptor: StreamDescriptor, generation: u64) -> Result<()> {
        self.destroy();
        self.create(descriptor, generation)
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&dyn Engine> {
        self.engine.as_deref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut (dyn Engine + 'static)> {
        self.engine.as_deref_mut()
    }

    /// Descriptor of the live engine
    pub fn descriptor(&self) -> Option<&StreamDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }
}

impl Drop for EngineLifecycle {
    fn drop(&mut self) {
        self.destroy();
    }
}

// Best-effort: a failed step must not stop the remaining ones
fn teardown(engine: &mut dyn Engine) {
    if let Err(e) = engine.unload() {
        warn!("Engine unload failed (ignored): {}", e);
    }
    if let Err(e) = engine.detach() {
        warn!("Engine detach failed (ignored): {}", e);
    }
    if let Err(e) = engine.destroy() {
        warn!("Engine destroy failed (ignored): {}", e);
    }
}
