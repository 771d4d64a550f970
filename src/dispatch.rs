//! Producer/consumer dispatch
//!
//! One async producer pulls batches from a [`StrokeSource`] into an unbounded
//! queue. One consumer, on its own thread because serial I/O blocks, takes a
//! batch, plans it, writes it and only then takes the next, so at most one
//! stroke is ever in flight.

use crate::session::PaintSession;
use crate::source::StrokeSource;
use crate::stroke::StrokeBatch;
use paintkit_communication::BufferedTransport;
use paintkit_core::{Error, Result, StrokeError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Shutdown flag shared by main, the producer and the consumer
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn trigger(&self) {
        if !self.sender.send_replace(true) {
            tracing::info!("Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender lives as long as self, so this only returns once set
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull batches from `source` until it ends, the queue closes or shutdown
pub async fn run_producer(
    mut source: Box<dyn StrokeSource>,
    queue: mpsc::UnboundedSender<StrokeBatch>,
    shutdown: ShutdownSignal,
) {
    tracing::info!("Producer reading from {}", source.describe());
    loop {
        let next = tokio::select! {
            _ = shutdown.wait() => break,
            next = source.next_batch() => next,
        };
        match next {
            Ok(Some(batch)) => {
                if queue.send(batch).is_err() {
                    tracing::warn!("Consumer has stopped, producer exiting");
                    break;
                }
                tracing::debug!("Stroke queued");
            }
            Ok(None) => {
                tracing::info!("{} exhausted", source.describe());
                break;
            }
            Err(e) => tracing::warn!("Skipping stroke message: {:#}", e),
        }
    }
}

/// Outcome counters of a dispatch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Strokes written to the controller
    pub painted: usize,
    /// Strokes rejected before reaching the controller
    pub rejected: usize,
    /// Controller alarms raised while writing
    pub faults: usize,
}

/// The consumer: owns the session and the transport
pub struct Dispatcher {
    session: PaintSession,
    transport: BufferedTransport,
    canvas_path: Option<PathBuf>,
    report: DispatchReport,
}

impl Dispatcher {
    pub fn new(session: PaintSession, transport: BufferedTransport) -> Self {
        Self {
            session,
            transport,
            canvas_path: None,
            report: DispatchReport::default(),
        }
    }

    /// Save the tracker canvas here when the run ends
    pub fn with_canvas_path(mut self, path: Option<PathBuf>) -> Self {
        self.canvas_path = path;
        self
    }

    pub fn session(&self) -> &PaintSession {
        &self.session
    }

    pub fn transport(&self) -> &BufferedTransport {
        &self.transport
    }

    pub fn report(&self) -> DispatchReport {
        self.report
    }

    /// Wake and home the controller; strokes are only taken once this succeeds
    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect()
    }

    /// Plan and write one stroke
    ///
    /// Stroke errors are counted and logged; only transport failures that a
    /// re-home cannot recover are returned.
    pub fn handle(&mut self, batch: &StrokeBatch) -> Result<()> {
        let commands = match self.session.plan(batch) {
            Ok(commands) => commands,
            Err(e) => {
                self.report.rejected += 1;
                match &e {
                    Error::Stroke(StrokeError::BoundsViolation { .. }) => {
                        tracing::error!("Stroke rejected: {}", e)
                    }
                    _ => tracing::warn!("Stroke rejected: {}", e),
                }
                return Ok(());
            }
        };

        let lines = commands.to_gcode_lines();
        match self.transport.safe_write(&lines) {
            Ok(()) => {
                self.session.confirm(&commands);
                self.report.painted += 1;
                tracing::info!(
                    "Stroke sent ({} lines, {} acknowledged so far)",
                    lines.len(),
                    self.transport.lines_acknowledged()
                );
                Ok(())
            }
            Err(e) if e.is_fault() => {
                self.report.faults += 1;
                tracing::error!("{}; from commands:\n{}", e, lines.join("\n"));
                tracing::warn!("Dispatch halted, re-homing");
                self.transport.home()?;
                self.session.homed();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Consume the queue until it closes or shutdown is requested
    ///
    /// Blocks; run it on a dedicated thread. The shutdown sequence always runs,
    /// even after an error.
    pub fn run(
        mut self,
        mut queue: mpsc::UnboundedReceiver<StrokeBatch>,
        shutdown: ShutdownSignal,
    ) -> Result<DispatchReport> {
        let result = self.consume(&mut queue, &shutdown);
        if let Err(e) = &result {
            tracing::error!("Consumer stopped: {}", e);
        }
        shutdown.trigger();
        self.finish();
        result.map(|()| self.report)
    }

    fn consume(
        &mut self,
        queue: &mut mpsc::UnboundedReceiver<StrokeBatch>,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        self.connect()?;

        while !shutdown.is_triggered() {
            let Some(batch) = queue.blocking_recv() else {
                tracing::info!("Stroke queue closed");
                break;
            };
            tracing::info!("Stroke taken from queue");
            self.handle(&batch)?;
        }
        Ok(())
    }

    /// Best-effort parking: drop the brush, wait for the controller, home
    fn finish(&mut self) {
        let release = self.session.release_commands();
        if !release.is_empty() {
            if let Err(e) = self.transport.safe_write(&release.to_gcode_lines()) {
                tracing::error!("Could not return the brush: {}", e);
            }
        }
        if self.transport.is_ready() {
            if let Err(e) = self.transport.flush() {
                tracing::error!("Flush failed: {}", e);
            }
            if let Err(e) = self.transport.home() {
                tracing::error!("Final homing failed: {}", e);
            }
        }
        if let Some(path) = &self.canvas_path {
            if let Err(e) = self.session.save_canvas(path) {
                tracing::warn!("{}", e);
            }
        }
        if let Err(e) = self.transport.close() {
            tracing::warn!("Closing {} failed: {}", self.transport.port_name(), e);
        }
        tracing::info!(
            "Dispatch finished: {} painted, {} rejected, {} faults",
            self.report.painted,
            self.report.rejected,
            self.report.faults
        );
    }
}
