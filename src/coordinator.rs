use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    catalog::CatalogRecord,
    config::Configuration,
    error::AppError,
    pipeline::{
        controller::{CaptureController, Status},
        orchestration::GesturePipeline,
    },
    sensing::{FrameSource, LandmarkSource},
    sink::{self, CaptureSink},
};

const COMMAND_BUFFER_SIZE: usize = 16;

/// Admits one holder at a time without queueing the rest.
pub struct SingleFlight<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SingleFlight<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// `None` while another holder is active.
    pub fn try_enter(&self) -> Option<OwnedMutexGuard<T>> {
        self.inner.clone().try_lock_owned().ok()
    }
}

impl<T> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoopStats {
    scheduled: AtomicU64,
    evaluated: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStatsSnapshot {
    pub scheduled: u64,
    pub evaluated: u64,
    pub skipped: u64,
}

impl LoopStats {
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            evaluated: self.evaluated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

enum SessionCommand {
    SetTarget(Option<CatalogRecord>),
    Reset,
}

/// Everything one evaluation touches. Only the task holding the gate sees it.
struct Session {
    frames: Box<dyn FrameSource>,
    pipeline: GesturePipeline,
    controller: CaptureController,
    commands: mpsc::Receiver<SessionCommand>,
    status_tx: watch::Sender<Status>,
}

impl Session {
    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                SessionCommand::SetTarget(target) => self.controller.set_target(target),
                SessionCommand::Reset => self.controller.reset(),
            }
        }
    }

    async fn run_tick(&mut self) {
        self.apply_commands();

        let status = match self.frames.grab().await {
            Ok(frame) => {
                let context = self.pipeline.evaluate(frame).await;
                let classification = context.classification();
                debug!(
                    stage = context.stage(),
                    sensing_failed = context.sensing().is_failure(),
                    verdict = classification.verdict.as_str(),
                    open = classification.open_fingers,
                    closed = classification.closed_fingers,
                    elapsed_ms = context.elapsed().as_millis() as u64,
                    "Frame evaluated"
                );
                self.controller.tick(Instant::now().into_std(), &context)
            }
            Err(e) => {
                warn!("Frame grab failed: {}", e);
                self.controller
                    .tick_without_frame(Instant::now().into_std(), e.to_string())
            }
        };

        if self.status_tx.borrow().message != status.message {
            info!(phase = status.phase, "{}", status.message);
        }
        self.status_tx.send_replace(status);
    }
}

pub struct Coordinator {
    loop_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    status_rx: watch::Receiver<Status>,
    commands: mpsc::Sender<SessionCommand>,
    stats: Arc<LoopStats>,
}

impl Coordinator {
    fn new(
        period: Duration,
        session: Session,
        status_rx: watch::Receiver<Status>,
        commands: mpsc::Sender<SessionCommand>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let stats = Arc::new(LoopStats::default());
        let loop_task = Self::start_poll_loop(
            period,
            SingleFlight::new(session),
            stats.clone(),
            cancel_token.clone(),
        );

        Self {
            loop_task: Some(loop_task),
            cancel_token,
            status_rx,
            commands,
            stats,
        }
    }

    fn start_poll_loop(
        period: Duration,
        gate: SingleFlight<Session>,
        stats: Arc<LoopStats>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut evaluation: Option<JoinHandle<()>> = None;
            info!(period_ms = period.as_millis() as u64, "Poll loop started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    _ = interval.tick() => {
                        stats.scheduled.fetch_add(1, Ordering::Relaxed);
                        match gate.try_enter() {
                            Some(mut session) => {
                                stats.evaluated.fetch_add(1, Ordering::Relaxed);
                                let token = cancel_token.clone();
                                evaluation = Some(tokio::spawn(async move {
                                    tokio::select! {
                                        biased;
                                        _ = token.cancelled() => debug!("Evaluation cancelled"),
                                        _ = session.run_tick() => {}
                                    }
                                }));
                            }
                            None => {
                                stats.skipped.fetch_add(1, Ordering::Relaxed);
                                debug!("Previous evaluation still running, skipping tick");
                            }
                        }
                    }
                }
            }

            if let Some(evaluation) = evaluation {
                if let Err(e) = evaluation.await {
                    warn!("Evaluation task failed: {}", e);
                }
            }
            info!("Poll loop stopped");
        })
    }

    /// Receives every status the loop publishes.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    pub fn stats(&self) -> LoopStatsSnapshot {
        self.stats.snapshot()
    }

    /// Applied at the start of the next evaluation.
    pub async fn set_target(&self, target: Option<CatalogRecord>) -> Result<(), AppError> {
        self.send(SessionCommand::SetTarget(target)).await
    }

    pub async fn reset(&self) -> Result<(), AppError> {
        self.send(SessionCommand::Reset).await
    }

    async fn send(&self, command: SessionCommand) -> Result<(), AppError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::Pipeline("Capture session has stopped".to_string()))
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Stops the loop and waits for it to finish. No evaluation starts afterwards.
    pub async fn shutdown(mut self) -> LoopStatsSnapshot {
        self.stop();
        if let Some(loop_task) = self.loop_task.take() {
            if let Err(e) = loop_task.await {
                warn!("Poll loop task failed: {}", e);
            }
        }
        self.stats.snapshot()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    frame_source: Option<Box<dyn FrameSource>>,
    landmark_source: Option<Arc<dyn LandmarkSource>>,
    sink: Option<Arc<dyn CaptureSink>>,
    target: Option<CatalogRecord>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            frame_source: None,
            landmark_source: None,
            sink: None,
            target: None,
        }
    }

    pub fn frame_source(mut self, frame_source: Box<dyn FrameSource>) -> Self {
        self.frame_source = Some(frame_source);
        self
    }

    pub fn landmark_source(mut self, landmark_source: Arc<dyn LandmarkSource>) -> Self {
        self.landmark_source = Some(landmark_source);
        self
    }

    // Uses this sink instead of the one described by the configuration.
    pub fn sink(mut self, sink: Arc<dyn CaptureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // Sets the poll interval, this will override the default configuration.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.configuration.poll.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn target(mut self, target: CatalogRecord) -> Self {
        self.target = Some(target);
        self
    }

    /// Spawns the poll loop; must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let frames = self
            .frame_source
            .ok_or(AppError::Pipeline("Frame source not set".to_string()))?;
        let landmarks = self
            .landmark_source
            .ok_or(AppError::Pipeline("Landmark source not set".to_string()))?;
        let sink = match self.sink {
            Some(sink) => sink,
            None => sink::from_config(&self.configuration.sink)?,
        };
        info!(sink = sink.name(), landmarks = landmarks.name(), "Building capture session");

        let mut pipeline = GesturePipeline::builder(landmarks)
            .classifier(self.configuration.gesture.classifier())
            .hand_selection(self.configuration.gesture.hand_selection);
        if let Some(timeout) = self.configuration.poll.sensing_timeout() {
            pipeline = pipeline.sensing_timeout(timeout);
        }

        let mut controller = CaptureController::new(self.configuration.capture, sink);
        controller.set_target(self.target);

        let (status_tx, status_rx) = watch::channel(Status::initial());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let session = Session {
            frames,
            pipeline: pipeline.build(),
            controller,
            commands: command_rx,
            status_tx,
        };

        Ok(Coordinator::new(
            self.configuration.poll.interval(),
            session,
            status_rx,
            command_tx,
        ))
    }
}
