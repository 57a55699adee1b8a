//! Client-side conversion pipeline.
//!
//! Three cosmetic steps advance on a fixed cadence while the single network
//! call runs. The two signals are independent: the call's completion is the
//! only ground truth, and the step display is reconciled against it once it
//! lands.
//!
//! ```text
//!   submit ──► [running, idle, idle]
//!      │          +400ms ─► [done, running, idle]
//!      │          +400ms ─► [done, done, running]
//!      └─ call resolves ─► +300ms ─► [done, done, done] + result
//!      └─ call faults   ─► running step := error, result := error
//! ```
//!
//! A call that resolves before the cadence finishes cuts it short: the steps
//! not yet reached are never shown as running, and the display jumps to
//! all-done after the reconcile delay. A step never starts after the result
//! is known.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::transport::{ConversionTransport, ServerReply, Upload};

pub const STEP_COUNT: usize = 3;

/// Display labels, in pipeline order.
pub const STEP_LABELS: [&str; STEP_COUNT] =
    ["Extracting content", "Analysing layout", "Building presentation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Idle,
    Success {
        artifact: Bytes,
        artifact_name: String,
    },
    Error {
        message: String,
        detail: Option<String>,
        hint: Option<String>,
    },
}

/// Observable pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub steps: [StepStatus; STEP_COUNT],
    pub result: ConversionResult,
    /// Bumped on every submission and reset. Updates from an older
    /// generation are discarded.
    pub generation: u64,
}

impl PipelineSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            steps: [StepStatus::Idle; STEP_COUNT],
            result: ConversionResult::Idle,
            generation,
        }
    }

    /// A step is running and no result has landed yet.
    pub fn in_flight(&self) -> bool {
        self.steps.contains(&StepStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTiming {
    /// Delay between cosmetic step advances.
    pub stage_advance: Duration,
    /// Delay between the call resolving and the final display.
    pub reconcile: Duration,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            stage_advance: Duration::from_millis(400),
            reconcile: Duration::from_millis(300),
        }
    }
}

pub struct ConversionPipeline {
    transport: Arc<dyn ConversionTransport>,
    timing: PipelineTiming,
    state: watch::Sender<PipelineSnapshot>,
    last_upload: Mutex<Option<Upload>>,
}

impl ConversionPipeline {
    pub fn new(transport: Arc<dyn ConversionTransport>) -> Self {
        Self {
            transport,
            timing: PipelineTiming::default(),
            state: watch::Sender::new(PipelineSnapshot::idle(0)),
            last_upload: Mutex::new(None),
        }
    }

    pub fn with_timing(mut self, timing: PipelineTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.state.borrow().clone()
    }

    /// Run one conversion to completion and return the state it left behind.
    ///
    /// If [`reset`](Self::reset) is called while the call is in flight, the
    /// call still completes but its result is dropped.
    pub async fn submit(&self, upload: Upload) -> PipelineSnapshot {
        *self.last_upload.lock().unwrap_or_else(PoisonError::into_inner) = Some(upload.clone());
        self.run(upload).await
    }

    /// Re-submit the last upload from scratch. `None` if nothing was submitted
    /// since construction or the last reset.
    pub async fn retry(&self) -> Option<PipelineSnapshot> {
        let upload = self
            .last_upload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        info!(file_name = %upload.file_name, "retrying conversion");
        Some(self.run(upload).await)
    }

    /// Clear all state unconditionally, abandoning any in-flight run.
    pub fn reset(&self) {
        self.last_upload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.state.send_modify(|s| *s = PipelineSnapshot::idle(s.generation + 1));
        debug!("pipeline reset");
    }

    async fn run(&self, upload: Upload) -> PipelineSnapshot {
        let generation = self.begin();
        info!(file_name = %upload.file_name, generation, "conversion submitted");

        let call = self.transport.submit(&upload);
        let cosmetic = self.advance_steps(generation);
        tokio::pin!(call, cosmetic);

        // Once the call wins, `cosmetic` is no longer polled; its pending
        // advances are dropped rather than replayed.
        let reply = tokio::select! {
            biased;
            reply = &mut call => reply,
            () = &mut cosmetic => call.await,
        };

        match reply {
            Ok(reply) => {
                tokio::time::sleep(self.timing.reconcile).await;
                let result = match reply {
                    ServerReply::Artifact { bytes, file_name } => {
                        info!(artifact_name = %file_name, size = bytes.len(), "conversion succeeded");
                        ConversionResult::Success {
                            artifact: bytes,
                            artifact_name: file_name,
                        }
                    }
                    ServerReply::Rejected { status, body } => {
                        warn!(status, error = %body.error, "conversion rejected");
                        ConversionResult::Error {
                            message: body.error,
                            detail: body.detail,
                            hint: body.hint,
                        }
                    }
                };
                self.update(generation, |s| {
                    s.steps = [StepStatus::Done; STEP_COUNT];
                    s.result = result;
                });
            }
            Err(e) => {
                warn!(error = %e, "conversion request failed");
                self.update(generation, |s| {
                    if let Some(step) = s.steps.iter_mut().find(|st| **st == StepStatus::Running) {
                        *step = StepStatus::Error;
                    }
                    s.result = ConversionResult::Error {
                        message: e.to_string(),
                        detail: None,
                        hint: None,
                    };
                });
            }
        }

        self.snapshot()
    }

    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = s.generation + 1;
            *s = PipelineSnapshot::idle(generation);
            s.steps[0] = StepStatus::Running;
        });
        generation
    }

    async fn advance_steps(&self, generation: u64) {
        for next in 1..STEP_COUNT {
            tokio::time::sleep(self.timing.stage_advance).await;
            self.update(generation, |s| {
                if s.steps[next - 1] == StepStatus::Running {
                    s.steps[next - 1] = StepStatus::Done;
                    s.steps[next] = StepStatus::Running;
                }
            });
        }
    }

    /// Apply `f` only if `generation` is still current.
    fn update(&self, generation: u64, f: impl FnOnce(&mut PipelineSnapshot)) {
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            let before = s.clone();
            f(s);
            *s != before
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use deckshift_core::ErrorBody;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Instrument;
    use tracing_test::traced_test;
    use StepStatus::{Done, Error, Idle, Running};

    struct ScriptedTransport {
        delay: Duration,
        reply: Result<ServerReply, String>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(delay_ms: u64, reply: Result<ServerReply, String>) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ConversionTransport for ScriptedTransport {
        async fn submit(&self, _upload: &Upload) -> Result<ServerReply, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply
                .clone()
                .map_err(|m| ClientError::Io(std::io::Error::other(m)))
        }
    }

    fn artifact() -> ServerReply {
        ServerReply::Artifact {
            bytes: Bytes::from_static(b"PK"),
            file_name: "deck.pptx".into(),
        }
    }

    fn upload() -> Upload {
        Upload::new("deck.pdf", &b"%PDF-1.7"[..])
    }

    async fn at(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn success_follows_cadence_then_reconciles() {
        let pipeline = Arc::new(ConversionPipeline::new(ScriptedTransport::new(1000, Ok(artifact()))));
        let task = tokio::spawn({
            let p = Arc::clone(&pipeline);
            async move { p.submit(upload()).await }
        });

        at(1).await;
        assert_eq!(pipeline.snapshot().steps, [Running, Idle, Idle]);
        at(400).await; // t=401
        assert_eq!(pipeline.snapshot().steps, [Done, Running, Idle]);
        at(400).await; // t=801
        assert_eq!(pipeline.snapshot().steps, [Done, Done, Running]);
        at(400).await; // t=1201, call resolved at 1000 but reconcile pending
        let s = pipeline.snapshot();
        assert_eq!(s.steps, [Done, Done, Running]);
        assert_eq!(s.result, ConversionResult::Idle);

        let done = task.await.unwrap();
        assert_eq!(done.steps, [Done; STEP_COUNT]);
        assert_eq!(
            done.result,
            ConversionResult::Success {
                artifact: Bytes::from_static(b"PK"),
                artifact_name: "deck.pptx".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn fast_rejection_skips_remaining_cosmetics() {
        let body = ErrorBody {
            error: "missing deps".into(),
            detail: Some("No module named 'fitz'".into()),
            hint: Some("install requirements".into()),
        };
        let transport = ScriptedTransport::new(
            100,
            Ok(ServerReply::Rejected { status: 422, body }),
        );
        let pipeline = Arc::new(ConversionPipeline::new(transport));
        let mut rx = pipeline.subscribe();
        let task = tokio::spawn({
            let p = Arc::clone(&pipeline);
            async move { p.submit(upload()).await }.in_current_span()
        });

        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let s = rx.borrow_and_update().clone();
            let finished = s.result != ConversionResult::Idle;
            seen.push(s.steps);
            if finished {
                break;
            }
        }
        let done = task.await.unwrap();

        assert_eq!(seen.last(), Some(&[Done; STEP_COUNT]));
        assert!(seen.iter().all(|steps| steps[1] != Running && steps[2] != Running));
        match done.result {
            ConversionResult::Error { message, hint, detail } => {
                assert_eq!(message, "missing deps");
                assert_eq!(hint.as_deref(), Some("install requirements"));
                assert!(detail.is_some());
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(logs_contain("conversion rejected"));
        assert!(logs_contain("status=422"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn transport_fault_marks_running_step() {
        let pipeline = Arc::new(ConversionPipeline::new(ScriptedTransport::new(
            500,
            Err("connection reset".into()),
        )));
        let done = pipeline.submit(upload()).await;

        assert_eq!(done.steps, [Done, Error, Idle]);
        match &done.result {
            ConversionResult::Error { message, detail, hint } => {
                assert!(message.contains("connection reset"));
                assert!(detail.is_none() && hint.is_none());
            }
            other => panic!("unexpected result {other:?}"),
        }

        // Nothing fires later.
        at(5_000).await;
        assert_eq!(pipeline.snapshot().steps, [Done, Error, Idle]);
        assert!(logs_contain("conversion request failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_abandons_in_flight_run() {
        let pipeline = Arc::new(ConversionPipeline::new(ScriptedTransport::new(1000, Ok(artifact()))));
        let task = tokio::spawn({
            let p = Arc::clone(&pipeline);
            async move { p.submit(upload()).await }
        });

        at(450).await;
        assert_eq!(pipeline.snapshot().steps, [Done, Running, Idle]);
        pipeline.reset();

        let after = task.await.unwrap();
        assert_eq!(after.steps, [Idle; STEP_COUNT]);
        assert_eq!(after.result, ConversionResult::Idle);
        assert!(pipeline.retry().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_resubmits_same_upload() {
        let transport = ScriptedTransport::new(10, Ok(artifact()));
        let pipeline = ConversionPipeline::new(transport.clone());

        assert!(pipeline.retry().await.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        let first = pipeline.submit(upload()).await;
        let second = pipeline.retry().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.result, second.result);
        assert_eq!(second.generation, first.generation + 1);
    }
}
