//! The polling loop behind the monitor view.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::render::RunRenderer;
use super::state::{ErrorPanel, MonitorView, RunSnapshot};
use crate::cancellation::CancellationToken;
use crate::config::FabricatorConfig;
use crate::core::{RunId, WorkflowRun};
use crate::github::{ActionsTransport, WorkflowClient};

/// How a monitor session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The run reached `completed`.
    Completed(WorkflowRun),
    /// A run or artifact fetch failed.
    Errored(String),
    /// The handle was torn down first.
    TornDown,
}

impl MonitorOutcome {
    /// The finished run, if the session ended on completion.
    #[must_use]
    pub fn run(&self) -> Option<&WorkflowRun> {
        match self {
            Self::Completed(run) => Some(run),
            _ => None,
        }
    }
}

/// Polls one run until it completes, a fetch fails, or it is torn down.
pub struct RunMonitor<T: ActionsTransport + 'static> {
    client: Arc<WorkflowClient<T>>,
    renderer: Arc<dyn RunRenderer>,
    interval: Duration,
}

impl<T: ActionsTransport + 'static> RunMonitor<T> {
    /// Creates a monitor polling at the configured interval.
    #[must_use]
    pub fn new(
        client: Arc<WorkflowClient<T>>,
        renderer: Arc<dyn RunRenderer>,
        config: &FabricatorConfig,
    ) -> Self {
        Self {
            client,
            renderer,
            interval: config.poll_interval(),
        }
    }

    /// Starts polling `run_id` on a new task. The first fetch happens
    /// immediately.
    pub fn spawn(self, run_id: RunId) -> MonitorHandle {
        let token = Arc::new(CancellationToken::new());
        let task = tokio::spawn(self.run(run_id, Arc::clone(&token)));
        MonitorHandle {
            run_id,
            token,
            task: Some(task),
        }
    }

    async fn run(self, run_id: RunId, token: Arc<CancellationToken>) -> MonitorOutcome {
        info!(run_id = %run_id, interval_ms = self.interval.as_millis(), "Monitoring run");
        let mut ticker = tokio::time::interval(self.interval);
        // A fetch slower than the interval swallows the ticks it overlaps.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => return self.torn_down(run_id, &token),
                _ = ticker.tick() => {}
            }

            let view = tokio::select! {
                biased;
                () = token.cancelled() => return self.torn_down(run_id, &token),
                view = self.poll_once(run_id) => view,
            };
            self.renderer.render(&view);

            match view {
                MonitorView::Polling { .. } => continue,
                MonitorView::Complete { snapshot, .. } => {
                    info!(
                        run_id = %run_id,
                        conclusion = %snapshot.run.display_state(),
                        artifacts = snapshot.artifacts.len(),
                        "Run completed"
                    );
                    token.cancel("completed");
                    return MonitorOutcome::Completed(snapshot.run);
                }
                MonitorView::Errored { panel } => {
                    warn!(run_id = %run_id, error = %panel.message, "Monitoring stopped");
                    token.cancel("errored");
                    return MonitorOutcome::Errored(panel.message);
                }
            }
        }
    }

    /// Fetches run, logs and artifacts, in that order.
    ///
    /// Log failures degrade into the placeholder; run and artifact failures
    /// produce [`MonitorView::Errored`].
    pub async fn poll_once(&self, run_id: RunId) -> MonitorView {
        let run = match self.client.get_run(run_id).await {
            Ok(run) => run,
            Err(err) => return errored(run_id, &err),
        };
        let logs = self.client.fetch_logs(run_id).await;
        let artifacts = match self.client.get_artifacts(run_id).await {
            Ok(artifacts) => artifacts,
            Err(err) => return errored(run_id, &err),
        };
        debug!(
            run_id = %run_id,
            status = %run.status,
            jobs_unavailable = logs.is_unavailable(),
            artifacts = artifacts.len(),
            "Polled run"
        );
        MonitorView::from_snapshot(RunSnapshot {
            run_id,
            run,
            logs,
            artifacts,
        })
    }

    fn torn_down(&self, run_id: RunId, token: &CancellationToken) -> MonitorOutcome {
        debug!(run_id = %run_id, reason = ?token.reason(), "Monitor torn down");
        MonitorOutcome::TornDown
    }
}

fn errored(run_id: RunId, err: &crate::errors::FabricatorError) -> MonitorView {
    MonitorView::Errored {
        panel: ErrorPanel::new(run_id, err.to_string()),
    }
}

/// Owner of a running monitor. Dropping it tears the monitor down.
#[derive(Debug)]
pub struct MonitorHandle {
    run_id: RunId,
    token: Arc<CancellationToken>,
    task: Option<JoinHandle<MonitorOutcome>>,
}

impl MonitorHandle {
    /// The monitored run.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Stops polling. Safe to call any number of times; an in-flight fetch is
    /// abandoned and its result never rendered.
    pub fn teardown(&self) {
        self.token.cancel("teardown");
    }

    /// Whether the polling task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the session to end.
    pub async fn finished(mut self) -> MonitorOutcome {
        let Some(task) = self.task.take() else {
            return MonitorOutcome::TornDown;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(err) => MonitorOutcome::Errored(format!("monitor task failed: {err}")),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.token.cancel("handle dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunConclusion;
    use crate::errors::RemoteApiError;
    use crate::testing::{completed_run, in_progress_run, MockTransport, RecordingRenderer};

    fn monitor(
        transport: &Arc<MockTransport>,
        renderer: &Arc<RecordingRenderer>,
    ) -> RunMonitor<MockTransport> {
        let config = FabricatorConfig::default();
        let client = Arc::new(WorkflowClient::new(Arc::clone(transport), &config));
        RunMonitor::new(client, Arc::clone(renderer) as Arc<dyn RunRenderer>, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_exactly_once_on_completion() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([
            in_progress_run(10),
            in_progress_run(10),
            in_progress_run(10),
            completed_run(10, RunConclusion::Success),
        ]));
        let renderer = Arc::new(RecordingRenderer::new());

        let outcome = monitor(&transport, &renderer).spawn(RunId(10)).finished().await;

        assert_eq!(outcome, MonitorOutcome::Completed(completed_run(10, RunConclusion::Success)));
        let views = renderer.views();
        assert_eq!(views.len(), 4);
        assert!(views[..3].iter().all(|v| matches!(v, MonitorView::Polling { .. })));
        assert!(matches!(views[3], MonitorView::Complete { .. }));
        assert_eq!(transport.call_count("get_run"), 4);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.call_count("get_run"), 4);
        assert_eq!(renderer.render_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([
            in_progress_run(3),
            completed_run(3, RunConclusion::Failure),
        ]));
        let renderer = Arc::new(RecordingRenderer::new());
        let started = tokio::time::Instant::now();

        monitor(&transport, &renderer).spawn(RunId(3)).finished().await;

        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_ends_in_errored_view() {
        let transport = Arc::new(MockTransport::new());
        transport.push_run(in_progress_run(5));
        transport.push_run_error(RemoteApiError::new(401, "Bad credentials"));
        let renderer = Arc::new(RecordingRenderer::new());

        let outcome = monitor(&transport, &renderer).spawn(RunId(5)).finished().await;

        assert!(matches!(outcome, MonitorOutcome::Errored(ref msg) if msg.contains("Bad credentials")));
        assert_eq!(renderer.render_count(), 2);
        assert!(matches!(renderer.views()[1], MonitorView::Errored { .. }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.call_count("get_run"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_artifact_error_ends_in_errored_view() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([in_progress_run(6)]));
        transport.fail_artifacts(RemoteApiError::new(403, "Forbidden"));
        let renderer = Arc::new(RecordingRenderer::new());

        let outcome = monitor(&transport, &renderer).spawn(RunId(6)).finished().await;

        assert!(matches!(outcome, MonitorOutcome::Errored(_)));
        assert_eq!(transport.call_count("get_run"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_errors_do_not_stop_polling() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([
            in_progress_run(7),
            in_progress_run(7),
            completed_run(7, RunConclusion::Success),
        ]));
        transport.fail_jobs(RemoteApiError::new(502, "Bad Gateway"));
        let renderer = Arc::new(RecordingRenderer::new());

        let outcome = monitor(&transport, &renderer).spawn(RunId(7)).finished().await;

        assert!(outcome.run().is_some());
        let views = renderer.views();
        assert_eq!(views.len(), 3);
        assert!(views
            .iter()
            .filter_map(MonitorView::snapshot)
            .all(|s| s.logs.is_unavailable()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([
            in_progress_run(8),
            in_progress_run(8),
            completed_run(8, RunConclusion::Success),
        ]));
        transport.set_latency(Duration::from_secs(7));
        let renderer = Arc::new(RecordingRenderer::new());

        let outcome = monitor(&transport, &renderer).spawn(RunId(8)).finished().await;

        assert!(outcome.run().is_some());
        assert_eq!(transport.call_count("get_run"), 3);
        assert_eq!(transport.max_in_flight(), 1);
        assert_eq!(renderer.render_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_polling() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([in_progress_run(9)]));
        let renderer = Arc::new(RecordingRenderer::new());
        let handle = monitor(&transport, &renderer).spawn(RunId(9));

        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.teardown();
        handle.teardown();
        let polls = transport.call_count("get_run");
        assert!(polls >= 1);

        assert_eq!(handle.finished().await, MonitorOutcome::TornDown);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.call_count("get_run"), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_fetch_skips_render() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([in_progress_run(12)]));
        transport.set_latency(Duration::from_secs(5));
        let renderer = Arc::new(RecordingRenderer::new());
        let handle = monitor(&transport, &renderer).spawn(RunId(12));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.call_count("get_run"), 1);
        handle.teardown();

        assert_eq!(handle.finished().await, MonitorOutcome::TornDown);
        assert_eq!(renderer.render_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down() {
        let transport = Arc::new(MockTransport::new().with_run_sequence([in_progress_run(13)]));
        let renderer = Arc::new(RecordingRenderer::new());
        let handle = monitor(&transport, &renderer).spawn(RunId(13));

        tokio::time::sleep(Duration::from_secs(4)).await;
        drop(handle);
        tokio::task::yield_now().await;
        let polls = transport.call_count("get_run");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.call_count("get_run"), polls);
    }
}
