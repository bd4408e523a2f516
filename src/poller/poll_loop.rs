//! Acquisition task and its owner.
//!
//! Each acquisition runs as one tokio task that owns the state machine:
//! it issues a fetch, reports the outcome, and on `Pending` sleeps for the
//! retry interval before fetching again. There is never more than one
//! fetch or one scheduled retry per task. Cancelling raises the
//! acquisition's cancel flag before aborting the task: the task publishes
//! nothing once the flag is up and subscriptions end even with events still
//! queued.

use crate::api::EvaluationSource;
use crate::poller::state::{on_fetch_result, AcquisitionEvent, PollState, Transition};
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay between a `Pending` result and the next fetch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Events buffered per subscriber before it starts lagging.
const EVENT_BUFFER: usize = 32;

struct ActiveAcquisition {
    run_id: String,
    events: broadcast::Sender<AcquisitionEvent>,
    state: watch::Receiver<PollState>,
    cancelled: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ActiveAcquisition {
    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe(), self.cancelled.subscribe())
    }

    fn is_running(&self) -> bool {
        !self.state.borrow().is_terminal() && !self.task.is_finished()
    }
}

/// Polls the evaluation backend for one run at a time.
///
/// Dropping the poller cancels whatever it is acquiring.
pub struct ResultPoller {
    source: Arc<dyn EvaluationSource>,
    interval: Duration,
    active: Option<ActiveAcquisition>,
}

impl ResultPoller {
    pub fn new(source: Arc<dyn EvaluationSource>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            active: None,
        }
    }

    pub fn with_default_interval(source: Arc<dyn EvaluationSource>) -> Self {
        Self::new(source, DEFAULT_POLL_INTERVAL)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run id of the acquisition currently in progress.
    pub fn active_run(&self) -> Option<&str> {
        self.active
            .as_ref()
            .filter(|a| a.is_running())
            .map(|a| a.run_id.as_str())
    }

    /// State of the current acquisition, `Idle` when there is none.
    pub fn state(&self) -> PollState {
        self.active
            .as_ref()
            .map(|a| *a.state.borrow())
            .unwrap_or(PollState::Idle)
    }

    /// Start acquiring `run_id` and subscribe to its events.
    ///
    /// If the same run is still being acquired, the caller joins it instead
    /// of starting a second fetch loop. Acquiring a different run cancels
    /// the current one. A run that already reached a terminal event is
    /// acquired again from scratch.
    pub fn acquire(&mut self, run_id: &str) -> Subscription {
        if let Some(active) = &self.active {
            if active.run_id == run_id {
                // The task publishes a terminal state before the terminal
                // event, so subscribe first and check second.
                let subscription = active.subscribe();
                if active.is_running() {
                    debug!("Joining in-flight acquisition of run {}", run_id);
                    return subscription;
                }
            }
        }

        self.cancel();

        let (events, receiver) = broadcast::channel(EVENT_BUFFER);
        let (state_tx, state) = watch::channel(PollState::Idle);
        let (cancelled, cancel_rx) = watch::channel(false);
        let subscription = Subscription::new(receiver, cancelled.subscribe());
        let task = tokio::spawn(run_acquisition(
            Arc::clone(&self.source),
            run_id.to_string(),
            self.interval,
            Publisher {
                events: events.clone(),
                state: state_tx,
                cancelled: cancel_rx,
            },
        ));

        info!("Acquiring evaluation for run {}", run_id);
        self.active = Some(ActiveAcquisition {
            run_id: run_id.to_string(),
            events,
            state,
            cancelled,
            task,
        });

        subscription
    }

    /// Stop the current acquisition. No further fetch is issued and no
    /// further event is delivered. Calling this again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            if active.is_running() {
                info!("Cancelling acquisition of run {}", active.run_id);
            }
            active.cancelled.send_replace(true);
            active.task.abort();
        }
    }
}

impl Drop for ResultPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Task-side handle for reporting progress.
struct Publisher {
    events: broadcast::Sender<AcquisitionEvent>,
    state: watch::Sender<PollState>,
    cancelled: watch::Receiver<bool>,
}

impl Publisher {
    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    fn publish(&self, run_id: &str, event: AcquisitionEvent) {
        if self.is_cancelled() {
            debug!("Run {} cancelled, dropping {} event", run_id, event.state());
            return;
        }
        let to = event.state();
        let from = self.state.send_replace(to);
        debug!("Run {}: {} -> {}", run_id, from, to);
        if self.events.send(event).is_err() {
            debug!("No subscribers left for run {}", run_id);
        }
    }
}

async fn run_acquisition(
    source: Arc<dyn EvaluationSource>,
    run_id: String,
    interval: Duration,
    publisher: Publisher,
) {
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        publisher.publish(&run_id, AcquisitionEvent::Loading);

        let result = source.fetch_evaluation(&run_id).await;
        if publisher.is_cancelled() {
            return;
        }

        match on_fetch_result(result) {
            Transition::Ready(evaluation) => {
                info!(
                    "Evaluation for run {} ready after {} attempt(s)",
                    run_id, attempt
                );
                publisher.publish(&run_id, AcquisitionEvent::Ready(Arc::new(evaluation)));
                return;
            }
            Transition::Retry => {
                publisher.publish(&run_id, AcquisitionEvent::Pending);
                debug!("Run {} still in progress, retrying in {:?}", run_id, interval);
                tokio::time::sleep(interval).await;
            }
            Transition::Stop(error) => {
                warn!("Acquisition of run {} failed: {}", run_id, error);
                publisher.publish(&run_id, AcquisitionEvent::Failed(error));
                return;
            }
        }
    }
}

/// Receiving end of an acquisition.
pub struct Subscription {
    receiver: broadcast::Receiver<AcquisitionEvent>,
    cancelled: watch::Receiver<bool>,
    finished: bool,
}

impl Subscription {
    fn new(
        receiver: broadcast::Receiver<AcquisitionEvent>,
        cancelled: watch::Receiver<bool>,
    ) -> Self {
        Self {
            receiver,
            cancelled,
            finished: false,
        }
    }

    /// Next event, or `None` once a terminal event has been delivered or the
    /// acquisition was cancelled.
    pub async fn next(&mut self) -> Option<AcquisitionEvent> {
        if self.finished {
            return None;
        }

        loop {
            // A closed cancel channel means the poller is gone as well.
            let received = tokio::select! {
                biased;
                _ = self.cancelled.wait_for(|cancelled| *cancelled) => None,
                received = self.receiver.recv() => Some(received),
            };
            let Some(received) = received else {
                self.finished = true;
                return None;
            };

            match received {
                Ok(event) => {
                    self.finished = event.is_terminal();
                    return Some(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Adapt the subscription into a [`Stream`] of events.
    pub fn into_stream(self) -> impl Stream<Item = AcquisitionEvent> {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|event| (event, subscription))
        })
    }
}
