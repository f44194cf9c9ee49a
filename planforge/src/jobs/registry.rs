//! In-memory job registry with replay-then-follow subscriptions.

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::stream::EventStream;
use crate::config::PlanforgeConfig;
use crate::core::{JobStatus, PipelineEvent};
use crate::errors::PlanforgeError;
use crate::events::EventSink;
use crate::utils::{generate_job_id, iso_timestamp, now_utc, Timestamp};

/// Default time a job stays registered after creation.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 60);

type Callback = Arc<dyn Fn(&JobEvent) + Send + Sync>;

/// Runs one subscriber callback, containing any panic it raises.
fn deliver(job_id: &str, subscriber: u64, callback: &Callback, record: &JobEvent) {
    let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| callback(record)));
    if delivered.is_err() {
        tracing::warn!(job_id, subscriber, seq = record.seq, "Subscriber panicked while handling event");
    }
}

/// One entry of a job's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// When the event was recorded.
    pub timestamp: String,
    /// The event.
    pub event: PipelineEvent,
}

/// A point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job id.
    pub id: String,
    /// Who requested the run.
    pub owner: String,
    /// The diagram the run belongs to.
    pub diagram_id: String,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Events recorded so far.
    pub event_count: usize,
    /// Live subscribers.
    pub subscriber_count: usize,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last status change or event.
    pub updated_at: Timestamp,
}

struct JobState {
    status: JobStatus,
    events: Vec<JobEvent>,
    subscribers: Vec<(u64, Callback)>,
    next_subscriber: u64,
    updated_at: Timestamp,
}

struct JobEntry {
    id: String,
    owner: String,
    diagram_id: String,
    created_at: Timestamp,
    expires_at: Instant,
    state: Mutex<JobState>,
}

impl fmt::Debug for JobEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobEntry")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("diagram_id", &self.diagram_id)
            .finish_non_exhaustive()
    }
}

impl JobEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn publish(&self, event: PipelineEvent) -> u64 {
        let mut state = self.state.lock();
        self.publish_locked(&mut state, event)
    }

    /// Appends and broadcasts while the caller holds the job lock.
    fn publish_locked(&self, state: &mut JobState, event: PipelineEvent) -> u64 {
        let seq = state.events.len() as u64;
        let record = JobEvent {
            seq,
            timestamp: iso_timestamp(),
            event,
        };

        match record.event {
            PipelineEvent::OrchestrationComplete { .. } if !state.status.is_terminal() => {
                state.status = JobStatus::Completed;
            }
            PipelineEvent::OrchestrationFailed { .. } if !state.status.is_terminal() => {
                state.status = JobStatus::Failed;
            }
            _ => {}
        }
        state.updated_at = now_utc();

        for (subscriber, callback) in &state.subscribers {
            deliver(&self.id, *subscriber, callback, &record);
        }

        tracing::debug!(job_id = %self.id, seq, event_type = record.event.event_type(), "Event recorded");
        state.events.push(record);
        seq
    }

    /// Records a failure unless the run already reached a terminal event.
    fn finish(&self, failure: Option<String>) {
        let mut state = self.state.lock();
        if state.events.iter().any(|record| record.event.is_terminal()) {
            return;
        }

        let error = failure.unwrap_or_else(|| "Pipeline ended without a terminal event".to_string());
        tracing::error!(job_id = %self.id, error = %error, "Job failed");
        self.publish_locked(&mut state, PipelineEvent::run_failed(error));
    }

    fn remove_subscriber(&self, id: u64) {
        self.state.lock().subscribers.retain(|(subscriber, _)| *subscriber != id);
    }

    fn snapshot(&self) -> JobSnapshot {
        let state = self.state.lock();
        JobSnapshot {
            id: self.id.clone(),
            owner: self.owner.clone(),
            diagram_id: self.diagram_id.clone(),
            status: state.status,
            event_count: state.events.len(),
            subscriber_count: state.subscribers.len(),
            created_at: self.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Handle returned by [`JobRegistry::subscribe`].
///
/// Dropping the handle unsubscribes. Unsubscribing never affects the run.
pub struct Subscription {
    entry: Weak<JobEntry>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Stops delivery to this subscriber.
    ///
    /// Returns false if already unsubscribed.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(entry) = self.entry.upgrade() {
            entry.remove_subscriber(self.id);
        }
        true
    }

    /// Returns true until [`unsubscribe`](Self::unsubscribe) is called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// An [`EventSink`] that appends to one job's log.
#[derive(Clone)]
pub struct JobEventSink {
    entry: Arc<JobEntry>,
}

impl JobEventSink {
    /// The job this sink records into.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.entry.id
    }
}

impl fmt::Debug for JobEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobEventSink")
            .field("job_id", &self.entry.id)
            .finish()
    }
}

impl EventSink for JobEventSink {
    fn emit(&self, event: PipelineEvent) {
        self.entry.publish(event);
    }
}

/// Registry of generation jobs keyed by id.
///
/// Jobs are removed a fixed retention window after creation, whether or
/// not they finished or have subscribers. Expired jobs are invisible to
/// lookups even before the sweeper removes them.
#[derive(Debug)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<JobEntry>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl JobRegistry {
    /// Creates a registry with the given retention window.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            retention,
        }
    }

    /// Creates a registry from configuration.
    #[must_use]
    pub fn from_config(config: &PlanforgeConfig) -> Self {
        Self::new(config.job_retention())
    }

    /// The retention window.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        self.retention
    }

    /// Registers a new pending job and returns its id.
    pub fn create_job(&self, owner: impl Into<String>, diagram_id: impl Into<String>) -> String {
        let id = generate_job_id();
        let now = now_utc();
        let entry = JobEntry {
            id: id.clone(),
            owner: owner.into(),
            diagram_id: diagram_id.into(),
            created_at: now,
            expires_at: Instant::now() + self.retention,
            state: Mutex::new(JobState {
                status: JobStatus::Pending,
                events: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
                updated_at: now,
            }),
        };

        tracing::info!(job_id = %id, owner = %entry.owner, diagram_id = %entry.diagram_id, "Job created");
        self.jobs.insert(id.clone(), Arc::new(entry));
        id
    }

    fn entry(&self, job_id: &str) -> Option<Arc<JobEntry>> {
        let entry = Arc::clone(self.jobs.get(job_id)?.value());
        let now = Instant::now();
        if entry.is_expired(now) {
            self.jobs.remove_if(job_id, |_, entry| entry.is_expired(now));
            return None;
        }
        Some(entry)
    }

    /// Returns true if `job_id` is registered and not expired.
    #[must_use]
    pub fn contains(&self, job_id: &str) -> bool {
        self.entry(job_id).is_some()
    }

    /// Current status of a job.
    #[must_use]
    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.entry(job_id).map(|entry| entry.state.lock().status)
    }

    /// Point-in-time view of a job.
    #[must_use]
    pub fn snapshot(&self, job_id: &str) -> Option<JobSnapshot> {
        self.entry(job_id).map(|entry| entry.snapshot())
    }

    /// Copy of a job's event log.
    #[must_use]
    pub fn events(&self, job_id: &str) -> Option<Vec<JobEvent>> {
        self.entry(job_id).map(|entry| entry.state.lock().events.clone())
    }

    /// A sink that records into `job_id`.
    #[must_use]
    pub fn sink(&self, job_id: &str) -> Option<JobEventSink> {
        self.entry(job_id).map(|entry| JobEventSink { entry })
    }

    /// Appends `event` to the job log and broadcasts it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanforgeError::JobNotFound`] for unknown or expired jobs.
    pub fn publish(&self, job_id: &str, event: PipelineEvent) -> Result<u64, PlanforgeError> {
        let entry = self
            .entry(job_id)
            .ok_or_else(|| PlanforgeError::JobNotFound(job_id.to_string()))?;
        Ok(entry.publish(event))
    }

    /// Runs `runner` for the job on a background task.
    ///
    /// Returns immediately. The runner receives a sink bound to the job's
    /// log. If it returns an error or panics without having emitted a
    /// terminal event, an `orchestration_failed` event is recorded for it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanforgeError::JobNotFound`] for unknown jobs and
    /// [`PlanforgeError::JobAlreadyStarted`] if the job is not pending.
    pub fn start<F, Fut>(&self, job_id: &str, runner: F) -> Result<JoinHandle<()>, PlanforgeError>
    where
        F: FnOnce(Arc<dyn EventSink>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let entry = self
            .entry(job_id)
            .ok_or_else(|| PlanforgeError::JobNotFound(job_id.to_string()))?;

        {
            let mut state = entry.state.lock();
            if state.status != JobStatus::Pending {
                return Err(PlanforgeError::JobAlreadyStarted(job_id.to_string()));
            }
            state.status = JobStatus::Running;
            state.updated_at = now_utc();
        }
        tracing::info!(job_id, "Job started");

        let sink: Arc<dyn EventSink> = Arc::new(JobEventSink {
            entry: Arc::clone(&entry),
        });

        Ok(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { runner(sink).await })
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(panic) => Some(format!("Pipeline task panicked: {}", panic_message(&*panic))),
            };
            entry.finish(failure);
        }))
    }

    /// Subscribes to a job's events.
    ///
    /// Every recorded event is passed to `on_event` synchronously, in
    /// order, before this returns; live events follow. Returns `None` for
    /// unknown or expired jobs. `on_event` runs under the job lock and
    /// must not call back into the registry for the same job.
    pub fn subscribe<F>(&self, job_id: &str, on_event: F) -> Option<Subscription>
    where
        F: Fn(&JobEvent) + Send + Sync + 'static,
    {
        let entry = self.entry(job_id)?;
        let callback: Callback = Arc::new(on_event);

        let id = {
            let mut state = entry.state.lock();
            let id = state.next_subscriber;
            for record in &state.events {
                deliver(job_id, id, &callback, record);
            }
            state.next_subscriber += 1;
            state.subscribers.push((id, callback));
            id
        };

        tracing::debug!(job_id, subscriber = id, "Subscriber attached");
        Some(Subscription {
            entry: Arc::downgrade(&entry),
            id,
            active: AtomicBool::new(true),
        })
    }

    /// Streams a job's events with keep-alives after `keepalive` of idleness.
    #[must_use]
    pub fn stream(&self, job_id: &str, keepalive: Duration) -> Option<EventStream> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.subscribe(job_id, move |record| {
            let _ = sender.send(record.clone());
        })?;
        Some(EventStream::new(receiver, subscription, keepalive))
    }

    /// Removes a job immediately.
    pub fn remove(&self, job_id: &str) -> bool {
        self.jobs.remove(job_id).is_some()
    }

    /// Removes every expired job and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .jobs
            .iter()
            .filter(|item| item.value().is_expired(now))
            .map(|item| item.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter(|id| self.jobs.remove_if(id.as_str(), |_, entry| entry.is_expired(now)).is_some())
            .count();

        if removed > 0 {
            tracing::info!(removed, remaining = self.jobs.len(), "Expired jobs swept");
        }
        removed
    }

    /// Spawns a task that sweeps every `period` while the registry lives.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep_expired();
            }
        })
    }

    /// Registered jobs, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if no jobs are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
