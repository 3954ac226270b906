// src/sched/scheduler.rs

//! Priority/privilege scheduler.
//!
//! Drives one dispatch: privileged jobs first, one at a time, then the rest
//! according to the [`ExecutionPolicy`]. Jobs are never awaited through a
//! process handle; completion is observed through each job's status
//! artifact.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::job::{JobDescriptor, JobOutcome};
use crate::reconcile::OutcomeReconciler;
use crate::sched::plan::ExecutionPlan;
use crate::sched::state::{DispatchTrace, JobState, JobTracker};
use crate::surface::{ExecutionHandle, SpawnOutcome, SurfaceProvider, surface_label};
use crate::track::poller::timed_out;
use crate::track::{CommandWrapper, JobRegistry, RegistryEntry, StatusPoller, StatusRecord, StatusState};
use crate::types::{ExecutionPolicy, Operation};

/// Attempts made to record a spawned job when the registry is busy.
pub const REGISTRY_ATTEMPTS: u32 = 3;
const REGISTRY_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub policy: ExecutionPolicy,
    pub auto_close: bool,
    /// Give up on a job whose status artifact stays non-terminal this long.
    /// `None` waits forever.
    pub status_timeout: Option<Duration>,
    pub operation: Operation,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            policy: ExecutionPolicy::default(),
            auto_close: false,
            status_timeout: None,
            operation: Operation::Upgrade,
        }
    }
}

pub struct Scheduler<P: SurfaceProvider> {
    provider: P,
    fs: Arc<dyn FileSystem>,
    wrapper: CommandWrapper,
    registry: JobRegistry,
    poller: StatusPoller,
    reconciler: OutcomeReconciler,
    options: SchedulerOptions,
    trace: DispatchTrace,
}

impl<P: SurfaceProvider> Scheduler<P> {
    pub fn new(
        provider: P,
        fs: Arc<dyn FileSystem>,
        wrapper: CommandWrapper,
        registry: JobRegistry,
        poller: StatusPoller,
        reconciler: OutcomeReconciler,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            provider,
            fs,
            wrapper,
            registry,
            poller,
            reconciler,
            options,
            trace: DispatchTrace::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Transitions recorded by the most recent [`dispatch`](Self::dispatch).
    pub fn trace(&self) -> &DispatchTrace {
        &self.trace
    }

    /// Run every job and return one outcome per job, in request order.
    ///
    /// Individual job failures (spawn failure, non-zero exit, malformed or
    /// missing status) become failed outcomes; this never errors.
    pub async fn dispatch(&mut self, jobs: &[JobDescriptor]) -> Vec<JobOutcome> {
        let plan = ExecutionPlan::from_jobs(jobs);
        let mut tracker = JobTracker::new(jobs.iter().map(|j| j.id.clone()).collect());
        let mut outcomes: Vec<Option<JobOutcome>> = vec![None; jobs.len()];

        info!(
            operation = %self.options.operation,
            surface = %self.provider.kind(),
            privileged = plan.privileged.len(),
            unprivileged = plan.unprivileged.len(),
            policy = ?self.options.policy,
            "dispatching jobs"
        );

        for &index in &plan.privileged {
            outcomes[index] = Some(self.run_to_completion(index, &jobs[index], &mut tracker).await);
        }

        match self.options.policy {
            ExecutionPolicy::Sequential => {
                for &index in &plan.unprivileged {
                    outcomes[index] = Some(self.run_to_completion(index, &jobs[index], &mut tracker).await);
                }
            }
            ExecutionPolicy::Parallel => {
                self.run_parallel(&plan.unprivileged, jobs, &mut tracker, &mut outcomes)
                    .await;
            }
        }

        self.trace = tracker.into_trace();

        outcomes
            .into_iter()
            .zip(jobs)
            .map(|(outcome, job)| {
                outcome.unwrap_or_else(|| JobOutcome::failed(job.id.clone(), String::new(), "job was never dispatched"))
            })
            .collect()
    }

    /// Spawn one job and wait for its status artifact before returning.
    async fn run_to_completion(&self, index: usize, job: &JobDescriptor, tracker: &mut JobTracker) -> JobOutcome {
        let handle = match self.spawn_job(index, job, tracker).await {
            Ok(handle) => handle,
            Err(outcome) => return outcome,
        };

        tracker.advance(index, JobState::Polling);
        let record = self
            .poller
            .poll_until_terminal(&handle.tracked.status_path, self.options.status_timeout)
            .await;
        self.finish(index, job, &handle, record, tracker)
    }

    /// Spawn every job up-front, then poll them round-robin until all are
    /// terminal. Completion order is whatever the jobs dictate.
    async fn run_parallel(
        &self,
        indices: &[usize],
        jobs: &[JobDescriptor],
        tracker: &mut JobTracker,
        outcomes: &mut [Option<JobOutcome>],
    ) {
        let mut outstanding: Vec<(usize, ExecutionHandle)> = Vec::with_capacity(indices.len());
        for &index in indices {
            match self.spawn_job(index, &jobs[index], tracker).await {
                Ok(handle) => {
                    tracker.advance(index, JobState::Polling);
                    outstanding.push((index, handle));
                }
                Err(outcome) => outcomes[index] = Some(outcome),
            }
        }

        while !outstanding.is_empty() {
            let mut pending = Vec::with_capacity(outstanding.len());
            for (index, handle) in outstanding {
                let record = self.poller.check(&handle.tracked.status_path);
                if record.is_terminal() {
                    outcomes[index] = Some(self.finish(index, &jobs[index], &handle, record, tracker));
                    continue;
                }

                match self.options.status_timeout {
                    Some(bound) if handle.spawned_at.elapsed() >= bound => {
                        warn!(job = %jobs[index].id, bound_secs = bound.as_secs_f64(), "no terminal status before timeout");
                        outcomes[index] = Some(self.finish(index, &jobs[index], &handle, timed_out(bound), tracker));
                    }
                    _ => pending.push((index, handle)),
                }
            }

            outstanding = pending;
            if !outstanding.is_empty() {
                debug!(outstanding = outstanding.len(), "waiting for jobs to finish");
                tokio::time::sleep(self.poller.interval()).await;
            }
        }
    }

    /// Wrap and spawn one job. A spawn failure comes back as the job's final
    /// (failed) outcome.
    async fn spawn_job(
        &self,
        index: usize,
        job: &JobDescriptor,
        tracker: &mut JobTracker,
    ) -> std::result::Result<ExecutionHandle, JobOutcome> {
        tracker.advance(index, JobState::Spawning);

        let operation_name = format!("{} {}", job.id, self.options.operation);
        let tracked = match self.wrapper.wrap(
            &job.command.to_shell(),
            &operation_name,
            self.options.auto_close,
            self.provider.script_style(),
        ) {
            Ok(tracked) => tracked,
            Err(e) => {
                warn!(job = %job.id, error = %e, "could not prepare tracked command");
                tracker.advance(index, JobState::Done { success: false });
                return Err(JobOutcome::failed(
                    job.id.clone(),
                    String::new(),
                    format!("failed to prepare command: {e}"),
                ));
            }
        };

        let label = surface_label(&tracked.token, tracked.stamp);
        info!(job = %job.id, label = %label, privileged = job.requires_privilege, "spawning job");
        let surface = self.provider.spawn(&tracked, &label).await;

        if let SpawnOutcome::Failed(reason) = &surface.outcome {
            warn!(job = %job.id, reason = %reason, "spawn failed");
            tracker.advance(index, JobState::Done { success: false });
            return Err(JobOutcome::failed(job.id.clone(), String::new(), reason.clone()));
        }
        tracker.advance(index, JobState::Spawned);

        let handle = ExecutionHandle {
            label,
            tracked,
            surface,
            spawned_at: Instant::now(),
        };
        self.record(job, &handle).await;
        Ok(handle)
    }

    /// Append the job to the registry. Failures are logged, never fatal.
    async fn record(&self, job: &JobDescriptor, handle: &ExecutionHandle) {
        let entry = RegistryEntry {
            job_id: job.id.clone(),
            label: handle.label.clone(),
            surface: handle.surface.kind,
            surface_id: handle.surface.surface_id.clone(),
            pid: handle.surface.pid,
            log_path: handle.tracked.log_path.clone(),
            status_path: handle.tracked.status_path.clone(),
            spawned_at: Utc::now(),
        };

        for attempt in 1..=REGISTRY_ATTEMPTS {
            match self.registry.append(entry.clone()) {
                Ok(()) => return,
                Err(e) if e.is_busy() && attempt < REGISTRY_ATTEMPTS => {
                    debug!(job = %job.id, attempt, "registry busy; retrying");
                    tokio::time::sleep(REGISTRY_BACKOFF * attempt).await;
                }
                Err(e) => {
                    warn!(job = %job.id, error = %e, "failed to record job in registry");
                    return;
                }
            }
        }
    }

    /// Turn a terminal status record into the job's outcome.
    fn finish(
        &self,
        index: usize,
        job: &JobDescriptor,
        handle: &ExecutionHandle,
        record: StatusRecord,
        tracker: &mut JobTracker,
    ) -> JobOutcome {
        let output = match self.fs.read_optional(&handle.tracked.log_path) {
            Ok(contents) => contents.unwrap_or_default(),
            Err(e) => {
                warn!(job = %job.id, error = %e, "could not read job log");
                String::new()
            }
        };

        let outcome = match (record.state, record.exit_code) {
            (StatusState::Completed, Some(code)) => {
                if self.reconciler.reconcile(&job.id, code, &output) {
                    JobOutcome::succeeded(job.id.clone(), output)
                } else {
                    JobOutcome::failed(job.id.clone(), output, format!("exited with code {code}"))
                }
            }
            (StatusState::Completed, None) => {
                JobOutcome::failed(job.id.clone(), output, "status artifact has no exit code")
            }
            (StatusState::Errored, _) => {
                let detail = record
                    .error_detail
                    .unwrap_or_else(|| "job reported an error".to_string());
                JobOutcome::failed(job.id.clone(), output, detail)
            }
            (StatusState::Running, _) => JobOutcome::failed(job.id.clone(), output, "job did not finish"),
        };

        if outcome.success {
            info!(job = %job.id, "job succeeded");
        } else {
            warn!(job = %job.id, error = %outcome.error, "job failed");
        }
        tracker.advance(index, JobState::Done { success: outcome.success });
        outcome
    }
}
