use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pmdispatch::fs::mock::MockFileSystem;
use pmdispatch::surface::{SpawnedSurface, SurfaceFuture, SurfaceProvider};
use pmdispatch::track::wrapper::sanitize_operation;
use pmdispatch::track::{RegistryEntry, ScriptStyle, StatusRecord, TrackedCommand};
use pmdispatch::types::SurfaceKind;
use tokio::time::Instant;

/// What a fake job does once "spawned".
#[derive(Debug, Clone)]
pub struct FakeBehaviour {
    pub exit_code: i32,
    pub output: String,
    /// Time between spawn and the status artifact appearing.
    pub delay: Duration,
    /// `false` simulates a job that never reports.
    pub write_status: bool,
    /// Write garbage instead of a status record.
    pub malformed: bool,
    /// Refuse to spawn with this reason.
    pub fail_spawn: Option<String>,
}

impl Default for FakeBehaviour {
    fn default() -> Self {
        Self {
            exit_code: 0,
            output: String::new(),
            delay: Duration::ZERO,
            write_status: true,
            malformed: false,
            fail_spawn: None,
        }
    }
}

impl FakeBehaviour {
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn never_finishes(mut self) -> Self {
        self.write_status = false;
        self
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }

    pub fn fail_spawn(mut self, reason: &str) -> Self {
        self.fail_spawn = Some(reason.to_string());
        self
    }
}

/// One call to `spawn`.
#[derive(Debug, Clone)]
pub struct SpawnRecord {
    pub job_id: String,
    pub label: String,
    pub at: Instant,
}

/// A fake surface provider that:
/// - records which jobs were spawned, and when
/// - writes each job's log and status artifact into a [`MockFileSystem`],
///   immediately or after the job's configured delay.
///
/// Jobs are recognised by the wrapped command's token, which starts with the
/// sanitized job id.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    fs: MockFileSystem,
    behaviours: HashMap<String, FakeBehaviour>,
    spawned: Arc<Mutex<Vec<SpawnRecord>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

impl FakeProvider {
    pub fn new(fs: MockFileSystem) -> Self {
        Self {
            fs,
            behaviours: HashMap::new(),
            spawned: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_job(mut self, job_id: &str, behaviour: FakeBehaviour) -> Self {
        self.behaviours.insert(job_id.to_string(), behaviour);
        self
    }

    /// Handle to the spawn log, usable after the provider moved into a
    /// scheduler.
    pub fn spawn_log(&self) -> Arc<Mutex<Vec<SpawnRecord>>> {
        Arc::clone(&self.spawned)
    }

    pub fn spawned_ids(&self) -> Vec<String> {
        self.spawned.lock().unwrap().iter().map(|r| r.job_id.clone()).collect()
    }

    pub fn closed_labels(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    /// Longest configured job id whose sanitized form prefixes `token`.
    fn job_for_token(&self, token: &str) -> Option<&String> {
        self.behaviours
            .keys()
            .filter(|id| {
                let prefix = format!("{}-", sanitize_operation(id));
                token.starts_with(&prefix)
            })
            .max_by_key(|id| id.len())
    }
}

fn write_artifacts(fs: &MockFileSystem, tracked: &TrackedCommand, behaviour: &FakeBehaviour) {
    fs.add_file(&tracked.log_path, behaviour.output.clone());
    if behaviour.malformed {
        fs.add_file(&tracked.status_path, "{\"status\": ");
    } else if behaviour.write_status {
        fs.add_file(
            &tracked.status_path,
            StatusRecord::completed(behaviour.exit_code).to_json(),
        );
    }
}

impl SurfaceProvider for FakeProvider {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Headless
    }

    fn script_style(&self) -> ScriptStyle {
        ScriptStyle::HEADLESS
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn spawn<'a>(
        &'a self,
        tracked: &'a TrackedCommand,
        label: &'a str,
    ) -> SurfaceFuture<'a, SpawnedSurface> {
        let job_id = self
            .job_for_token(&tracked.token)
            .cloned()
            .unwrap_or_else(|| tracked.token.clone());
        let behaviour = self.behaviours.get(&job_id).cloned().unwrap_or_default();

        self.spawned.lock().unwrap().push(SpawnRecord {
            job_id,
            label: label.to_string(),
            at: Instant::now(),
        });

        let fs = self.fs.clone();
        let tracked = tracked.clone();
        let label = label.to_string();

        Box::pin(async move {
            if let Some(reason) = &behaviour.fail_spawn {
                return SpawnedSurface::failed(SurfaceKind::Headless, reason.clone());
            }

            if behaviour.delay.is_zero() {
                write_artifacts(&fs, &tracked, &behaviour);
            } else {
                tokio::spawn(async move {
                    tokio::time::sleep(behaviour.delay).await;
                    write_artifacts(&fs, &tracked, &behaviour);
                });
            }

            SpawnedSurface::spawned(SurfaceKind::Headless, Some(label), None)
        })
    }

    fn close<'a>(&'a self, entry: &'a RegistryEntry) -> SurfaceFuture<'a, bool> {
        self.closed.lock().unwrap().push(entry.label.clone());
        Box::pin(async { true })
    }
}
