// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::{DispatchError, Result};
use crate::job::descriptor::DEFAULT_PRIORITY;
use crate::job::{CommandSpec, JobDescriptor, JobId};
use crate::reconcile::{OutcomeReconciler, SuccessRule};
use crate::types::{ExecutionPolicy, Operation};

/// Name of the registry file inside the state directory.
pub const REGISTRY_FILE_NAME: &str = "surface_registry.json";

/// Job catalogue as read from a TOML file, before validation.
///
/// ```toml
/// [settings]
/// policy = "parallel"
/// auto_close = true
///
/// [job.apt]
/// requires_privilege = true
/// priority = 0
/// commands.check = "sudo apt-get update && apt list --upgradable"
/// commands.upgrade = ["sudo", "apt-get", "upgrade", "-y"]
///
/// [job.npm]
/// commands.check = "npm outdated -g"
///
/// [[job.npm.success]]
/// exit_code = 1
/// operation = "check"
/// requires_output = true
/// ```
///
/// Job order in the file is kept; it is the default request order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: RawSettings,

    #[serde(default)]
    pub job: IndexMap<String, RawJobConfig>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettings {
    #[serde(default)]
    pub policy: ExecutionPolicy,

    #[serde(default)]
    pub auto_close: bool,

    #[serde(default = "default_close_grace_secs")]
    pub close_grace_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on how long a job may stay non-terminal.
    #[serde(default)]
    pub status_timeout_secs: Option<u64>,

    /// Timeout baked into each wrapped command.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,

    #[serde(default = "default_close_prompt_timeout_secs")]
    pub close_prompt_timeout_secs: u64,

    #[serde(default)]
    pub headless: bool,

    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

fn default_close_grace_secs() -> u64 {
    3
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_close_prompt_timeout_secs() -> u64 {
    60
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            policy: ExecutionPolicy::default(),
            auto_close: false,
            close_grace_secs: default_close_grace_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            status_timeout_secs: None,
            job_timeout_secs: None,
            close_prompt_timeout_secs: default_close_prompt_timeout_secs(),
            headless: false,
            state_dir: None,
        }
    }
}

/// `[job.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobConfig {
    #[serde(default)]
    pub requires_privilege: bool,

    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Operation name (`check`, `upgrade`, `install`) to command.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,

    #[serde(default)]
    pub success: Vec<RawSuccessRule>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// `[[job.<id>.success]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuccessRule {
    pub exit_code: i32,

    #[serde(default)]
    pub requires_output: bool,

    #[serde(default)]
    pub output_matches: Option<String>,

    #[serde(default)]
    pub operation: Option<Operation>,
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub policy: ExecutionPolicy,
    pub auto_close: bool,
    pub close_grace: Duration,
    pub poll_interval: Duration,
    pub status_timeout: Option<Duration>,
    pub job_timeout: Option<Duration>,
    pub close_prompt_timeout: Duration,
    pub headless: bool,
    pub state_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&RawSettings::default())
    }
}

impl From<&RawSettings> for Settings {
    fn from(raw: &RawSettings) -> Self {
        Self {
            policy: raw.policy,
            auto_close: raw.auto_close,
            close_grace: Duration::from_secs(raw.close_grace_secs),
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            status_timeout: raw.status_timeout_secs.map(Duration::from_secs),
            job_timeout: raw.job_timeout_secs.map(Duration::from_secs),
            close_prompt_timeout: Duration::from_secs(raw.close_prompt_timeout_secs),
            headless: raw.headless,
            state_dir: raw.state_dir.clone(),
        }
    }
}

impl Settings {
    /// Directory holding scripts, logs, status artifacts and the registry.
    ///
    /// Falls back to `<data dir>/pmdispatch/logs`, or `.pmdispatch/logs` when
    /// the platform has no data directory.
    pub fn resolved_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        match dirs::data_local_dir() {
            Some(base) => base.join("pmdispatch").join("logs"),
            None => PathBuf::from(".pmdispatch").join("logs"),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolved_state_dir().join(REGISTRY_FILE_NAME)
    }
}

/// Validated job entry.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub requires_privilege: bool,
    pub priority: i32,
    pub commands: BTreeMap<Operation, CommandSpec>,
    pub success: Vec<SuccessRule>,
}

/// Validated job catalogue. Construct through `TryFrom<RawConfigFile>` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub settings: Settings,
    jobs: IndexMap<JobId, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(settings: Settings, jobs: IndexMap<JobId, JobConfig>) -> Self {
        Self { settings, jobs }
    }

    pub fn jobs(&self) -> &IndexMap<JobId, JobConfig> {
        &self.jobs
    }

    pub fn job(&self, id: &str) -> Option<&JobConfig> {
        self.jobs.get(id)
    }

    /// Descriptors for `operation`, in request order.
    ///
    /// With an empty `only`, every job defining `operation` is returned in
    /// file order (jobs without it are skipped). Otherwise exactly the named
    /// jobs, in the given order; naming an unknown job or one that doesn't
    /// define `operation` is an error.
    pub fn job_descriptors(&self, operation: Operation, only: &[String]) -> Result<Vec<JobDescriptor>> {
        if only.is_empty() {
            return Ok(self
                .jobs
                .iter()
                .filter_map(|(id, job)| job.descriptor(id, operation))
                .collect());
        }

        let mut descriptors: Vec<JobDescriptor> = Vec::with_capacity(only.len());
        for id in only {
            if descriptors.iter().any(|d| &d.id == id) {
                continue;
            }
            let job = self
                .jobs
                .get(id)
                .ok_or_else(|| DispatchError::JobNotFound(id.clone()))?;
            let descriptor = job.descriptor(id, operation).ok_or_else(|| {
                DispatchError::ConfigError(format!("job '{id}' has no '{operation}' command"))
            })?;
            descriptors.push(descriptor);
        }
        Ok(descriptors)
    }

    /// Reconciler carrying every job's success overrides.
    pub fn reconciler(&self, operation: Operation) -> OutcomeReconciler {
        let mut reconciler = OutcomeReconciler::new(operation);
        for (id, job) in &self.jobs {
            for rule in &job.success {
                reconciler.add_rule(id.clone(), rule.clone());
            }
        }
        reconciler
    }
}

impl JobConfig {
    fn descriptor(&self, id: &str, operation: Operation) -> Option<JobDescriptor> {
        let command = self.commands.get(&operation)?;
        Some(
            JobDescriptor::new(id, command.clone())
                .privileged(self.requires_privilege)
                .with_priority(self.priority),
        )
    }
}
