#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use pmdispatch::config::model::{RawJobConfig, RawSettings, RawSuccessRule};
use pmdispatch::config::{ConfigFile, RawConfigFile};
use pmdispatch::fs::FileSystem;
use pmdispatch::fs::mock::MockFileSystem;
use pmdispatch::job::{CommandSpec, JobDescriptor};
use pmdispatch::reconcile::OutcomeReconciler;
use pmdispatch::sched::{Scheduler, SchedulerOptions};
use pmdispatch::surface::SurfaceProvider;
use pmdispatch::track::{CommandWrapper, JobRegistry, StatusPoller, WrapperOptions};
use pmdispatch::types::{ExecutionPolicy, Operation};

/// Unprivileged job with default priority.
pub fn job(id: &str) -> JobDescriptor {
    JobDescriptor::new(id, format!("echo {id}").as_str())
}

/// Privileged job with the given priority.
pub fn privileged_job(id: &str, priority: i32) -> JobDescriptor {
    job(id).privileged(true).with_priority(priority)
}

/// Builder wiring a `Scheduler` to a `MockFileSystem`.
pub struct SchedulerBuilder {
    fs: MockFileSystem,
    state_dir: PathBuf,
    poll_interval: Duration,
    options: SchedulerOptions,
    reconciler: Option<OutcomeReconciler>,
}

impl SchedulerBuilder {
    pub fn new(fs: MockFileSystem) -> Self {
        Self {
            fs,
            state_dir: PathBuf::from("/state"),
            poll_interval: Duration::from_millis(5),
            options: SchedulerOptions::default(),
            reconciler: None,
        }
    }

    pub fn policy(mut self, policy: ExecutionPolicy) -> Self {
        self.options.policy = policy;
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.options.operation = operation;
        self
    }

    pub fn status_timeout(mut self, bound: Duration) -> Self {
        self.options.status_timeout = Some(bound);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn reconciler(mut self, reconciler: OutcomeReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub fn registry_path(&self) -> PathBuf {
        self.state_dir.join("registry.json")
    }

    pub fn build<P: SurfaceProvider>(self, provider: P) -> Scheduler<P> {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let registry = JobRegistry::new(fs.clone(), self.registry_path());
        let wrapper = CommandWrapper::new(fs.clone(), &self.state_dir, WrapperOptions::default());
        let poller = StatusPoller::new(fs.clone(), self.poll_interval);
        let reconciler = self
            .reconciler
            .unwrap_or_else(|| OutcomeReconciler::new(self.options.operation));
        Scheduler::new(provider, fs, wrapper, registry, poller, reconciler, self.options)
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                settings: RawSettings::default(),
                job: IndexMap::new(),
            },
        }
    }

    pub fn with_job(mut self, id: &str, job: RawJobConfig) -> Self {
        self.config.job.insert(id.to_string(), job);
        self
    }

    pub fn with_settings(mut self, settings: RawSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawJobConfig`.
pub struct JobConfigBuilder {
    job: RawJobConfig,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        Self {
            job: RawJobConfig {
                requires_privilege: false,
                priority: pmdispatch::job::descriptor::DEFAULT_PRIORITY,
                commands: BTreeMap::new(),
                success: vec![],
            },
        }
    }

    pub fn command(mut self, operation: &str, cmd: &str) -> Self {
        self.job
            .commands
            .insert(operation.to_string(), CommandSpec::Shell(cmd.to_string()));
        self
    }

    pub fn argv(mut self, operation: &str, argv: &[&str]) -> Self {
        self.job.commands.insert(
            operation.to_string(),
            CommandSpec::Argv(argv.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    pub fn privileged(mut self) -> Self {
        self.job.requires_privilege = true;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn success(mut self, exit_code: i32, requires_output: bool, output_matches: Option<&str>) -> Self {
        self.job.success.push(RawSuccessRule {
            exit_code,
            requires_output,
            output_matches: output_matches.map(|s| s.to_string()),
            operation: None,
        });
        self
    }

    pub fn build(self) -> RawJobConfig {
        self.job
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
