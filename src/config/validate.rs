// src/config/validate.rs

use std::collections::BTreeMap;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::model::{ConfigFile, JobConfig, RawConfigFile, RawJobConfig, RawSettings, Settings};
use crate::errors::{DispatchError, Result};
use crate::job::JobId;
use crate::reconcile::SuccessRule;
use crate::types::Operation;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DispatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_jobs(&raw)?;
        validate_settings(&raw.settings)?;

        let mut jobs: IndexMap<JobId, JobConfig> = IndexMap::with_capacity(raw.job.len());
        for (id, job) in raw.job.iter() {
            jobs.insert(id.clone(), validate_job(id, job)?);
        }

        Ok(ConfigFile::new_unchecked(Settings::from(&raw.settings), jobs))
    }
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(DispatchError::ConfigError(
            "config must contain at least one [job.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(settings: &RawSettings) -> Result<()> {
    if settings.poll_interval_ms == 0 {
        return Err(DispatchError::ConfigError(
            "[settings].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if settings.status_timeout_secs == Some(0) {
        return Err(DispatchError::ConfigError(
            "[settings].status_timeout_secs must be >= 1 when set (got 0)".to_string(),
        ));
    }
    if settings.job_timeout_secs == Some(0) {
        return Err(DispatchError::ConfigError(
            "[settings].job_timeout_secs must be >= 1 when set (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_job(id: &str, job: &RawJobConfig) -> Result<JobConfig> {
    if id.trim().is_empty() {
        return Err(DispatchError::ConfigError("job ids must not be empty".to_string()));
    }
    if job.commands.is_empty() {
        return Err(DispatchError::ConfigError(format!(
            "job '{id}' must define at least one command under `commands`"
        )));
    }

    let mut commands = BTreeMap::new();
    for (name, command) in job.commands.iter() {
        let operation: Operation = name
            .parse()
            .map_err(|e| DispatchError::ConfigError(format!("job '{id}': {e}")))?;
        if command.is_empty() {
            return Err(DispatchError::ConfigError(format!(
                "job '{id}' has an empty '{operation}' command"
            )));
        }
        commands.insert(operation, command.clone());
    }

    let mut success = Vec::with_capacity(job.success.len());
    for rule in job.success.iter() {
        if let Some(operation) = rule.operation {
            if !commands.contains_key(&operation) {
                return Err(DispatchError::ConfigError(format!(
                    "job '{id}' has a success rule for '{operation}' but no '{operation}' command"
                )));
            }
        }
        let pattern = match &rule.output_matches {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                DispatchError::ConfigError(format!("job '{id}': invalid output_matches regex: {e}"))
            })?),
            None => None,
        };
        success.push(SuccessRule {
            exit_code: rule.exit_code,
            requires_output: rule.requires_output,
            pattern,
            operation: rule.operation,
        });
    }

    Ok(JobConfig {
        requires_privilege: job.requires_privilege,
        priority: job.priority,
        commands,
        success,
    })
}
