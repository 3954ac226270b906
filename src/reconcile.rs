// src/reconcile.rs

//! Outcome reconciliation.
//!
//! Most tools follow the usual "exit code 0 means success" convention, but a
//! few don't: `npm outdated` exits 1 whenever it finds something to report.
//! Such jobs carry override rules in the job catalogue.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::job::JobId;
use crate::types::Operation;

/// One success override for a job.
#[derive(Debug, Clone)]
pub struct SuccessRule {
    pub exit_code: i32,
    /// Only match when the captured output is non-empty after trimming.
    pub requires_output: bool,
    /// Only match when this regex finds a match in the output.
    pub pattern: Option<Regex>,
    /// Restrict the rule to one operation.
    pub operation: Option<Operation>,
}

impl SuccessRule {
    pub fn exit_code(code: i32) -> Self {
        Self {
            exit_code: code,
            requires_output: false,
            pattern: None,
            operation: None,
        }
    }

    pub fn requiring_output(mut self) -> Self {
        self.requires_output = true;
        self
    }

    pub fn matching(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn for_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    fn matches(&self, operation: Operation, exit_code: i32, output: &str) -> bool {
        if self.exit_code != exit_code {
            return false;
        }
        if self.operation.is_some_and(|op| op != operation) {
            return false;
        }
        if self.requires_output && output.trim().is_empty() {
            return false;
        }
        match &self.pattern {
            Some(re) => re.is_match(output),
            None => true,
        }
    }
}

/// Maps `(job, exit code, output)` to a success verdict.
#[derive(Debug, Clone)]
pub struct OutcomeReconciler {
    operation: Operation,
    rules: HashMap<JobId, Vec<SuccessRule>>,
}

impl OutcomeReconciler {
    /// Reconciler with no overrides: success iff exit code 0.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            rules: HashMap::new(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn add_rule(&mut self, job_id: impl Into<JobId>, rule: SuccessRule) {
        self.rules.entry(job_id.into()).or_default().push(rule);
    }

    pub fn with_rule(mut self, job_id: impl Into<JobId>, rule: SuccessRule) -> Self {
        self.add_rule(job_id, rule);
        self
    }

    pub fn reconcile(&self, job_id: &str, exit_code: i32, output: &str) -> bool {
        if exit_code == 0 {
            return true;
        }
        let overridden = self
            .rules
            .get(job_id)
            .is_some_and(|rules| rules.iter().any(|r| r.matches(self.operation, exit_code, output)));
        if overridden {
            debug!(job = %job_id, exit_code, "non-zero exit accepted by success override");
        }
        overridden
    }
}
