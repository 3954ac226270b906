// tests/integration/config_loading.rs

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use pmdispatch::config::load_and_validate;
use pmdispatch::job::CommandSpec;
use pmdispatch::types::{ExecutionPolicy, Operation};
use pmdispatch_test_utils::builders::{ConfigFileBuilder, JobConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

const CATALOGUE: &str = r#"
[settings]
policy = "parallel"
auto_close = true
close_grace_secs = 5
poll_interval_ms = 250
status_timeout_secs = 7200
job_timeout_secs = 3600
close_prompt_timeout_secs = 30
state_dir = "/tmp/pmdispatch-test-state"

[job.npm]
commands.check = "npm outdated -g"
commands.upgrade = ["npm", "update", "-g"]

[[job.npm.success]]
exit_code = 1
operation = "check"
requires_output = true

[job.apt]
requires_privilege = true
priority = 0
commands.check = "sudo apt-get update && apt list --upgradable"
commands.upgrade = ["sudo", "apt-get", "upgrade", "-y"]

[job.cargo]
commands.upgrade = "cargo install-update -a"
"#;

fn write_catalogue() -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{CATALOGUE}")?;
    Ok(file)
}

#[test]
fn test_settings_are_parsed() -> TestResult {
    let file = write_catalogue()?;
    let cfg = load_and_validate(file.path())?;
    let s = &cfg.settings;

    assert_eq!(s.policy, ExecutionPolicy::Parallel);
    assert!(s.auto_close);
    assert_eq!(s.close_grace, Duration::from_secs(5));
    assert_eq!(s.poll_interval, Duration::from_millis(250));
    assert_eq!(s.status_timeout, Some(Duration::from_secs(7200)));
    assert_eq!(s.job_timeout, Some(Duration::from_secs(3600)));
    assert_eq!(s.close_prompt_timeout, Duration::from_secs(30));
    assert_eq!(s.resolved_state_dir(), PathBuf::from("/tmp/pmdispatch-test-state"));
    assert_eq!(
        s.registry_path(),
        PathBuf::from("/tmp/pmdispatch-test-state/surface_registry.json")
    );
    Ok(())
}

#[test]
fn test_defaults_apply_when_settings_are_omitted() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_job("brew", JobConfigBuilder::new().command("upgrade", "brew upgrade").build())
        .build();
    let s = &cfg.settings;

    assert_eq!(s.policy, ExecutionPolicy::Sequential);
    assert!(!s.auto_close);
    assert!(!s.headless);
    assert_eq!(s.close_grace, Duration::from_secs(3));
    assert_eq!(s.poll_interval, Duration::from_secs(1));
    assert_eq!(s.status_timeout, None);
    assert_eq!(s.close_prompt_timeout, Duration::from_secs(60));

    let job = cfg.job("brew").ok_or("brew missing")?;
    assert!(!job.requires_privilege);
    assert_eq!(job.priority, 10);
    Ok(())
}

#[test]
fn test_job_order_follows_file_and_skips_missing_operations() -> TestResult {
    let file = write_catalogue()?;
    let cfg = load_and_validate(file.path())?;

    let ids: Vec<&str> = cfg.jobs().keys().map(|k| k.as_str()).collect();
    assert_eq!(ids, vec!["npm", "apt", "cargo"]);

    let check: Vec<String> = cfg
        .job_descriptors(Operation::Check, &[])?
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(check, vec!["npm", "apt"]);

    let upgrade = cfg.job_descriptors(Operation::Upgrade, &[])?;
    assert_eq!(upgrade.len(), 3);
    assert!(upgrade[1].requires_privilege);
    assert_eq!(upgrade[1].priority, 0);
    assert_eq!(
        upgrade[1].command,
        CommandSpec::Argv(vec![
            "sudo".into(),
            "apt-get".into(),
            "upgrade".into(),
            "-y".into()
        ])
    );
    assert_eq!(upgrade[1].command.to_shell(), "sudo apt-get upgrade -y");
    Ok(())
}

#[test]
fn test_only_selects_and_orders_jobs() -> TestResult {
    let file = write_catalogue()?;
    let cfg = load_and_validate(file.path())?;

    let only = vec!["cargo".to_string(), "npm".to_string(), "cargo".to_string()];
    let ids: Vec<String> = cfg
        .job_descriptors(Operation::Upgrade, &only)?
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["cargo", "npm"]);
    Ok(())
}

#[test]
fn test_reconciler_is_built_from_success_rules() -> TestResult {
    let file = write_catalogue()?;
    let cfg = load_and_validate(file.path())?;

    let check = cfg.reconciler(Operation::Check);
    assert!(check.reconcile("npm", 1, "typescript 5.3.3 5.4.2"));
    assert!(!check.reconcile("npm", 1, ""));
    assert!(!check.reconcile("apt", 1, "anything"));

    let upgrade = cfg.reconciler(Operation::Upgrade);
    assert!(!upgrade.reconcile("npm", 1, "typescript 5.3.3 5.4.2"));
    Ok(())
}

#[test]
fn test_argv_with_spaces_is_quoted() {
    let spec = CommandSpec::Argv(vec!["echo".into(), "a b".into(), "it's".into()]);
    let rendered = spec.to_shell();
    assert_eq!(shlex::split(&rendered), Some(vec!["echo".to_string(), "a b".to_string(), "it's".to_string()]));
}
