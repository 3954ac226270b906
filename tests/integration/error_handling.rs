// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;

use pmdispatch::config::load_and_validate;
use pmdispatch::errors::DispatchError;
use pmdispatch::types::Operation;

fn load(contents: &str) -> Result<pmdispatch::config::ConfigFile, DispatchError> {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{contents}").expect("write config");
    load_and_validate(file.path())
}

fn expect_config_error(contents: &str, needle: &str) {
    match load(contents) {
        Err(DispatchError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} does not mention {needle:?}")
        }
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_catalogue_is_rejected() {
    expect_config_error("[settings]\npolicy = \"parallel\"\n", "at least one [job.<id>]");
}

#[test]
fn test_job_without_commands_is_rejected() {
    expect_config_error("[job.apt]\nrequires_privilege = true\n", "job 'apt' must define at least one command");
}

#[test]
fn test_unknown_operation_key_is_rejected() {
    expect_config_error("[job.apt]\ncommands.frobnicate = \"apt frob\"\n", "invalid operation: frobnicate");
}

#[test]
fn test_empty_command_is_rejected() {
    expect_config_error("[job.apt]\ncommands.check = \"   \"\n", "empty 'check' command");
    expect_config_error("[job.apt]\ncommands.check = []\n", "empty 'check' command");
}

#[test]
fn test_bad_regex_is_rejected() {
    expect_config_error(
        r#"
[job.npm]
commands.check = "npm outdated -g"

[[job.npm.success]]
exit_code = 1
output_matches = "(unclosed"
"#,
        "invalid output_matches regex",
    );
}

#[test]
fn test_success_rule_for_missing_operation_is_rejected() {
    expect_config_error(
        r#"
[job.npm]
commands.check = "npm outdated -g"

[[job.npm.success]]
exit_code = 1
operation = "upgrade"
"#,
        "no 'upgrade' command",
    );
}

#[test]
fn test_zero_intervals_are_rejected() {
    expect_config_error(
        "[settings]\npoll_interval_ms = 0\n\n[job.a]\ncommands.check = \"true\"\n",
        "poll_interval_ms",
    );
    expect_config_error(
        "[settings]\nstatus_timeout_secs = 0\n\n[job.a]\ncommands.check = \"true\"\n",
        "status_timeout_secs",
    );
    expect_config_error(
        "[settings]\njob_timeout_secs = 0\n\n[job.a]\ncommands.check = \"true\"\n",
        "job_timeout_secs",
    );
}

#[test]
fn test_invalid_policy_is_a_toml_error() {
    let result = load("[settings]\npolicy = \"sometimes\"\n\n[job.a]\ncommands.check = \"true\"\n");
    assert!(matches!(result, Err(DispatchError::TomlError(_))), "got {result:?}");
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let result = load("[job.a\ncommands.check = ");
    assert!(matches!(result, Err(DispatchError::TomlError(_))));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let result = load_and_validate("/definitely/not/here/Pmdispatch.toml");
    assert!(matches!(result, Err(DispatchError::IoError(_))));
}

#[test]
fn test_unknown_only_job_is_job_not_found() {
    let cfg = load("[job.apt]\ncommands.upgrade = \"apt upgrade\"\n").expect("valid config");
    let result = cfg.job_descriptors(Operation::Upgrade, &["brew".to_string()]);
    match result {
        Err(DispatchError::JobNotFound(id)) => assert_eq!(id, "brew"),
        other => panic!("Expected JobNotFound, got {other:?}"),
    }
}

#[test]
fn test_only_job_without_operation_is_config_error() {
    let cfg = load("[job.apt]\ncommands.upgrade = \"apt upgrade\"\n").expect("valid config");
    let result = cfg.job_descriptors(Operation::Install, &["apt".to_string()]);
    assert!(matches!(result, Err(DispatchError::ConfigError(msg)) if msg.contains("no 'install' command")));
}
