// tests/wrapper_script.rs

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pmdispatch::fs::mock::MockFileSystem;
use pmdispatch::track::wrapper::{next_stamp, sanitize_operation};
use pmdispatch::track::{CommandWrapper, ScriptFlavor, ScriptStyle, WrapperOptions};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn test_sanitize_operation() {
    assert_eq!(sanitize_operation("brew upgrade"), "brew-upgrade");
    assert_eq!(sanitize_operation("  apt // check  "), "apt-check");
    assert_eq!(sanitize_operation("a--b"), "a-b");
    assert_eq!(sanitize_operation("pip3_user install"), "pip3_user-install");
    assert_eq!(sanitize_operation("---"), "job");
    assert_eq!(sanitize_operation(""), "job");
    assert_eq!(sanitize_operation("npm outdated -g"), "npm-outdated-g");
}

#[test]
fn test_stamps_strictly_increase() {
    let mut last = next_stamp();
    for _ in 0..1000 {
        let next = next_stamp();
        assert!(next > last);
        last = next;
    }
}

#[test]
fn test_wrap_names_artifacts_after_token_and_stamp() -> TestResult {
    let fs = MockFileSystem::new();
    let wrapper = CommandWrapper::new(Arc::new(fs.clone()), "/state", WrapperOptions::default());

    let tracked = wrapper.wrap("apt-get upgrade", "apt upgrade", false, ScriptStyle::INTERACTIVE)?;

    let base = format!("apt-upgrade-{}", tracked.stamp);
    assert_eq!(tracked.token, "apt-upgrade");
    assert_eq!(tracked.log_path, Path::new("/state").join(format!("{base}.log")));
    assert_eq!(tracked.status_path, Path::new("/state").join(format!("{base}.status")));
    assert_eq!(tracked.script_path, Path::new("/state").join(format!("{base}.sh")));
    assert!(tracked.command.starts_with("sh "));

    let script = fs.contents(&tracked.script_path).ok_or("script not written")?;
    assert!(script.starts_with("#!/bin/sh\n"));
    assert!(script.contains("apt-get upgrade"));
    assert!(script.contains(r#"mv -f "$status.tmp" "$status""#));
    // Interactive surfaces hand over to a shell instead of exiting.
    assert!(script.contains(r#"exec "${SHELL:-/bin/sh}" -i"#));

    // Nothing has run yet.
    assert!(fs.contents(&tracked.status_path).is_none());
    Ok(())
}

#[test]
fn test_two_wraps_never_collide() -> TestResult {
    let fs = MockFileSystem::new();
    let wrapper = CommandWrapper::new(Arc::new(fs.clone()), "/state", WrapperOptions::default());

    let a = wrapper.wrap("true", "same op", false, ScriptStyle::HEADLESS)?;
    let b = wrapper.wrap("true", "same op", false, ScriptStyle::HEADLESS)?;
    assert_ne!(a.status_path, b.status_path);
    assert_ne!(a.log_path, b.log_path);
    Ok(())
}

#[test]
fn test_batch_flavour() -> TestResult {
    let fs = MockFileSystem::new();
    let wrapper = CommandWrapper::new(Arc::new(fs.clone()), "/state", WrapperOptions::default());
    let style = ScriptStyle {
        flavor: ScriptFlavor::Batch,
        hold_open: true,
    };

    let tracked = wrapper.wrap("winget upgrade --all", "winget upgrade", true, style)?;
    assert_eq!(tracked.script_path.extension().and_then(|e| e.to_str()), Some("cmd"));

    let script = fs.contents(&tracked.script_path).ok_or("script not written")?;
    assert!(script.starts_with("@echo off\r\n"));
    assert!(script.contains("winget upgrade --all"));
    assert!(script.contains("move /Y"));
    assert!(script.contains("timeout /t 3"));
    Ok(())
}

#[test]
fn test_job_timeout_keeps_job_in_foreground() -> TestResult {
    let fs = MockFileSystem::new();
    let options = WrapperOptions {
        close_grace: Duration::ZERO,
        job_timeout: Some(Duration::from_secs(30)),
    };
    let wrapper = CommandWrapper::new(Arc::new(fs.clone()), "/state", options);

    let tracked = wrapper.wrap("sudo apt-get upgrade", "apt upgrade", false, ScriptStyle::INTERACTIVE)?;
    let script = fs.contents(&tracked.script_path).ok_or("script not written")?;
    assert!(script.contains(r#"timeout --foreground 30 sh -c "$1""#));
    assert!(!script.contains("timeout 30"));
    Ok(())
}

#[cfg(unix)]
mod real_shell {
    use super::*;

    use pmdispatch::fs::RealFileSystem;
    use pmdispatch::track::{StatusRecord, StatusState, TrackedCommand};
    use tempfile::TempDir;

    fn run(tracked: &TrackedCommand) -> std::io::Result<std::process::ExitStatus> {
        std::process::Command::new("sh")
            .arg("-c")
            .arg(&tracked.command)
            .stdout(std::process::Stdio::null())
            .status()
    }

    fn wrapper(dir: &TempDir, options: WrapperOptions) -> CommandWrapper {
        CommandWrapper::new(Arc::new(RealFileSystem), dir.path(), options)
    }

    #[test]
    fn test_failing_command_reports_exit_code_and_output() -> TestResult {
        let dir = TempDir::new()?;
        let tracked = wrapper(&dir, WrapperOptions::default()).wrap(
            "echo to-stdout; echo to-stderr >&2; exit 3",
            "fail op",
            false,
            ScriptStyle::HEADLESS,
        )?;

        let status = run(&tracked)?;
        assert_eq!(status.code(), Some(3));

        let record = StatusRecord::parse(&std::fs::read_to_string(&tracked.status_path)?)?;
        assert_eq!(record, StatusRecord::completed(3));

        let log = std::fs::read_to_string(&tracked.log_path)?;
        assert!(log.contains("to-stdout"));
        assert!(log.contains("to-stderr"));

        assert!(!Path::new(&format!("{}.tmp", tracked.status_path.display())).exists());
        Ok(())
    }

    #[test]
    fn test_auto_close_success_exits_zero() -> TestResult {
        let dir = TempDir::new()?;
        let options = WrapperOptions {
            close_grace: Duration::ZERO,
            job_timeout: None,
        };
        let tracked = wrapper(&dir, options).wrap("echo 'it''s fine'", "ok op", true, ScriptStyle::HEADLESS)?;

        let status = run(&tracked)?;
        assert!(status.success());

        let record = StatusRecord::parse(&std::fs::read_to_string(&tracked.status_path)?)?;
        assert_eq!(record, StatusRecord::completed(0));
        assert!(std::fs::read_to_string(&tracked.log_path)?.contains("its fine"));
        Ok(())
    }

    fn foreground_timeout_available() -> bool {
        std::process::Command::new("timeout")
            .args(["--foreground", "1", "true"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_job_timeout_is_recorded_as_errored() -> TestResult {
        if !foreground_timeout_available() {
            return Ok(());
        }

        let dir = TempDir::new()?;
        let options = WrapperOptions {
            close_grace: Duration::ZERO,
            job_timeout: Some(Duration::from_secs(1)),
        };
        let tracked = wrapper(&dir, options).wrap("exec sleep 5", "slow op", false, ScriptStyle::HEADLESS)?;

        run(&tracked)?;

        let record = StatusRecord::parse(&std::fs::read_to_string(&tracked.status_path)?)?;
        assert_eq!(record.state, StatusState::Errored);
        assert_eq!(record.exit_code, Some(124));
        assert!(record.error_detail.unwrap_or_default().contains("timed out"));
        Ok(())
    }

    /// A job under a timeout can still read a password from its terminal.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_job_with_timeout_reads_from_tty() -> TestResult {
        use std::io::Write;
        use std::process::Stdio;

        if !foreground_timeout_available() || which::which("script").is_err() {
            return Ok(());
        }

        let dir = TempDir::new()?;
        let options = WrapperOptions {
            close_grace: Duration::ZERO,
            job_timeout: Some(Duration::from_secs(3)),
        };
        let tracked = wrapper(&dir, options).wrap(
            "read pw </dev/tty && echo got:$pw",
            "tty op",
            false,
            ScriptStyle::HEADLESS,
        )?;

        let mut child = std::process::Command::new("script")
            .args(["-qec", &tracked.command, "/dev/null"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        // Keep stdin open until the job exits; `script` may end the session on EOF.
        let mut stdin = child.stdin.take().ok_or("no stdin")?;
        stdin.write_all(b"secret\n")?;
        stdin.flush()?;
        child.wait()?;
        drop(stdin);

        let record = StatusRecord::parse(&std::fs::read_to_string(&tracked.status_path)?)?;
        assert_eq!(record, StatusRecord::completed(0));
        assert!(std::fs::read_to_string(&tracked.log_path)?.contains("got:secret"));
        Ok(())
    }
}
