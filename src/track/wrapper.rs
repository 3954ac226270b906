// src/track/wrapper.rs

//! Tracked-command wrapper.
//!
//! There is no portable way to learn the exit code of a command running in a
//! separate terminal window, so every job is wrapped in a small generated
//! script that:
//!
//! 1. runs the original command with stdout+stderr appended to a log file
//!    (while still echoing to the surface, so prompts stay visible);
//! 2. once the output has drained, writes the terminal status record to a
//!    temp file and renames it over the status path;
//! 3. optionally closes its own surface after a grace period on success, or
//!    keeps it open for inspection.
//!
//! The poller then only has to watch the status path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Shell dialect of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// POSIX `sh` (Linux, macOS, WSL, tmux, headless).
    Posix,
    /// Windows batch file run by `cmd`.
    Batch,
}

/// How a surface wants its wrapped commands shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStyle {
    pub flavor: ScriptFlavor,
    /// Keep the surface open after a failure (or when auto-close is off) by
    /// handing it back to an interactive shell. Must be `false` for
    /// surfaces nobody can interact with.
    pub hold_open: bool,
}

impl ScriptStyle {
    pub const HEADLESS: ScriptStyle = ScriptStyle {
        flavor: ScriptFlavor::Posix,
        hold_open: false,
    };

    pub const INTERACTIVE: ScriptStyle = ScriptStyle {
        flavor: ScriptFlavor::Posix,
        hold_open: true,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct WrapperOptions {
    /// Delay before an auto-closing surface exits.
    pub close_grace: Duration,
    /// Timeout baked into the script (requires the `timeout` utility).
    pub job_timeout: Option<Duration>,
}

impl Default for WrapperOptions {
    fn default() -> Self {
        Self {
            close_grace: Duration::from_secs(3),
            job_timeout: None,
        }
    }
}

/// Result of wrapping a command: what to run, and where it will report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedCommand {
    /// Sanitized operation name used in file names.
    pub token: String,
    /// Process-wide strictly increasing millisecond stamp.
    pub stamp: u64,
    /// Command line to execute inside the surface: `sh '<script>'` for
    /// POSIX scripts, the double-quoted script path for batch ones. The
    /// batch form is meant for `cmd.exe` and must be passed unescaped.
    pub command: String,
    pub script_path: PathBuf,
    pub log_path: PathBuf,
    pub status_path: PathBuf,
}

/// Exit code `timeout(1)` uses when the deadline hits.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone)]
pub struct CommandWrapper {
    fs: Arc<dyn FileSystem>,
    state_dir: PathBuf,
    options: WrapperOptions,
}

impl CommandWrapper {
    pub fn new(fs: Arc<dyn FileSystem>, state_dir: impl Into<PathBuf>, options: WrapperOptions) -> Self {
        Self {
            fs,
            state_dir: state_dir.into(),
            options,
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Wrap `command` so that it reports through a log and a status file.
    ///
    /// The script is written to disk immediately; the returned
    /// [`TrackedCommand::command`] just invokes it.
    pub fn wrap(
        &self,
        command: &str,
        operation: &str,
        auto_close: bool,
        style: ScriptStyle,
    ) -> Result<TrackedCommand> {
        let token = sanitize_operation(operation);
        let stamp = next_stamp();
        let base = format!("{token}-{stamp}");

        let log_path = self.state_dir.join(format!("{base}.log"));
        let status_path = self.state_dir.join(format!("{base}.status"));

        let (script_path, script, invoke) = match style.flavor {
            ScriptFlavor::Posix => {
                let path = self.state_dir.join(format!("{base}.sh"));
                let script = self.posix_script(command, operation, auto_close, style.hold_open, &log_path, &status_path);
                let invoke = format!("sh {}", sh_quote(&path.to_string_lossy()));
                (path, script, invoke)
            }
            ScriptFlavor::Batch => {
                let path = self.state_dir.join(format!("{base}.cmd"));
                let script = self.batch_script(command, operation, auto_close, style.hold_open, &log_path, &status_path);
                let invoke = format!("\"{}\"", path.to_string_lossy());
                (path, script, invoke)
            }
        };

        self.fs.create_dir_all(&self.state_dir)?;
        self.fs.write(&script_path, script.as_bytes())?;

        debug!(
            operation,
            script = ?script_path,
            log = ?log_path,
            status = ?status_path,
            "wrote tracked command script"
        );

        Ok(TrackedCommand {
            token,
            stamp,
            command: invoke,
            script_path,
            log_path,
            status_path,
        })
    }

    fn posix_script(
        &self,
        command: &str,
        operation: &str,
        auto_close: bool,
        hold_open: bool,
        log_path: &Path,
        status_path: &Path,
    ) -> String {
        let mut lines: Vec<String> = vec![
            "#!/bin/sh".to_string(),
            format!("# pmdispatch tracked job: {}", one_line(operation)),
            format!("log={}", sh_quote(&log_path.to_string_lossy())),
            format!("status={}", sh_quote(&status_path.to_string_lossy())),
            format!("op={}", sh_quote(operation)),
            r#"code_file="$status.code""#.to_string(),
            r#"printf '==> %s\n' "$op""#.to_string(),
            r#": > "$log""#.to_string(),
        ];

        let timeout_secs = self.options.job_timeout.map(|d| d.as_secs().max(1));
        match timeout_secs {
            Some(secs) => {
                // --foreground keeps the job in the terminal's process group so
                // password prompts can read from the tty.
                lines.push(
                    "if command -v timeout >/dev/null 2>&1 && timeout --foreground 1 true >/dev/null 2>&1; then"
                        .to_string(),
                );
                lines.push(format!("  run_job() {{ timeout --foreground {secs} sh -c \"$1\"; }}"));
                lines.push("else".to_string());
                lines.push(r#"  run_job() { sh -c "$1"; }"#.to_string());
                lines.push("fi".to_string());
            }
            None => lines.push(r#"run_job() { sh -c "$1"; }"#.to_string()),
        }

        lines.push(format!(
            r#"{{ run_job {}; echo $? > "$code_file"; }} 2>&1 | tee -a "$log""#,
            sh_quote(command)
        ));
        lines.push(r#"code=$(cat "$code_file" 2>/dev/null)"#.to_string());
        lines.push(r#"rm -f "$code_file""#.to_string());
        lines.push(r#"[ -n "$code" ] || code=1"#.to_string());

        match timeout_secs {
            Some(secs) => {
                lines.push(format!(r#"if [ "$code" -eq {TIMEOUT_EXIT_CODE} ]; then"#));
                lines.push(format!(
                    r#"  printf '{{"status":"errored","exit_code":%s,"error":"timed out after {secs} seconds"}}\n' "$code" > "$status.tmp""#
                ));
                lines.push("else".to_string());
                lines.push(
                    r#"  printf '{"status":"completed","exit_code":%s}\n' "$code" > "$status.tmp""#.to_string(),
                );
                lines.push("fi".to_string());
            }
            None => lines.push(
                r#"printf '{"status":"completed","exit_code":%s}\n' "$code" > "$status.tmp""#.to_string(),
            ),
        }
        lines.push(r#"mv -f "$status.tmp" "$status""#.to_string());

        lines.push(r#"if [ "$code" -eq 0 ]; then"#.to_string());
        lines.push(r#"  printf '\n==> %s finished\n' "$op""#.to_string());
        lines.push("else".to_string());
        lines.push(r#"  printf '\n==> %s failed with exit code %s\n' "$op" "$code""#.to_string());
        lines.push("fi".to_string());

        if auto_close {
            let grace = self.options.close_grace.as_secs();
            lines.push(r#"if [ "$code" -eq 0 ]; then"#.to_string());
            lines.push(format!("  printf 'closing in {grace} seconds...\\n'"));
            lines.push(format!("  sleep {grace}"));
            lines.push("  exit 0".to_string());
            lines.push("fi".to_string());
        }

        if hold_open {
            lines.push(r#"printf 'log: %s\n' "$log""#.to_string());
            lines.push(r#"exec "${SHELL:-/bin/sh}" -i"#.to_string());
        } else {
            lines.push(r#"exit "$code""#.to_string());
        }

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    fn batch_script(
        &self,
        command: &str,
        operation: &str,
        auto_close: bool,
        hold_open: bool,
        log_path: &Path,
        status_path: &Path,
    ) -> String {
        if self.options.job_timeout.is_some() {
            warn!(operation, "job timeout is not supported for batch scripts; ignoring");
        }

        let log = log_path.to_string_lossy();
        let status = status_path.to_string_lossy();

        let mut lines: Vec<String> = vec![
            "@echo off".to_string(),
            format!("rem pmdispatch tracked job: {}", one_line(operation)),
            format!("echo ==^> {}", one_line(operation)),
            format!("cmd /c {command} > \"{log}\" 2>&1"),
            "set PMDISPATCH_CODE=%ERRORLEVEL%".to_string(),
            format!("type \"{log}\""),
            format!(
                "> \"{status}.tmp\" echo {{\"status\":\"completed\",\"exit_code\":%PMDISPATCH_CODE%}}"
            ),
            format!("move /Y \"{status}.tmp\" \"{status}\" > nul"),
        ];

        if auto_close {
            let grace = self.options.close_grace.as_secs();
            lines.push(format!(
                "if \"%PMDISPATCH_CODE%\"==\"0\" ( timeout /t {grace} /nobreak > nul & exit 0 )"
            ));
        }
        if !hold_open {
            lines.push("exit /b %PMDISPATCH_CODE%".to_string());
        }

        let mut script = lines.join("\r\n");
        script.push_str("\r\n");
        script
    }
}

/// Reduce an operation name to a filesystem-safe token.
///
/// Runs of characters outside `[A-Za-z0-9_-]` become a single `-`, repeated
/// hyphens collapse, and leading/trailing hyphens are trimmed.
pub fn sanitize_operation(operation: &str) -> String {
    let mut out = String::with_capacity(operation.len());
    for ch in operation.chars() {
        let safe = ch.is_ascii_alphanumeric() || ch == '_' || ch == '-';
        if safe && ch != '-' {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Millisecond wall-clock stamp, strictly increasing within this process.
pub fn next_stamp() -> u64 {
    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

pub(crate) fn sh_quote(s: &str) -> String {
    match shlex::try_quote(s) {
        Ok(q) => q.into_owned(),
        Err(_) => format!("'{}'", s.replace('\0', "").replace('\'', r"'\''")),
    }
}

fn one_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
