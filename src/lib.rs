// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod job;
pub mod logging;
pub mod reconcile;
pub mod sched;
pub mod session;
pub mod surface;
pub mod track;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::model::REGISTRY_FILE_NAME;
use crate::config::{ConfigFile, Settings, apply_env_overrides, load_and_validate};
use crate::fs::{FileSystem, RealFileSystem};
use crate::job::{JobDescriptor, JobOutcome};
use crate::sched::{ExecutionPlan, Scheduler, SchedulerOptions};
use crate::session::{CloseDecision, close_all, prompt_close};
use crate::surface::{SurfaceProvider, detect_provider};
use crate::track::{CommandWrapper, JobRegistry, StatusPoller, StatusState, WrapperOptions};
use crate::types::Operation;

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(true)` when every dispatched job succeeded.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    match args.command {
        Command::Run(run_args) => {
            let cfg = load_and_validate(&config_path)
                .with_context(|| format!("loading job catalogue {:?}", config_path))?;
            run_jobs(cfg, &run_args).await
        }
        Command::List => {
            let settings = settings_for(&config_path)?;
            list_registry(&settings)?;
            Ok(true)
        }
        Command::Close => {
            let settings = settings_for(&config_path)?;
            let registry = JobRegistry::new(Arc::new(RealFileSystem), settings.registry_path());
            let closed = close_all(&registry).await?;
            println!("closed {closed} surface(s)");
            Ok(true)
        }
    }
}

/// Dispatch one operation across the catalogue and report the results.
async fn run_jobs(cfg: ConfigFile, run_args: &RunArgs) -> Result<bool> {
    let mut settings = cfg.settings.clone();
    if let Some(policy) = run_args.policy() {
        settings.policy = policy;
    }
    settings.auto_close |= run_args.auto_close;
    settings.headless |= run_args.headless;

    let operation = run_args.operation;
    let jobs = cfg.job_descriptors(operation, &run_args.only)?;
    if jobs.is_empty() {
        warn!(operation = %operation, "no job defines this operation");
        println!("nothing to do: no job defines '{operation}'");
        return Ok(true);
    }

    if run_args.dry_run {
        print_dry_run(&settings, operation, &jobs);
        return Ok(true);
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let state_dir = settings.resolved_state_dir();
    fs.create_dir_all(&state_dir)?;

    let registry = JobRegistry::new(fs.clone(), state_dir.join(REGISTRY_FILE_NAME));
    if let Err(e) = registry.clear() {
        warn!(error = %e, "could not reset job registry");
    }

    let provider = detect_provider(settings.headless);
    let wrapper = CommandWrapper::new(
        fs.clone(),
        &state_dir,
        WrapperOptions {
            close_grace: settings.close_grace,
            job_timeout: settings.job_timeout,
        },
    );
    let poller = StatusPoller::new(fs.clone(), settings.poll_interval);
    let options = SchedulerOptions {
        policy: settings.policy,
        auto_close: settings.auto_close,
        status_timeout: settings.status_timeout,
        operation,
    };
    let mut scheduler = Scheduler::new(
        provider,
        fs.clone(),
        wrapper,
        registry.clone(),
        poller,
        cfg.reconciler(operation),
        options,
    );

    let outcomes = tokio::select! {
        outcomes = scheduler.dispatch(&jobs) => outcomes,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupted; jobs already spawned keep running in their own surfaces");
            eprintln!("interrupted; use `pmdispatch list` to check on spawned jobs");
            return Ok(false);
        }
    };

    print_summary(operation, &outcomes);

    if scheduler.provider().is_interactive() && !run_args.no_close_prompt {
        offer_close(&registry, &settings).await?;
    }

    Ok(outcomes.iter().all(|o| o.success))
}

async fn offer_close(registry: &JobRegistry, settings: &Settings) -> Result<()> {
    let open = match registry.load_all() {
        Ok(entries) => entries.len(),
        Err(e) => {
            warn!(error = %e, "could not read job registry");
            return Ok(());
        }
    };
    if open == 0 {
        return Ok(());
    }

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(());
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let decision = prompt_close(open, settings.close_prompt_timeout, stdin, cancel_rx).await;
    ctrl_c.abort();

    match decision {
        CloseDecision::Close => {
            let closed = close_all(registry).await?;
            println!("closed {closed} surface(s)");
        }
        CloseDecision::KeepOpen => {
            println!("leaving job surfaces open; run `pmdispatch close` to close them later");
        }
    }
    Ok(())
}

/// Settings for commands that don't need a catalogue: the config file's if
/// present, defaults plus environment otherwise.
fn settings_for(config_path: &Path) -> Result<Settings> {
    if config_path.exists() {
        let cfg = load_and_validate(config_path)
            .with_context(|| format!("loading job catalogue {:?}", config_path))?;
        return Ok(cfg.settings);
    }
    debug!(path = ?config_path, "no job catalogue; using default settings");
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

fn list_registry(settings: &Settings) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let registry = JobRegistry::new(fs.clone(), settings.registry_path());
    let poller = StatusPoller::new(fs, settings.poll_interval);

    let entries = registry.load_all()?;
    if entries.is_empty() {
        println!("no recorded job surfaces in {:?}", registry.path());
        return Ok(());
    }

    for entry in entries {
        let record = poller.check(&entry.status_path);
        let state = match (record.state, record.exit_code) {
            (StatusState::Running, _) => "running".to_string(),
            (StatusState::Completed, Some(code)) => format!("exit {code}"),
            (StatusState::Completed, None) => "completed".to_string(),
            (StatusState::Errored, _) => {
                format!("errored: {}", record.error_detail.unwrap_or_default())
            }
        };
        println!(
            "{:<16} {:<16} {:<12} {}",
            entry.job_id, entry.surface, state, entry.label
        );
        println!("    log: {}", entry.log_path.display());
    }
    Ok(())
}

fn print_dry_run(settings: &Settings, operation: Operation, jobs: &[JobDescriptor]) {
    let plan = ExecutionPlan::from_jobs(jobs);

    println!("pmdispatch dry-run ({operation})");
    println!("  policy = {:?}", settings.policy);
    println!("  auto_close = {}", settings.auto_close);
    println!("  headless = {}", settings.headless);
    println!("  state_dir = {}", settings.resolved_state_dir().display());
    println!();

    println!("privileged, one at a time ({}):", plan.privileged.len());
    for &i in &plan.privileged {
        println!("  - {} [priority {}]: {}", jobs[i].id, jobs[i].priority, jobs[i].command.to_shell());
    }
    println!("unprivileged ({}):", plan.unprivileged.len());
    for &i in &plan.unprivileged {
        println!("  - {} [priority {}]: {}", jobs[i].id, jobs[i].priority, jobs[i].command.to_shell());
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(operation: Operation, outcomes: &[JobOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.success).count();
    info!(operation = %operation, total = outcomes.len(), failed, "dispatch finished");

    println!();
    println!("{operation} summary:");
    for outcome in outcomes {
        if outcome.success {
            println!("  ok      {}", outcome.id);
        } else {
            println!("  FAILED  {}: {}", outcome.id, outcome.error);
        }
    }
    println!(
        "{} succeeded, {} failed",
        outcomes.len() - failed,
        failed
    );
}
