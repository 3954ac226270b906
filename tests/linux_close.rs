// tests/linux_close.rs

#![cfg(target_os = "linux")]

use std::error::Error;
use std::path::PathBuf;

use chrono::Utc;

use pmdispatch::surface::SurfaceProvider;
use pmdispatch::surface::linux::{LinuxTerminalProvider, is_emulator_comm};
use pmdispatch::track::RegistryEntry;
use pmdispatch::types::SurfaceKind;
use pmdispatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn test_emulator_comm_matching() {
    assert!(is_emulator_comm("gnome-terminal\n"));
    assert!(is_emulator_comm("xterm"));
    assert!(!is_emulator_comm("sleep\n"));
    assert!(!is_emulator_comm("bash"));
    assert!(!is_emulator_comm(""));
}

#[tokio::test]
async fn test_close_never_signals_a_reused_launcher_pid() -> TestResult {
    init_tracing();

    // Stands in for an unrelated process that inherited the launcher's pid.
    let mut bystander = std::process::Command::new("sleep").arg("30").spawn()?;

    let entry = RegistryEntry {
        job_id: "apt".to_string(),
        label: "PMDISPATCH-apt-upgrade-1-1700000000000".to_string(),
        surface: SurfaceKind::LinuxTerminal,
        surface_id: None,
        pid: Some(bystander.id()),
        log_path: PathBuf::from("/tmp/apt.log"),
        status_path: PathBuf::from("/tmp/apt.status"),
        spawned_at: Utc::now(),
    };

    let provider = LinuxTerminalProvider::detect();
    let closed = with_timeout(provider.close(&entry)).await;

    let still_running = bystander.try_wait()?.is_none();
    bystander.kill()?;
    bystander.wait()?;

    assert!(!closed);
    assert!(still_running, "close() signalled a process that is not a terminal emulator");
    Ok(())
}
