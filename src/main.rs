// src/main.rs

use pmdispatch::{cli, logging, run};

/// Exit code when the run completed but at least one job failed.
const EXIT_JOBS_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    match run_main().await {
        // Exit explicitly: a pending stdin read from the close prompt would
        // otherwise hold up runtime shutdown.
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(EXIT_JOBS_FAILED),
        Err(err) => {
            eprintln!("pmdispatch error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
