// src/main.rs

use anyhow::Context;
use batchdag::layout::JobLayout;
use batchdag::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        tracing::error!(error = %err, "run failed");
        eprintln!("batchdag error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();

    let log_file = if args.dry_run {
        None
    } else {
        std::fs::create_dir_all(&args.work_dir)
            .with_context(|| format!("creating work dir {}", args.work_dir.display()))?;
        Some(JobLayout::new(&args.work_dir).log_path())
    };
    logging::init_logging(args.log_level, log_file.as_deref())?;

    run(args).await
}
