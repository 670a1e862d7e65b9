// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod layout;
pub mod logging;
pub mod oracle;
pub mod queue;
pub mod scripts;
pub mod types;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{load_and_validate, load_settings};
use crate::config::model::Settings;
use crate::dag::JobGraph;
use crate::engine::{RunContext, RunSummary, Runtime};
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::JobLayout;
use crate::oracle::MarkerOracle;
use crate::queue::{LocalQueue, SgeQueue};
use crate::scripts::ScriptWriter;
use crate::types::QueueBackendKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings and table loading + validation
/// - the sample list copy and job script generation
/// - graph construction, the queue backend and the runtime loop
pub async fn run(args: CliArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(backend) = args.queue {
        settings.queue.backend = backend;
    }

    let (steps, samples) = load_and_validate(args.step_table_path(), &args.info)?;
    let graph = JobGraph::build(&steps, &samples)?;
    let layout = JobLayout::new(&args.work_dir);

    if args.dry_run {
        print_dry_run(&graph, &layout, &settings);
        return Ok(());
    }

    let fs = RealFileSystem;
    copy_sample_list(&fs, &args.info, &layout)?;

    let mode = args.mode();
    if mode.creates_scripts() {
        ScriptWriter::new(fs, layout.clone(), &args.pipeline_root, &settings.scripts)
            .write_all(&steps, &samples)?;
    }
    if !mode.submits_jobs() {
        info!("create-only mode; nothing submitted");
        return Ok(());
    }

    let summary = drive(graph, layout, &settings).await?;
    debug!(?summary, "run summary");
    Ok(())
}

/// Drive `graph` to completion on the configured queue backend.
pub async fn drive(
    graph: JobGraph,
    layout: JobLayout,
    settings: &Settings,
) -> errors::Result<RunSummary> {
    let ctx = RunContext::new(layout.clone(), settings.scheduler);
    let oracle = MarkerOracle::new(RealFileSystem, layout);

    match settings.queue.backend {
        QueueBackendKind::Sge => {
            let queue = SgeQueue::new(&settings.queue);
            Runtime::new(ctx, graph, queue, oracle).run().await
        }
        QueueBackendKind::Local => {
            let queue = LocalQueue::new(
                settings.scripts.interpreter.as_str(),
                settings.queue.local_slots,
            );
            Runtime::new(ctx, graph, queue, oracle).run().await
        }
    }
}

/// Keep a copy of the sample table next to the jobs it produced.
fn copy_sample_list<F: FileSystem>(fs: &F, source: &Path, layout: &JobLayout) -> Result<()> {
    let contents = fs.read_to_string(source)?;
    let target = layout.sample_list_path();
    fs.write(&target, contents.as_bytes())?;
    debug!(from = %source.display(), to = %target.display(), "copied sample table");
    Ok(())
}

/// Simple dry-run output: settings, then every job in dependency order.
fn print_dry_run(graph: &JobGraph, layout: &JobLayout, settings: &Settings) {
    println!("batchdag dry-run");
    println!("  queue.backend = {:?}", settings.queue.backend);
    println!(
        "  scheduler.max_queued_jobs = {}",
        settings.scheduler.max_queued_jobs
    );
    println!();

    // The graph was validated when built, so this only fails on a bug.
    let order = graph
        .topological_order()
        .unwrap_or_else(|_| graph.keys().cloned().collect());

    println!("jobs ({}):", graph.len());
    for key in order {
        println!("  - {key}");
        println!("      script: {}", layout.script_path(&key).display());
        if let Some(job) = graph.get(&key) {
            if !job.resources.is_empty() {
                println!("      resources: {}", job.resources);
            }
            if !job.parents.is_empty() {
                let parents: Vec<String> = job.parents.iter().map(|p| p.to_string()).collect();
                println!("      after: {}", parents.join(", "));
            }
        }
    }

    debug!("dry-run complete (nothing written or submitted)");
}
