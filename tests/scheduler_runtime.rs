// tests/scheduler_runtime.rs

mod common;
use crate::common::{
    build_graph, fast_settings, init_tracing, pipeline_steps, runtime, samples, with_timeout,
    Behaviour, FakeQueue, MemoryOracle, StepTableBuilder,
};

use std::error::Error;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use batchdag::config::SchedulerSettings;
use batchdag::dag::JobKey;
use batchdag::errors::BatchdagError;

type TestResult = Result<(), Box<dyn Error>>;

fn align_merge() -> batchdag::config::StepTable {
    StepTableBuilder::new()
        .single("align", &[])
        .batch("merge", &["align"])
        .build()
}

/// Second-scale waits, for tests that run on tokio's paused clock.
fn slow_settings() -> SchedulerSettings {
    SchedulerSettings {
        max_queued_jobs: 100,
        throttle_interval: Duration::from_secs(600),
        poll_interval: Duration::from_secs(60),
        failure_confirm_delay: Duration::from_secs(45),
    }
}

/// Write `key`'s marker once `after` has passed on the tokio clock.
fn mark_later(oracle: &MemoryOracle, key: JobKey, after: Duration) {
    let oracle = oracle.clone();
    tokio::spawn(async move {
        sleep(after).await;
        oracle.mark(key);
    });
}

fn sorted(mut keys: Vec<JobKey>) -> Vec<JobKey> {
    keys.sort();
    keys
}

#[tokio::test]
async fn pipeline_runs_to_completion_in_dependency_order() -> TestResult {
    init_tracing();

    let graph = build_graph(&pipeline_steps(), &samples(&["S1", "S2", "S3"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone());

    let summary = with_timeout(
        runtime(graph.clone(), queue.clone(), oracle.clone(), fast_settings(100)).run(),
    )
    .await?;

    assert_eq!(summary.total_jobs, 8);
    assert_eq!(summary.already_complete, 0);
    assert_eq!(summary.submitted, 8);
    assert_eq!(summary.completed, 8);
    assert_eq!(oracle.count(), 8);

    // Every job is submitted once, after all of its parents.
    let submitted = queue.submitted();
    assert_eq!(submitted.len(), 8);
    for (idx, key) in submitted.iter().enumerate() {
        for parent in graph.parents_of(key) {
            let parent_idx = submitted.iter().position(|k| k == parent).unwrap();
            assert!(parent_idx < idx, "{key} submitted before its parent {parent}");
        }
    }
    assert!(queue.cancelled().is_empty());
    Ok(())
}

#[tokio::test]
async fn merge_is_submitted_only_after_every_align_marker() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1", "S2", "S3"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone())
        .with_behaviour(JobKey::single("align", "S1"), Behaviour::FinishAfter(2))
        .with_behaviour(JobKey::single("align", "S2"), Behaviour::FinishAfter(12))
        .with_behaviour(JobKey::single("align", "S3"), Behaviour::FinishAfter(5));

    with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run()).await?;

    let submitted = queue.submitted();
    assert_eq!(submitted.last(), Some(&JobKey::batch("merge")));
    // The merge submission saw all three align markers.
    assert_eq!(queue.marked_at_submit().last(), Some(&3));
    Ok(())
}

#[tokio::test]
async fn existing_markers_are_never_resubmitted() -> TestResult {
    init_tracing();

    let graph = build_graph(&pipeline_steps(), &samples(&["S1", "S2"]));
    let done = vec![
        JobKey::single("align", "S1"),
        JobKey::single("align", "S2"),
        JobKey::single("sort", "S1"),
    ];
    let oracle = MemoryOracle::with_complete(done.clone());
    let queue = FakeQueue::new(oracle.clone());

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run()).await?;

    assert_eq!(summary.already_complete, 3);
    assert_eq!(summary.submitted, 3);
    let submitted = queue.submitted();
    for key in &done {
        assert!(!submitted.contains(key), "{key} was resubmitted");
    }
    assert_eq!(
        submitted,
        vec![
            JobKey::single("sort", "S2"),
            JobKey::batch("merge"),
            JobKey::batch("report"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn fully_complete_work_dir_submits_nothing() -> TestResult {
    init_tracing();

    let graph = build_graph(&pipeline_steps(), &samples(&["S1"]));
    let oracle = MemoryOracle::with_complete(graph.keys().cloned().collect::<Vec<_>>());
    let queue = FakeQueue::new(oracle.clone());

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run()).await?;

    assert_eq!(summary.already_complete, 4);
    assert_eq!(summary.submitted, 0);
    assert!(queue.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn ceiling_of_one_defers_the_second_root() -> TestResult {
    init_tracing();

    let steps = StepTableBuilder::new().single("align", &[]).build();
    let graph = build_graph(&steps, &samples(&["S1", "S2"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::FinishAfter(3));

    with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(1)).run()).await?;

    assert_eq!(
        queue.submitted(),
        vec![JobKey::single("align", "S1"), JobKey::single("align", "S2")]
    );
    // S2 only went in once S1 had left the queue.
    assert_eq!(queue.listed_at_submit(), vec![0, 0]);
    Ok(())
}

#[tokio::test]
async fn submissions_never_exceed_the_ceiling() -> TestResult {
    init_tracing();

    let ids = ["S1", "S2", "S3", "S4", "S5", "S6"];
    let graph = build_graph(&pipeline_steps(), &samples(&ids));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::FinishAfter(4));

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(2)).run()).await?;

    assert_eq!(summary.submitted, 14);
    let listed = queue.listed_at_submit();
    assert_eq!(listed.len(), 14);
    assert!(listed.iter().all(|&n| n < 2), "listed at submit: {listed:?}");
    Ok(())
}

#[tokio::test]
async fn vanished_job_cancels_every_other_in_flight_job_once() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1", "S2", "S3"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone())
        .with_default(Behaviour::Hold)
        .with_behaviour(JobKey::single("align", "S2"), Behaviour::Vanish);

    let err = with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run())
        .await
        .unwrap_err();

    match err {
        BatchdagError::JobFailure { job } => assert_eq!(job, "align[S2]"),
        other => panic!("expected JobFailure, got {other:?}"),
    }
    assert_eq!(
        sorted(queue.cancelled()),
        vec![JobKey::single("align", "S1"), JobKey::single("align", "S3")]
    );
    assert!(!queue.submitted().contains(&JobKey::batch("merge")));
    Ok(())
}

#[tokio::test]
async fn marker_written_during_confirmation_is_not_a_failure() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone())
        .with_behaviour(JobKey::single("align", "S1"), Behaviour::Race);

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run()).await?;

    assert_eq!(summary.submitted, 2);
    assert!(queue.cancelled().is_empty());
    Ok(())
}

#[tokio::test]
async fn submission_failure_aborts_and_cancels_in_flight_jobs() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1", "S2"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone())
        .with_default(Behaviour::Hold)
        .fail_submission_of(JobKey::single("align", "S2"));

    let err = with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run())
        .await
        .unwrap_err();

    match err {
        BatchdagError::SubmissionError { job, .. } => assert_eq!(job, "align[S2]"),
        other => panic!("expected SubmissionError, got {other:?}"),
    }
    assert_eq!(queue.cancelled(), vec![JobKey::single("align", "S1")]);
    Ok(())
}

#[tokio::test]
async fn depth_query_failure_is_fatal() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone());
    queue.fail_depth_queries(true);

    let err = with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run())
        .await
        .unwrap_err();

    match err {
        BatchdagError::QueueQueryError { job, reason } => {
            assert_eq!(job, "align[S1]");
            assert!(reason.contains("connection refused"), "{reason}");
        }
        other => panic!("expected QueueQueryError, got {other:?}"),
    }
    assert!(queue.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn status_query_errors_are_retried() -> TestResult {
    init_tracing();

    let steps = StepTableBuilder::new().single("align", &[]).build();
    let graph = build_graph(&steps, &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone())
        .with_default(Behaviour::FinishAfter(6))
        .fail_status_queries(3);

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle, fast_settings(100)).run()).await?;

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.completed, 1);
    Ok(())
}

#[tokio::test]
async fn late_parent_does_not_complete_a_finished_child_twice() -> TestResult {
    init_tracing();

    // d -> b, and c needs both a and b. b's marker predates the run, but b
    // only enters the frontier once d finishes, long after c.
    let steps = StepTableBuilder::new()
        .batch("d", &[])
        .batch("b", &["d"])
        .batch("a", &[])
        .batch("c", &["a", "b"])
        .build();
    let graph = build_graph(&steps, &samples(&[]));
    let oracle = MemoryOracle::with_complete(vec![JobKey::batch("b")]);
    let queue = FakeQueue::new(oracle.clone())
        .with_default(Behaviour::FinishAfter(1))
        .with_behaviour(JobKey::batch("d"), Behaviour::FinishAfter(30));

    let summary =
        with_timeout(runtime(graph, queue.clone(), oracle.clone(), fast_settings(100)).run())
            .await?;

    assert_eq!(summary.total_jobs, 4);
    assert_eq!(summary.already_complete, 1);
    assert_eq!(summary.submitted, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(
        sorted(queue.submitted()),
        vec![JobKey::batch("a"), JobKey::batch("c"), JobKey::batch("d")]
    );
    assert_eq!(oracle.count(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn idle_rounds_each_wait_one_poll_interval() -> TestResult {
    init_tracing();

    let steps = StepTableBuilder::new().single("align", &[]).build();
    let graph = build_graph(&steps, &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::Hold);
    mark_later(&oracle, JobKey::single("align", "S1"), Duration::from_secs(150));

    let start = Instant::now();
    let summary = runtime(graph, queue.clone(), oracle, slow_settings()).run().await?;

    // Rounds at 0s, 60s, 120s find nothing new; the one at 180s sees the marker.
    assert_eq!(start.elapsed(), Duration::from_secs(180));
    assert_eq!(summary.rounds, 4);
    assert_eq!(summary.completed, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn round_that_readies_a_child_does_not_sleep() -> TestResult {
    init_tracing();

    let graph = build_graph(&align_merge(), &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::Hold);
    mark_later(&oracle, JobKey::single("align", "S1"), Duration::from_secs(150));
    mark_later(&oracle, JobKey::batch("merge"), Duration::from_secs(200));

    let start = Instant::now();
    let summary = runtime(graph, queue.clone(), oracle, slow_settings()).run().await?;

    // align completes at 180s and merge is submitted in the very next round,
    // still at 180s; one poll later its marker is there.
    assert_eq!(
        queue.submitted(),
        vec![JobKey::single("align", "S1"), JobKey::batch("merge")]
    );
    assert_eq!(start.elapsed(), Duration::from_secs(240));
    assert_eq!(summary.rounds, 6);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn vanished_job_fails_only_after_the_confirmation_delay() -> TestResult {
    init_tracing();

    let steps = StepTableBuilder::new().single("align", &[]).build();
    let graph = build_graph(&steps, &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::Vanish);

    let start = Instant::now();
    let err = runtime(graph, queue.clone(), oracle, slow_settings())
        .run()
        .await
        .unwrap_err();

    // Submitted at 0s, seen gone at 60s, declared failed 45s later.
    assert!(matches!(err, BatchdagError::JobFailure { .. }), "{err:?}");
    assert_eq!(start.elapsed(), Duration::from_secs(105));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn marker_written_within_the_confirmation_delay_counts() -> TestResult {
    init_tracing();

    let steps = StepTableBuilder::new().single("align", &[]).build();
    let graph = build_graph(&steps, &samples(&["S1"]));
    let oracle = MemoryOracle::new();
    let queue = FakeQueue::new(oracle.clone()).with_default(Behaviour::Vanish);
    mark_later(&oracle, JobKey::single("align", "S1"), Duration::from_secs(100));

    let start = Instant::now();
    let summary = runtime(graph, queue.clone(), oracle, slow_settings()).run().await?;

    assert_eq!(start.elapsed(), Duration::from_secs(105));
    assert_eq!(summary.completed, 1);
    assert!(queue.cancelled().is_empty());
    Ok(())
}
