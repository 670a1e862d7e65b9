// tests/graph_expansion.rs

mod common;
use crate::common::{build_graph, pipeline_steps, samples, SampleTableBuilder, StepTableBuilder};

use batchdag::dag::{JobGraph, JobKey, JobState, Scheduler};
use batchdag::errors::BatchdagError;
use batchdag_test_utils::MemoryOracle;

#[test]
fn align_merge_scenario() {
    let steps = StepTableBuilder::new()
        .single("align", &[])
        .batch("merge", &["align"])
        .build();
    let graph = build_graph(&steps, &samples(&["S1", "S2", "S3"]));

    assert_eq!(graph.len(), 4);
    assert_eq!(
        graph.roots(),
        vec![
            JobKey::single("align", "S1"),
            JobKey::single("align", "S2"),
            JobKey::single("align", "S3"),
        ]
    );

    let merge = JobKey::batch("merge");
    assert_eq!(graph.parents_of(&merge).len(), 3);

    // merge is Ready only once all three aligns are complete.
    let mut scheduler = Scheduler::new(graph, &MemoryOracle::new());
    assert_eq!(scheduler.state_of(&merge), Some(JobState::Waiting));

    assert!(scheduler.mark_complete(&JobKey::single("align", "S1")).is_empty());
    assert!(scheduler.mark_complete(&JobKey::single("align", "S2")).is_empty());
    assert_eq!(scheduler.state_of(&merge), Some(JobState::Waiting));

    let ready = scheduler.mark_complete(&JobKey::single("align", "S3"));
    assert_eq!(ready, vec![merge.clone()]);
    assert_eq!(scheduler.state_of(&merge), Some(JobState::Ready));
}

#[test]
fn edge_count_per_parent_kind() {
    let n = 4;
    let ids = ["A", "B", "C", "D"];
    let table = samples(&ids);

    let cases = [
        ("single", "single", n),
        ("single", "batch", n),
        ("batch", "single", n),
        ("batch", "batch", 1),
    ];

    for (child, parent, expected) in cases {
        let steps = StepTableBuilder::new()
            .step("p", parent.parse().unwrap(), &[], "")
            .step("c", child.parse().unwrap(), &["p"], "")
            .build();
        let graph = build_graph(&steps, &table);
        assert_eq!(
            graph.edge_count(),
            expected,
            "{child} <- {parent} should produce {expected} edges"
        );
    }
}

#[test]
fn single_child_of_batch_parent_fans_out() {
    let steps = StepTableBuilder::new()
        .batch("index", &[])
        .single("call", &["index"])
        .build();
    let graph = build_graph(&steps, &samples(&["S1", "S2"]));

    let children: Vec<_> = graph.children_of(&JobKey::batch("index")).into_iter().cloned().collect();
    assert_eq!(
        children,
        vec![JobKey::single("call", "S1"), JobKey::single("call", "S2")]
    );
}

#[test]
fn unknown_parent_is_rejected() {
    let steps = StepTableBuilder::new()
        .single("align", &[])
        .single("sort", &["algn"])
        .build();
    let err = JobGraph::build(&steps, &samples(&["S1"])).unwrap_err();
    match err {
        BatchdagError::UnknownParentStep { step, parent } => {
            assert_eq!(step, "sort");
            assert_eq!(parent, "algn");
        }
        other => panic!("expected UnknownParentStep, got {other:?}"),
    }
}

#[test]
fn step_cycle_is_rejected() {
    let steps = StepTableBuilder::new()
        .single("a", &["c"])
        .single("b", &["a"])
        .single("c", &["b"])
        .build();
    let err = JobGraph::build(&steps, &samples(&["S1"])).unwrap_err();
    assert!(matches!(err, BatchdagError::CyclicDependency(_)), "{err:?}");
}

#[test]
fn batch_self_parent_is_a_cycle() {
    let steps = StepTableBuilder::new().batch("merge", &["merge"]).build();
    let err = JobGraph::build(&steps, &samples(&[])).unwrap_err();
    assert!(matches!(err, BatchdagError::CyclicDependency(_)), "{err:?}");
}

#[test]
fn building_twice_yields_the_same_graph() {
    let steps = pipeline_steps();
    let table = samples(&["S1", "S2", "S3"]);
    let a = build_graph(&steps, &table);
    let b = build_graph(&steps, &table);

    let keys_a: Vec<_> = a.keys().cloned().collect();
    let keys_b: Vec<_> = b.keys().cloned().collect();
    assert_eq!(keys_a, keys_b);
    for key in keys_a {
        assert_eq!(a.parents_of(&key), b.parents_of(&key));
        assert_eq!(a.children_of(&key), b.children_of(&key));
    }
}

#[test]
fn children_are_the_transpose_of_parents() {
    let graph = build_graph(&pipeline_steps(), &samples(&["S1", "S2"]));
    for job in graph.jobs() {
        for parent in job.parents.iter() {
            assert!(graph.children_of(parent).contains(&&job.key));
        }
        for child in job.children.iter() {
            assert!(graph.parents_of(child).contains(&&job.key));
        }
    }
}

#[test]
fn empty_sample_table_leaves_only_batch_jobs() {
    let graph = build_graph(&pipeline_steps(), &SampleTableBuilder::new().build());
    let keys: Vec<_> = graph.keys().cloned().collect();
    assert_eq!(keys, vec![JobKey::batch("merge"), JobKey::batch("report")]);
    // merge lost its only (single-type) parents and becomes a root.
    assert_eq!(graph.roots(), vec![JobKey::batch("merge")]);
}
