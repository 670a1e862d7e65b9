#![allow(dead_code)]

pub use batchdag_test_utils::builders::{SampleTableBuilder, StepTableBuilder};
pub use batchdag_test_utils::{
    fast_settings, init_tracing, with_timeout, Behaviour, FakeQueue, MemoryOracle, QueueEvent,
};

use batchdag::config::{SampleTable, SchedulerSettings, StepTable};
use batchdag::dag::JobGraph;
use batchdag::engine::{RunContext, Runtime};
use batchdag::layout::JobLayout;

/// align (single) → sort (single) → merge (batch) → report (batch)
pub fn pipeline_steps() -> StepTable {
    StepTableBuilder::new()
        .single("align", &[])
        .single("sort", &["align"])
        .batch("merge", &["sort"])
        .batch("report", &["merge"])
        .build()
}

pub fn samples(ids: &[&str]) -> SampleTable {
    SampleTableBuilder::new().ids(ids).build()
}

pub fn build_graph(steps: &StepTable, samples: &SampleTable) -> JobGraph {
    JobGraph::build(steps, samples).expect("graph should build")
}

pub fn runtime(
    graph: JobGraph,
    queue: FakeQueue,
    oracle: MemoryOracle,
    settings: SchedulerSettings,
) -> Runtime<FakeQueue, MemoryOracle> {
    let ctx = RunContext::new(JobLayout::new("/w"), settings);
    Runtime::new(ctx, graph, queue, oracle)
}
