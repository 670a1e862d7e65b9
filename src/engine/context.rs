// src/engine/context.rs

use tracing::{info_span, Span};

use crate::config::model::SchedulerSettings;
use crate::layout::JobLayout;

/// State scoped to one orchestration run.
///
/// Passed explicitly to the runtime; its span tags every log line emitted
/// while the run is driven.
#[derive(Debug, Clone)]
pub struct RunContext {
    layout: JobLayout,
    settings: SchedulerSettings,
    span: Span,
}

impl RunContext {
    pub fn new(layout: JobLayout, settings: SchedulerSettings) -> Self {
        let span = info_span!("run", work_dir = %layout.work_dir().display());
        Self {
            layout,
            settings,
            span,
        }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
