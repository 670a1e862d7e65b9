// src/config/validate.rs

use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{
    RawSchedulerSection, RawSettings, SampleTable, SchedulerSettings, Settings, StepTable,
};
use crate::errors::{BatchdagError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = BatchdagError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        let scheduler = validate_scheduler_section(&raw.scheduler)?;

        if raw.queue.local_slots == 0 {
            return Err(BatchdagError::ConfigError(
                "[queue].local_slots must be >= 1 (got 0)".to_string(),
            ));
        }
        for (field, value) in [
            ("submit_cmd", &raw.queue.submit_cmd),
            ("status_cmd", &raw.queue.status_cmd),
            ("cancel_cmd", &raw.queue.cancel_cmd),
        ] {
            if value.trim().is_empty() {
                return Err(BatchdagError::ConfigError(format!(
                    "[queue].{field} must not be empty"
                )));
            }
        }
        if raw.scripts.interpreter.trim().is_empty() {
            return Err(BatchdagError::ConfigError(
                "[scripts].interpreter must not be empty".to_string(),
            ));
        }

        Ok(Settings {
            scheduler,
            queue: raw.queue,
            scripts: raw.scripts,
        })
    }
}

fn validate_scheduler_section(raw: &RawSchedulerSection) -> Result<SchedulerSettings> {
    if raw.max_queued_jobs == 0 {
        return Err(BatchdagError::ConfigError(
            "[scheduler].max_queued_jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    let field = |name: &str, value: &str| -> Result<Duration> {
        parse_duration(value)
            .map_err(|e| BatchdagError::ConfigError(format!("[scheduler].{name}: {e}")))
    };

    Ok(SchedulerSettings {
        max_queued_jobs: raw.max_queued_jobs,
        throttle_interval: field("throttle_interval", &raw.throttle_interval)?,
        poll_interval: field("poll_interval", &raw.poll_interval)?,
        failure_confirm_delay: field("failure_confirm_delay", &raw.failure_confirm_delay)?,
    })
}

/// Parse a duration string like `"500ms"`, `"60s"`, `"10m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

/// Check both tables before anything is written or submitted.
pub fn validate_tables(steps: &StepTable, samples: &SampleTable) -> Result<()> {
    ensure_has_steps(steps)?;
    validate_names(steps, samples)?;
    validate_step_dependencies(steps)?;
    validate_step_dag(steps)?;
    Ok(())
}

fn ensure_has_steps(steps: &StepTable) -> Result<()> {
    if steps.is_empty() {
        return Err(BatchdagError::ConfigError(
            "step table must contain at least one step".to_string(),
        ));
    }
    Ok(())
}

/// Step names and sample IDs become path components of job scripts.
fn validate_names(steps: &StepTable, samples: &SampleTable) -> Result<()> {
    for name in steps.steps.keys() {
        ensure_path_component("step name", name)?;
    }
    for id in samples.ids() {
        ensure_path_component("sampleID", id)?;
    }
    Ok(())
}

fn ensure_path_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(BatchdagError::ConfigError(format!(
            "{what} '{value}' is not usable as a directory or file name"
        )));
    }
    Ok(())
}

fn validate_step_dependencies(steps: &StepTable) -> Result<()> {
    for step in steps.iter() {
        for parent in step.parents.iter() {
            if steps.get(parent).is_none() {
                return Err(BatchdagError::UnknownParentStep {
                    step: step.name.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_step_dag(steps: &StepTable) -> Result<()> {
    // Edge direction: parent -> step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in steps.steps.keys() {
        graph.add_node(name.as_str());
    }

    for step in steps.iter() {
        for parent in step.parents.iter() {
            graph.add_edge(parent.as_str(), step.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BatchdagError::CyclicDependency(format!(
            "cycle in step table involving step '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::StepDef;
    use crate::types::StepType;

    fn table(rows: &[(&str, &[&str])]) -> StepTable {
        let mut steps = StepTable::default();
        for (name, parents) in rows {
            steps.steps.insert(
                name.to_string(),
                StepDef {
                    name: name.to_string(),
                    step_type: StepType::Single,
                    parents: parents.iter().map(|p| p.to_string()).collect(),
                    resources: String::new(),
                },
            );
        }
        steps
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("60s"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration(" 10m "), Ok(Duration::from_secs(600)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert!(parse_duration("60").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("999999999999999999h").is_err());
        assert!(parse_duration("9999999999999999999m").is_err());
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let mut raw = RawSettings::default();
        raw.scheduler.max_queued_jobs = 0;
        let err = Settings::try_from(raw).unwrap_err();
        assert!(matches!(err, BatchdagError::ConfigError(msg) if msg.contains("max_queued_jobs")));
    }

    #[test]
    fn default_settings_match_cluster_defaults() {
        let settings = Settings::try_from(RawSettings::default()).unwrap();
        assert_eq!(settings.scheduler, SchedulerSettings::default());
        assert_eq!(settings.scheduler.max_queued_jobs, 4000);
        assert_eq!(settings.scheduler.throttle_interval, Duration::from_secs(600));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let steps = table(&[("a", &["a"])]);
        let err = validate_step_dag(&steps).unwrap_err();
        assert!(matches!(err, BatchdagError::CyclicDependency(_)));
    }

    #[test]
    fn unknown_parent_is_reported_with_both_names() {
        let steps = table(&[("a", &[]), ("b", &["ghost"])]);
        match validate_step_dependencies(&steps) {
            Err(BatchdagError::UnknownParentStep { step, parent }) => {
                assert_eq!(step, "b");
                assert_eq!(parent, "ghost");
            }
            other => panic!("expected UnknownParentStep, got {other:?}"),
        }
    }

    #[test]
    fn sample_ids_must_be_path_components() {
        let steps = table(&[("a", &[])]);
        let mut samples = SampleTable::default();
        samples.samples.insert(
            "../escape".to_string(),
            crate::config::model::SampleDef {
                id: "../escape".to_string(),
                fields: Default::default(),
            },
        );
        assert!(matches!(
            validate_tables(&steps, &samples),
            Err(BatchdagError::ConfigError(_))
        ));
    }
}
