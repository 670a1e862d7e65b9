// src/scripts.rs

//! Job script generation.
//!
//! Every job gets a small wrapper script that calls the pipeline's step
//! implementation at `<pipeline_root>/script/<step>.sh`:
//!
//! ```text
//! #!/bin/bash
//! sh /pipe/script/align.sh /work /pipe S1 reads_1.fq reads_2.fq
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{SampleDef, SampleTable, ScriptsSection, StepDef, StepTable};
use crate::dag::JobKey;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::layout::JobLayout;
use crate::queue::shell::shell_quote;
use crate::types::StepType;

/// Directory under the pipeline root holding per-step implementations.
pub const STEP_SCRIPT_DIR: &str = "script";

#[derive(Debug)]
pub struct ScriptWriter<F: FileSystem = RealFileSystem> {
    fs: F,
    layout: JobLayout,
    pipeline_root: PathBuf,
    interpreter: String,
    touch_marker: bool,
}

impl<F: FileSystem> ScriptWriter<F> {
    pub fn new(
        fs: F,
        layout: JobLayout,
        pipeline_root: impl Into<PathBuf>,
        options: &ScriptsSection,
    ) -> Self {
        Self {
            fs,
            layout,
            pipeline_root: pipeline_root.into(),
            interpreter: options.interpreter.clone(),
            touch_marker: options.touch_marker,
        }
    }

    /// Path of the pipeline's implementation of `step`.
    pub fn step_impl_path(&self, step: &str) -> PathBuf {
        self.pipeline_root
            .join(STEP_SCRIPT_DIR)
            .join(format!("{step}.sh"))
    }

    /// Script body for one job. `sample` is `None` for batch steps.
    pub fn render(&self, step: &StepDef, sample: Option<&SampleDef>) -> String {
        let key = match sample {
            Some(s) => JobKey::single(step.name.as_str(), s.id.as_str()),
            None => JobKey::batch(step.name.as_str()),
        };

        let mut args = vec![
            shell_quote(&self.step_impl_path(&step.name).to_string_lossy()),
            quote_path(self.layout.work_dir()),
            quote_path(&self.pipeline_root),
        ];
        if let Some(sample) = sample {
            args.push(shell_quote(&sample.id));
            // Root steps are the ones that read raw sample inputs.
            if step.is_root() {
                args.extend(sample.fields.values().map(|v| shell_quote(v)));
            }
        }

        let mut body = String::from("#!/bin/bash\n");
        if self.touch_marker {
            body.push_str("set -e\n");
        }
        body.push_str(&self.interpreter);
        for arg in &args {
            body.push(' ');
            body.push_str(arg);
        }
        body.push('\n');
        if self.touch_marker {
            body.push_str("touch ");
            body.push_str(&quote_path(&self.layout.marker_path(&key)));
            body.push('\n');
        }
        body
    }

    /// Write one script per job. Returns the number of scripts written.
    pub fn write_all(&self, steps: &StepTable, samples: &SampleTable) -> Result<usize> {
        let mut written = 0;

        for step in steps.iter() {
            match step.step_type {
                StepType::Single => {
                    for sample in samples.iter() {
                        let key = JobKey::single(step.name.as_str(), sample.id.as_str());
                        self.write_one(&key, &self.render(step, Some(sample)))?;
                        written += 1;
                    }
                }
                StepType::Batch => {
                    let key = JobKey::batch(step.name.as_str());
                    self.write_one(&key, &self.render(step, None))?;
                    written += 1;
                }
            }
        }

        info!(
            scripts = written,
            work_dir = %self.layout.work_dir().display(),
            "job scripts written"
        );
        Ok(written)
    }

    fn write_one(&self, key: &JobKey, body: &str) -> Result<()> {
        let path = self.layout.script_path(key);
        debug!(job = %key, path = %path.display(), "writing job script");
        self.fs.write(&path, body.as_bytes())?;
        Ok(())
    }
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn step(name: &str, parents: &[&str]) -> StepDef {
        StepDef {
            name: name.to_string(),
            step_type: StepType::Single,
            parents: parents.iter().map(|p| p.to_string()).collect(),
            resources: String::new(),
        }
    }

    fn sample() -> SampleDef {
        let mut fields = IndexMap::new();
        fields.insert("fq1".to_string(), "/data/S1_1.fq".to_string());
        fields.insert("fq2".to_string(), "/data/S1_2.fq".to_string());
        SampleDef {
            id: "S1".to_string(),
            fields,
        }
    }

    fn writer(touch_marker: bool) -> ScriptWriter<crate::fs::mock::MockFileSystem> {
        let options = ScriptsSection {
            interpreter: "sh".to_string(),
            touch_marker,
        };
        ScriptWriter::new(
            crate::fs::mock::MockFileSystem::new(),
            JobLayout::new("/w"),
            "/pipe",
            &options,
        )
    }

    #[test]
    fn root_single_step_receives_sample_fields() {
        let body = writer(false).render(&step("align", &[]), Some(&sample()));
        assert_eq!(
            body,
            "#!/bin/bash\nsh /pipe/script/align.sh /w /pipe S1 /data/S1_1.fq /data/S1_2.fq\n"
        );
    }

    #[test]
    fn non_root_single_step_receives_only_the_sample_id() {
        let body = writer(false).render(&step("sort", &["align"]), Some(&sample()));
        assert_eq!(body, "#!/bin/bash\nsh /pipe/script/sort.sh /w /pipe S1\n");
    }

    #[test]
    fn touch_marker_wraps_the_call() {
        let body = writer(true).render(&step("sort", &["align"]), Some(&sample()));
        assert!(body.starts_with("#!/bin/bash\nset -e\n"));
        assert!(body.ends_with("touch /w/S1/shell/sort.sh.complete\n"));
    }
}
