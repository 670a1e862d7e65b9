// src/queue/sge.rs

//! Sun-Grid-Engine style backend (`qsub` / `qstat` / `qdel`).

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::model::QueueSection;
use crate::dag::QueueHandle;
use crate::errors::{BatchdagError, Result};
use crate::queue::backend::{BoxFuture, QueueBackend, SubmitRequest};
use crate::queue::shell::{run_command, shell_quote};

/// `qsub` prints `Your job 12345 ("name") has been submitted`.
static JOB_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Your job (\d+) ").expect("job id regex is valid")
});

#[derive(Debug, Clone)]
pub struct SgeQueue {
    submit_cmd: String,
    status_cmd: String,
    cancel_cmd: String,
    /// Resolved on first use when not configured.
    user: Option<String>,
}

impl SgeQueue {
    pub fn new(section: &QueueSection) -> Self {
        Self {
            submit_cmd: section.submit_cmd.clone(),
            status_cmd: section.status_cmd.clone(),
            cancel_cmd: section.cancel_cmd.clone(),
            user: section.user.clone(),
        }
    }

    async fn user(&mut self) -> Result<String> {
        if let Some(user) = &self.user {
            return Ok(user.clone());
        }

        let user = match std::env::var("USER") {
            Ok(user) if !user.trim().is_empty() => user.trim().to_string(),
            _ => {
                let out = run_command("whoami").await?;
                if !out.success || out.stdout.trim().is_empty() {
                    return Err(BatchdagError::QueueCommand(format!(
                        "could not determine user name: {}",
                        out.describe()
                    )));
                }
                out.stdout.trim().to_string()
            }
        };

        info!(%user, "counting queue depth for user");
        self.user = Some(user.clone());
        Ok(user)
    }

    async fn status_listing(&self) -> Result<String> {
        let out = run_command(&self.status_cmd).await?;
        if !out.success {
            return Err(BatchdagError::QueueCommand(format!(
                "'{}' failed with {}",
                self.status_cmd,
                out.describe()
            )));
        }
        Ok(out.stdout)
    }

    fn submit_line(&self, request: &SubmitRequest) -> String {
        let mut line = format!(
            "{} -wd {}",
            self.submit_cmd,
            shell_quote(&request.work_dir.to_string_lossy())
        );
        if !request.resources.trim().is_empty() {
            line.push(' ');
            line.push_str(request.resources.trim());
        }
        line.push(' ');
        line.push_str(&shell_quote(&request.script.to_string_lossy()));
        line
    }
}

impl QueueBackend for SgeQueue {
    fn depth(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let user = self.user().await?;
            let listing = self.status_listing().await?;
            let depth = count_user_jobs(&listing, &user);
            debug!(depth, %user, "queue depth");
            Ok(depth)
        })
    }

    fn submit(&mut self, request: SubmitRequest) -> BoxFuture<'_, Result<QueueHandle>> {
        Box::pin(async move {
            let line = self.submit_line(&request);
            let out = run_command(&line).await?;
            if !out.success {
                return Err(BatchdagError::QueueCommand(format!(
                    "'{line}' failed with {}",
                    out.describe()
                )));
            }
            parse_job_id(&out.stdout).ok_or_else(|| {
                BatchdagError::QueueCommand(format!(
                    "no job id in submission output: {}",
                    out.stdout.trim()
                ))
            })
        })
    }

    fn is_alive<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let listing = self.status_listing().await?;
            Ok(lists_job(&listing, handle))
        })
    }

    fn cancel<'a>(&'a mut self, handle: &'a QueueHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let line = format!("{} {}", self.cancel_cmd, handle);
            let out = run_command(&line).await?;
            if !out.success {
                return Err(BatchdagError::QueueCommand(format!(
                    "'{line}' failed with {}",
                    out.describe()
                )));
            }
            Ok(())
        })
    }
}

pub(crate) fn parse_job_id(output: &str) -> Option<QueueHandle> {
    JOB_ID_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| QueueHandle::new(m.as_str()))
}

/// Lines of a status listing that mention `user` as a column.
pub(crate) fn count_user_jobs(listing: &str, user: &str) -> usize {
    listing
        .lines()
        .filter(|line| line.split_whitespace().any(|field| field == user))
        .count()
}

/// Whether a status listing has a row whose first column is the job id.
pub(crate) fn lists_job(listing: &str, handle: &QueueHandle) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().next() == Some(handle.as_str()))
}
