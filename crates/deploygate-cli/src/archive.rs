//! Per-run build artifacts: the raw report next to its summary and verdict.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use deploygate_core::{render_summary, MalformedReportError, Verdict};
use std::fs;
use std::path::{Path, PathBuf};

/// Run id used when the CI host does not provide one.
pub fn default_run_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Keep run ids usable as file name components.
pub fn sanitize_run_id(run_id: &str) -> String {
    run_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Writes the artifacts of one run into an archive directory.
pub struct Archive {
    dir: PathBuf,
    run_id: String,
}

impl Archive {
    pub fn new(dir: impl Into<PathBuf>, run_id: &str) -> Self {
        Self {
            dir: dir.into(),
            run_id: sanitize_run_id(run_id),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(format!("validation-report-{}.json", self.run_id))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(format!("validation-summary-{}.txt", self.run_id))
    }

    pub fn verdict_path(&self) -> PathBuf {
        self.dir.join(format!("validation-verdict-{}.json", self.run_id))
    }

    /// Store the raw report, the rendered summary and the serialized verdict.
    pub fn store(&self, raw: &[u8], verdict: &Verdict, max_listed: usize) -> Result<()> {
        self.prepare()?;
        write_file(&self.report_path(), raw)?;
        write_file(
            &self.summary_path(),
            render_summary(verdict, max_listed).as_bytes(),
        )?;
        let json = serde_json::to_vec_pretty(verdict)?;
        write_file(&self.verdict_path(), &json)?;

        tracing::info!(dir = %self.dir.display(), run_id = %self.run_id, "validation artifacts archived");
        Ok(())
    }

    /// Store the raw bytes of a report that could not be evaluated.
    pub fn store_malformed(&self, raw: &[u8], error: &MalformedReportError) -> Result<()> {
        self.prepare()?;
        write_file(&self.report_path(), raw)?;
        let summary = format!("FAILED: report could not be evaluated: {}", error);
        write_file(&self.summary_path(), summary.as_bytes())?;

        tracing::info!(dir = %self.dir.display(), run_id = %self.run_id, "malformed report archived");
        Ok(())
    }

    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create archive directory {}", self.dir.display()))
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
