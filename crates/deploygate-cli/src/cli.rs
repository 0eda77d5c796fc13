use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deploygate_core::{evaluate, evaluate_cli_output, render_summary, Verdict};
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::archive::{default_run_id, Archive};
use crate::config::{GateConfig, OutputFormat, Overrides};

/// Exit code for a report that could not be evaluated, or any other error.
pub const EXIT_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "deploygate")]
#[command(author, version, about = "Gate CI builds on deployment validation reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decision steps to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a validation report and exit with its verdict
    Evaluate {
        /// Report file; `-` or omitted reads stdin
        report: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Archive the raw report, summary and verdict here
        #[arg(long)]
        archive_dir: Option<PathBuf>,

        /// Identifier for archived artifacts
        #[arg(long, env = "BUILD_NUMBER")]
        run_id: Option<String>,

        /// Accept raw CLI stdout with colour codes and warnings
        #[arg(long, default_value_t = false)]
        strip_noise: bool,

        /// Maximum failures listed per section of the summary
        #[arg(long)]
        max_listed: Option<NonZeroUsize>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file
    CheckConfig { file: PathBuf },
}

struct EvaluateArgs<'a> {
    report: Option<&'a Path>,
    run_id: Option<&'a str>,
    config: GateConfig,
}

impl Cli {
    fn execute_evaluate(&self, args: EvaluateArgs<'_>) -> Result<u8> {
        let raw = read_report(args.report)?;
        let config = args.config;

        let archive = config.archive.dir.as_ref().map(|dir| {
            let run_id = args
                .run_id
                .map(str::to_owned)
                .unwrap_or_else(|| default_run_id(chrono::Utc::now()));
            Archive::new(dir, &run_id)
        });

        let evaluated = if config.input.strip_noise {
            evaluate_cli_output(&String::from_utf8_lossy(&raw))
        } else {
            evaluate(&raw)
        };

        let verdict = match evaluated {
            Ok(verdict) => verdict,
            Err(err) => {
                if let Some(archive) = &archive {
                    archive.store_malformed(&raw, &err)?;
                }
                return Err(err).context("validation report could not be evaluated");
            }
        };

        println!(
            "{}",
            render(&verdict, config.output.format, config.output.max_listed_failures)?
        );

        if let Some(archive) = &archive {
            archive.store(&raw, &verdict, config.output.max_listed_failures)?;
        }

        info!(outcome = %verdict.outcome, "gate decided");
        Ok(verdict.exit_code())
    }

    fn execute_check_config(&self, file: &Path) -> Result<u8> {
        GateConfig::from_yaml_file(file)
            .with_context(|| format!("Invalid configuration in {}", file.display()))?;
        println!("{}: configuration is valid", file.display());
        Ok(deploygate_core::EXIT_OK)
    }

    /// Run the selected command and return the process exit code.
    pub fn execute(&self) -> Result<u8> {
        match &self.command {
            Commands::Evaluate {
                report,
                format,
                archive_dir,
                run_id,
                strip_noise,
                max_listed,
                config,
            } => {
                let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
                let config = GateConfig::load(config.as_deref(), &cwd)
                    .context("Failed to load configuration")?
                    .with_overrides(Overrides {
                        format: *format,
                        max_listed_failures: max_listed.map(NonZeroUsize::get),
                        strip_noise: *strip_noise,
                        archive_dir: archive_dir.clone(),
                    });

                self.execute_evaluate(EvaluateArgs {
                    report: report.as_deref(),
                    run_id: run_id.as_deref(),
                    config,
                })
            }
            Commands::CheckConfig { file } => self.execute_check_config(file),
        }
    }
}

fn read_report(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            std::fs::read(path).with_context(|| format!("Failed to read report {}", path.display()))
        }
        _ => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("Failed to read report from stdin")?;
            Ok(raw)
        }
    }
}

fn render(verdict: &Verdict, format: OutputFormat, max_listed: usize) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_summary(verdict, max_listed),
        OutputFormat::Json => serde_json::to_string_pretty(verdict)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn run(args: &[&str]) -> Result<u8> {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.execute()
    }

    fn write_report(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_passed_report_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(dir.path(), "ok.json", r#"{"result": {"success": true, "details": {}}}"#);

        let code = run(&["deploygate", "evaluate", report.to_str().unwrap()]).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_skipped_report_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(dir.path(), "skip.json", r#"{"skipped": true}"#);

        let code = run(&["deploygate", "evaluate", report.to_str().unwrap()]).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_failed_report_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(dir.path(), "fail.json", r#"{"status": 1, "message": "auth error"}"#);

        let code = run(&["deploygate", "evaluate", report.to_str().unwrap(), "--format", "json"]).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn test_malformed_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(dir.path(), "bad.json", "not json");

        let err = run(&["deploygate", "evaluate", report.to_str().unwrap()]).unwrap_err();
        assert!(err.downcast_ref::<deploygate_core::MalformedReportError>().is_some());
    }

    #[test]
    fn test_noisy_report_needs_strip_noise() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(
            dir.path(),
            "noisy.json",
            "Warning: update available\n{\"result\": {\"success\": true, \"details\": {}}}\n",
        );
        let path = report.to_str().unwrap();

        assert!(run(&["deploygate", "evaluate", path]).is_err());
        assert_eq!(run(&["deploygate", "evaluate", path, "--strip-noise"]).unwrap(), 0);
    }

    #[test]
    fn test_archive_written_for_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(
            dir.path(),
            "fail.json",
            r#"{"result": {"success": false, "details": {"componentFailures": {"fileName": "Foo.cls", "problem": "Missing field"}}}}"#,
        );
        let archive_dir = dir.path().join("artifacts");

        let code = run(&[
            "deploygate",
            "evaluate",
            report.to_str().unwrap(),
            "--archive-dir",
            archive_dir.to_str().unwrap(),
            "--run-id",
            "99",
        ])
        .unwrap();

        assert_eq!(code, 1);
        let summary = fs::read_to_string(archive_dir.join("validation-summary-99.txt")).unwrap();
        assert!(summary.contains("Foo.cls: Missing field"));
        assert!(archive_dir.join("validation-report-99.json").exists());
        assert!(archive_dir.join("validation-verdict-99.json").exists());
    }

    #[test]
    fn test_archive_written_for_malformed_run() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_report(dir.path(), "bad.json", "{\"result\": ");
        let archive_dir = dir.path().join("artifacts");

        let result = run(&[
            "deploygate",
            "evaluate",
            report.to_str().unwrap(),
            "--archive-dir",
            archive_dir.to_str().unwrap(),
            "--run-id",
            "5",
        ]);

        assert!(result.is_err());
        assert!(archive_dir.join("validation-report-5.json").exists());
        assert!(archive_dir.join("validation-summary-5.txt").exists());
    }

    #[test]
    fn test_max_listed_must_be_positive() {
        assert!(Cli::try_parse_from(["deploygate", "evaluate", "r.json", "--max-listed", "0"]).is_err());
        assert!(Cli::try_parse_from(["deploygate", "evaluate", "r.json", "--max-listed", "1"]).is_ok());
    }

    #[test]
    fn test_check_config() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_report(dir.path(), "good.yaml", "output:\n  format: json\n");
        let bad = write_report(dir.path(), "bad.yaml", "output:\n  colour: red\n");

        assert_eq!(run(&["deploygate", "check-config", good.to_str().unwrap()]).unwrap(), 0);
        assert!(run(&["deploygate", "check-config", bad.to_str().unwrap()]).is_err());
    }
}
