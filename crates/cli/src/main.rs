//! `jira-subtasks` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: `.env` (if present) then the process
//!    environment, into one immutable [`SubmitConfig`].
//! 2. **Wire logging**: a `tracing-subscriber` fmt layer on stderr, pretty or
//!    JSON lines, filtered by `RUST_LOG` (default `info`).
//! 3. **Read the task file** and pick the parent issue from its file name.
//! 4. **Construct infrastructure**: a [`JiraClient`] injected into the
//!    [`SubmissionRunner`].
//! 5. **Report**: tally and created keys on stdout, mapped to the exit code.
//!
//! | Exit code | Meaning |
//! |-----------|---------|
//! | 0 | every record reached `Done` |
//! | 1 | fatal: configuration, input file, or preflight |
//! | 2 | at least one record did not reach `Done` |

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use jira::JiraClient;
use pipeline::{load_task_file, resolve_parent, ParentRule, RunId, SubmitConfig};
use runner::{RunReport, RunSettings, SubmissionRunner};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

/// Create Jira sub-tasks from a task list, log their estimates, and close them.
#[derive(Debug, Parser)]
#[command(name = "jira-subtasks", version, about)]
struct Cli {
    /// Task list: CSV (`.csv`) or YAML/JSON. A file name containing
    /// "maintenance" or "develop" selects the parent issue.
    input: PathBuf,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

const EXIT_ALL_DONE: u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_INCOMPLETE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Real environment values win over .env entries.
    let dotenv = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match usage_exit_status(&e) {
            Some(status) => {
                let _ = e.print();
                return ExitCode::from(status);
            }
            None => e.exit(),
        },
    };
    init_tracing(cli.log_format);

    if let Err(e) = &dotenv {
        if !e.not_found() {
            error!(error = %e, "Could not read .env file");
            return ExitCode::from(EXIT_FATAL);
        }
    }

    let run_id = RunId::new_random();
    let span = info_span!("run", run_id = %run_id);
    let outcome = run(&cli.input).instrument(span).await;
    match &outcome {
        Ok(report) => print_report(report),
        Err(e) => error!(error = %format!("{e:#}"), "Run aborted"),
    }
    ExitCode::from(exit_status(&outcome))
}

/// Exit status for an argument error; `None` for `--help` and `--version`,
/// which clap reports through the same path.
fn usage_exit_status(err: &clap::Error) -> Option<u8> {
    err.use_stderr().then_some(EXIT_FATAL)
}

/// Maps a run outcome to the process exit status.
fn exit_status(outcome: &anyhow::Result<RunReport>) -> u8 {
    match outcome {
        Ok(report) if report.all_done() => EXIT_ALL_DONE,
        Ok(_) => EXIT_INCOMPLETE,
        Err(_) => EXIT_FATAL,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(input: &Path) -> anyhow::Result<RunReport> {
    let config = SubmitConfig::from_env().context("invalid configuration")?;
    submit(&config, input).await
}

async fn submit(config: &SubmitConfig, input: &Path) -> anyhow::Result<RunReport> {
    let records = load_task_file(input)
        .with_context(|| format!("cannot load task file '{}'", input.display()))?;

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("'{}' has no usable file name", input.display()))?;
    let selection = resolve_parent(file_name, &config.parents);
    if selection.rule == ParentRule::Fallback {
        warn!(
            file = file_name,
            "File name names neither maintenance nor develop; using the maintenance parent"
        );
    }
    info!(
        file = file_name,
        parent = %selection.key,
        rule = ?selection.rule,
        records = records.len(),
        "Selected parent issue"
    );

    let client = JiraClient::from_config(config).context("cannot build HTTP client")?;
    let settings = RunSettings::from_config(config, selection.key);
    let report = SubmissionRunner::new(&client, settings)
        .run(&records)
        .await
        .context("preflight failed")?;
    Ok(report)
}

fn print_report(report: &RunReport) {
    println!("Parent: {}", report.parent);
    println!("Result: {}", report.tally());
    let created = report.created_keys();
    if created.is_empty() {
        println!("Created: none");
    } else {
        let keys: Vec<&str> = created.iter().map(|k| k.as_str()).collect();
        println!("Created: {}", keys.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{IssueKey, RecordState, SubtaskResult};

    use super::*;

    fn result(index: usize, state: RecordState) -> SubtaskResult {
        SubtaskResult {
            index,
            summary: format!("task {index}"),
            issue_key: (state != RecordState::FailedAtCreate)
                .then(|| IssueKey::new(format!("BM-{}", 700 + index)).unwrap()),
            logged: matches!(state, RecordState::Done | RecordState::FailedAtTransition),
            transitioned: state == RecordState::Done,
            state,
            error: None,
        }
    }

    fn report(states: &[RecordState]) -> RunReport {
        RunReport {
            parent: IssueKey::new("BM-5610").unwrap(),
            results: states
                .iter()
                .enumerate()
                .map(|(i, s)| result(i, *s))
                .collect(),
        }
    }

    fn config() -> SubmitConfig {
        // Nothing listens on port 1; preflight fails fast.
        SubmitConfig::from_lookup(|name| {
            match name {
                "JIRA_BASE_URL" => Some("http://127.0.0.1:1"),
                "JIRA_TOKEN" => Some("tok"),
                "ASSIGNEE_USERNAME" => Some("r.karimi"),
                "MAINTENANCE_PARENT_ISSUE_KEY" => Some("BM-5610"),
                "DEVELOP_PARENT_ISSUE_KEY" => Some("BM-5612"),
                "SUBMIT_RECORD_DELAY_MS" | "SUBMIT_STEP_DELAY_MS" => Some("0"),
                "JIRA_TIMEOUT_SECS" => Some("2"),
                _ => None,
            }
            .map(str::to_string)
        })
        .unwrap()
    }

    #[test]
    fn test_all_done_exits_zero() {
        let outcome = Ok(report(&[RecordState::Done, RecordState::Done]));
        assert_eq!(exit_status(&outcome), 0);
    }

    #[test]
    fn test_any_record_short_of_done_exits_two() {
        for state in [
            RecordState::FailedAtCreate,
            RecordState::FailedAtLog,
            RecordState::FailedAtTransition,
        ] {
            let outcome = Ok(report(&[RecordState::Done, state]));
            assert_eq!(exit_status(&outcome), 2, "{state:?}");
        }
    }

    #[test]
    fn test_missing_configuration_exits_one() {
        let outcome: anyhow::Result<RunReport> = SubmitConfig::from_lookup(|_| None)
            .context("invalid configuration")
            .map(|_| report(&[RecordState::Done]));
        assert_eq!(exit_status(&outcome), 1);
    }

    #[tokio::test]
    async fn test_unreadable_input_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = submit(&config(), &dir.path().join("maintenance.csv")).await;
        assert!(format!("{:#}", outcome.as_ref().unwrap_err()).contains("cannot load task file"));
        assert_eq!(exit_status(&outcome), 1);
    }

    #[tokio::test]
    async fn test_malformed_input_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("develop.csv");
        std::fs::write(&path, "Summary,Original Estimate\nInstall Minio,3 hours\n").unwrap();
        assert_eq!(exit_status(&submit(&config(), &path).await), 1);
    }

    #[tokio::test]
    async fn test_preflight_failure_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maintenance.csv");
        std::fs::write(&path, "Summary,Original Estimate\nInstall Minio,3h\n").unwrap();
        let outcome = submit(&config(), &path).await;
        assert!(format!("{:#}", outcome.as_ref().unwrap_err()).contains("preflight failed"));
        assert_eq!(exit_status(&outcome), 1);
    }

    #[test]
    fn test_usage_errors_exit_one() {
        let err = Cli::try_parse_from(["jira-subtasks"]).unwrap_err();
        assert_eq!(usage_exit_status(&err), Some(1));

        let err = Cli::try_parse_from(["jira-subtasks", "--bogus", "t.csv"]).unwrap_err();
        assert_eq!(usage_exit_status(&err), Some(1));
    }

    #[test]
    fn test_help_and_version_are_not_usage_errors() {
        let err = Cli::try_parse_from(["jira-subtasks", "--help"]).unwrap_err();
        assert_eq!(usage_exit_status(&err), None);

        let err = Cli::try_parse_from(["jira-subtasks", "--version"]).unwrap_err();
        assert_eq!(usage_exit_status(&err), None);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["jira-subtasks"]).is_err());
    }

    #[test]
    fn test_log_format_defaults_to_pretty() {
        let cli = Cli::try_parse_from(["jira-subtasks", "maintenance.yaml"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("maintenance.yaml"));
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_json_log_format() {
        let cli =
            Cli::try_parse_from(["jira-subtasks", "--log-format", "json", "tasks.yaml"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["jira-subtasks", "--log-format", "xml", "t.yaml"]).is_err());
    }
}
