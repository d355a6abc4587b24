//! Whole-run tests: task file on disk, parent selection, `JiraClient` against
//! a mock server, and the `SubmissionRunner` in between.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use jira::JiraClient;
use mockito::{Matcher, Server, ServerGuard};
use pipeline::{
    load_task_file, resolve_parent, ParentRule, RecordState, SubmitConfig, SubmitError, Timestamp,
};
use runner::{RunSettings, SubmissionRunner};
use serde_json::json;

const TASKS: &str = "\
tasks:
  - summary: Install Minio
    original_estimate: 3h
  - summary: Update SSL
    original_estimate: 2h
";

fn config(server: &ServerGuard) -> SubmitConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("JIRA_BASE_URL", server.url()),
        ("JIRA_TOKEN", "tok-123".to_string()),
        ("ASSIGNEE_USERNAME", "r.karimi".to_string()),
        ("MAINTENANCE_PARENT_ISSUE_KEY", "BM-5610".to_string()),
        ("DEVELOP_PARENT_ISSUE_KEY", "BM-5612".to_string()),
        ("SUBMIT_RECORD_DELAY_MS", "0".to_string()),
        ("SUBMIT_STEP_DELAY_MS", "0".to_string()),
    ]);
    SubmitConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

fn fixed_clock() -> Timestamp {
    Timestamp::from_utc(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

async fn mock_preflight(server: &mut ServerGuard) {
    server
        .mock("GET", "/rest/api/2/myself")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_body(json!({"name": "r.karimi", "displayName": "Reza Karimi"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/rest/api/2/project/BM")
        .with_status(200)
        .with_body(
            json!({
                "id": "10400",
                "key": "BM",
                "components": [{"id": "12001", "name": "DevOps"}],
                "issueTypes": [{"id": "10003", "name": "Sub-task", "subtask": true}]
            })
            .to_string(),
        )
        .create_async()
        .await;
}

fn done_transitions() -> String {
    json!({
        "transitions": [
            {"id": "11", "name": "Start Progress", "to": {"name": "In Progress"}},
            {"id": "31", "name": "Done", "to": {"name": "Done"}}
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_maintenance_file_submits_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("maintenance-subtasks.yaml");
    std::fs::write(&path, TASKS).unwrap();

    let mut server = Server::new_async().await;
    let config = config(&server);
    mock_preflight(&mut server).await;

    let create_minio = server
        .mock("POST", "/rest/api/2/issue")
        .match_body(Matcher::PartialJson(json!({
            "fields": {
                "parent": {"key": "BM-5610"},
                "summary": "Install Minio",
                "assignee": {"name": "r.karimi"},
                "labels": ["DevOps"],
                "components": [{"id": "12001"}],
                "timetracking": {"originalEstimate": "3h"}
            }
        })))
        .with_status(201)
        .with_body(json!({"key": "BM-5701"}).to_string())
        .create_async()
        .await;
    let create_ssl = server
        .mock("POST", "/rest/api/2/issue")
        .match_body(Matcher::PartialJson(json!({
            "fields": {"parent": {"key": "BM-5610"}, "summary": "Update SSL"}
        })))
        .with_status(201)
        .with_body(json!({"key": "BM-5702"}).to_string())
        .create_async()
        .await;

    let log_minio = server
        .mock("POST", "/rest/api/2/issue/BM-5701/worklog")
        .match_body(Matcher::Json(json!({
            "timeSpent": "3h",
            "started": "2024-03-01T12:30:00.000+0330",
            "comment": "Install Minio"
        })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;
    let log_ssl = server
        .mock("POST", "/rest/api/2/issue/BM-5702/worklog")
        .match_body(Matcher::Json(json!({
            "timeSpent": "2h",
            "started": "2024-03-01T13:30:00.000+0330",
            "comment": "Update SSL"
        })))
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;

    let mut transitions = Vec::new();
    for issue in ["BM-5701", "BM-5702"] {
        server
            .mock("GET", format!("/rest/api/2/issue/{issue}/transitions").as_str())
            .with_status(200)
            .with_body(done_transitions())
            .create_async()
            .await;
        transitions.push(
            server
                .mock("POST", format!("/rest/api/2/issue/{issue}/transitions").as_str())
                .match_body(Matcher::Json(json!({"transition": {"id": "31"}})))
                .with_status(204)
                .create_async()
                .await,
        );
    }

    let records = load_task_file(&path).unwrap();
    let selection = resolve_parent("maintenance-subtasks.yaml", &config.parents);
    assert_eq!(selection.rule, ParentRule::Maintenance);

    let client = JiraClient::from_config(&config).unwrap();
    let settings = RunSettings::from_config(&config, selection.key);
    let report = SubmissionRunner::new(&client, settings)
        .with_clock(fixed_clock)
        .run(&records)
        .await
        .unwrap();

    create_minio.assert_async().await;
    create_ssl.assert_async().await;
    log_minio.assert_async().await;
    log_ssl.assert_async().await;
    for mock in &transitions {
        mock.assert_async().await;
    }

    assert!(report.all_done());
    assert_eq!(report.tally().to_string(), "2 done, 0 partial, 0 failed (2 total)");
    let keys: Vec<&str> = report.created_keys().iter().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["BM-5701", "BM-5702"]);
}

#[tokio::test]
async fn test_rejected_create_skips_worklog_and_transition() {
    let mut server = Server::new_async().await;
    let config = config(&server);
    mock_preflight(&mut server).await;

    server
        .mock("POST", "/rest/api/2/issue")
        .with_status(400)
        .with_body(r#"{"errors":{"summary":"Summary is required."}}"#)
        .create_async()
        .await;
    let worklog = server
        .mock("POST", Matcher::Regex(r"^/rest/api/2/issue/.+/worklog$".into()))
        .expect(0)
        .create_async()
        .await;
    let transitions = server
        .mock("GET", Matcher::Regex(r"^/rest/api/2/issue/.+/transitions$".into()))
        .expect(0)
        .create_async()
        .await;

    let records = pipeline::parse_task_document(TASKS).unwrap();
    let selection = resolve_parent("develop-week-12.yaml", &config.parents);
    assert_eq!(selection.key.as_str(), "BM-5612");

    let client = JiraClient::from_config(&config).unwrap();
    let report = SubmissionRunner::new(&client, RunSettings::from_config(&config, selection.key))
        .run(&records)
        .await
        .unwrap();

    worklog.assert_async().await;
    transitions.assert_async().await;
    assert!(report
        .results
        .iter()
        .all(|r| r.state == RecordState::FailedAtCreate && r.issue_key.is_none()));
    assert!(report.results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("HTTP 400"));
    assert_eq!(report.tally().failed, 2);
    assert!(!report.all_done());
}

#[tokio::test]
async fn test_bad_credentials_abort_before_any_record() {
    let mut server = Server::new_async().await;
    let config = config(&server);
    server
        .mock("GET", "/rest/api/2/myself")
        .with_status(401)
        .with_body("Unauthorized")
        .create_async()
        .await;
    let create = server
        .mock("POST", "/rest/api/2/issue")
        .expect(0)
        .create_async()
        .await;

    let records = pipeline::parse_task_document(TASKS).unwrap();
    let client = JiraClient::from_config(&config).unwrap();
    let err = SubmissionRunner::new(
        &client,
        RunSettings::from_config(&config, config.parents.maintenance.clone()),
    )
    .run(&records)
    .await
    .unwrap_err();

    create.assert_async().await;
    assert!(matches!(err, SubmitError::Authentication { status: 401, .. }));
}
