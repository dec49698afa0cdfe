//! Integration tests for the `sb` CLI.
//!
//! Each test starts a mock project service, writes a config file pointing
//! at it, runs `sb` as a subprocess, and checks stdout/stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sb_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sb"))
}

fn task_json(id: &str, name: &str, deadline: &str, parent: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "result": null,
        "deadline": deadline,
        "isCompleted": false,
        "projectId": "p-1",
        "responsibleStudentId": "s-1",
        "prerequisites": [],
        "dependentTaskId": parent,
    })
}

/// Mock service with project `p-1` and the given task records.
async fn start_service(tasks: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p-1",
            "name": "Thesis",
            "description": "",
            "deadline": "2025-12-31",
            "tasks": [],
            "members": ["s-2"],
            "subjectName": "Computer Science",
            "creatorId": "s-1",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/project-tasks/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tasks))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/get/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s-1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.org",
        })))
        .mount(&server)
        .await;
    server
}

fn default_tasks() -> serde_json::Value {
    json!([
        task_json("t-1", "Write report", "2025-12-01", None),
        task_json("t-2", "Outline", "2025-11-20", Some("t-1")),
    ])
}

fn write_config(dir: &Path, base_url: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            "[backend]\nbase_url = \"{}\"\ntimeout_secs = 5\n\n[board]\ndefault_project = \"p-1\"\n",
            base_url
        ),
    )
    .unwrap();
    path
}

/// Run `sb` with the given args, returning (stdout, stderr, success).
async fn run_sb(config: &Path, args: &[&str]) -> (String, String, bool) {
    let mut command = Command::new(sb_bin());
    command
        .arg("-c")
        .arg(config)
        .args(args)
        .env_remove("SB_API_URL")
        .env_remove("SB_SESSION")
        .env_remove("SB_LOG");
    let output = tokio::task::spawn_blocking(move || command.output())
        .await
        .unwrap()
        .expect("failed to run sb");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `sb` expecting success, return stdout.
async fn run_sb_ok(config: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_sb(config, args).await;
    if !success {
        panic!("sb {:?} failed:\nstdout: {}\nstderr: {}", args, stdout, stderr);
    }
    stdout
}

// ---------------------------------------------------------------------------
// Read command tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_tree_text() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["tree"]).await;
    assert!(out.contains("== Thesis (due 2025-12-31) =="));
    assert!(out.contains("[ ] t-1 Write report @Ada Lovelace due:2025-12-01 0/1 !"));
    assert!(out.contains("  [ ] t-2 Outline @Ada Lovelace due:2025-11-20"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tree_json() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["tree", "--json"]).await;
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["project_id"], "p-1");
    assert_eq!(parsed["tasks"][0]["id"], "t-1");
    assert_eq!(parsed["tasks"][0]["can_complete"], false);
    assert_eq!(parsed["tasks"][0]["subtasks"][0]["id"], "t-2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_show_subtask_with_bound() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["show", "t-2"]).await;
    assert!(out.contains("in: Write report"));
    assert!(out.contains("deadline: 2025-11-20 (latest 2025-12-01)"));

    let (_, stderr, success) = run_sb(&config, &["show", "t-9"]).await;
    assert!(!success);
    assert!(stderr.contains("task not found: t-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_reports_errors_and_fails() {
    let server = start_service(json!([
        task_json("t-1", "Write report", "2025-12-01", None),
        task_json("t-2", "Outline", "2025-12-03", Some("t-1")),
    ]))
    .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let (stdout, stderr, success) = run_sb(&config, &["check"]).await;
    assert!(!success);
    assert!(stdout.contains("t-2 is due 2025-12-03 after its parent t-1 (2025-12-01)"));
    assert!(stderr.contains("error: 1 consistency error(s)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_valid_tree() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["check"]).await;
    assert!(out.contains("✓ task tree is consistent"));
}

// ---------------------------------------------------------------------------
// Write command tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_blocked_parent() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let (_, stderr, success) = run_sb(&config, &["toggle", "t-1"]).await;
    assert!(!success);
    assert!(stderr.contains("cannot complete t-1: 1 subtask(s) still open"));
    let puts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .count();
    assert_eq!(puts, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_add_rejects_late_subtask_locally() {
    let server = start_service(default_tasks()).await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let (_, stderr, success) = run_sb(
        &config,
        &[
            "add",
            "Sources",
            "--responsible",
            "s-2",
            "--deadline",
            "2025-12-05",
            "--parent",
            "t-1",
        ],
    )
    .await;
    assert!(!success);
    assert!(stderr.contains("is after the parent task t-1 deadline 2025-12-01"));
}

// ---------------------------------------------------------------------------
// Setup errors
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_project_selection() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(&config, "[backend]\nbase_url = \"http://127.0.0.1:9\"\n").unwrap();

    let (_, stderr, success) = run_sb(&config, &["tree"]).await;
    assert!(!success);
    assert!(stderr.contains("error: no project selected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/p-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let (_, stderr, success) = run_sb(&config, &["tree"]).await;
    assert!(!success);
    assert!(stderr.contains("please sign in again"));
    assert!(stderr.contains("hint: sign in again with `sb login --session <cookie>`"));
}

// ---------------------------------------------------------------------------
// Members and account commands
// ---------------------------------------------------------------------------

async fn mount_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/students/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s-2",
            "firstName": "Alan",
            "lastName": "Turing",
            "email": "alan@example.org",
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_members_rm() {
    let server = start_service(default_tasks()).await;
    Mock::given(method("DELETE"))
        .and(path("/api/projects/members"))
        .and(body_json(json!({ "projectId": "p-1", "studentId": "s-2" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["members", "rm", "s-2"]).await;
    assert!(out.contains("from Thesis"));

    let (_, stderr, success) = run_sb(&config, &["members", "rm", "s-9"]).await;
    assert!(!success);
    assert!(stderr.contains("not a member of this project: s-9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_without_project() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(&config, format!("[backend]\nbase_url = \"{}\"\n", server.uri())).unwrap();

    let out = run_sb_ok(&config, &["whoami"]).await;
    assert_eq!(out.trim(), "s-2 Alan Turing <alan@example.org>");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_projects_lists_own_and_joined() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    let project = |id: &str, creator: &str, members: Vec<&str>| {
        json!({
            "id": id,
            "name": format!("Project {}", id),
            "description": "",
            "deadline": "2025-12-31",
            "tasks": [],
            "members": members,
            "subjectName": "",
            "creatorId": creator,
        })
    };
    Mock::given(method("GET"))
        .and(path("/api/projects/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            project("p-1", "s-1", vec!["s-2"]),
            project("p-2", "s-2", vec![]),
            project("p-3", "s-1", vec!["s-4"]),
        ])))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["projects"]).await;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "p-1 Project p-1 (due 2025-12-31) [member]",
            "p-2 Project p-2 (due 2025-12-31) [owner]",
        ]
    );

    let out = run_sb_ok(&config, &["projects", "--json"]).await;
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert_eq!(parsed[1]["role"], "owner");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_accept_invitation() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/students/accept-invite/s-2/p-7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let out = run_sb_ok(&config, &["accept", "p-7"]).await;
    assert!(out.contains("joined p-7"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_stores_checked_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/students/me"))
        .and(header("cookie", "session=fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s-2",
            "firstName": "Alan",
            "lastName": "Turing",
            "email": "alan@example.org",
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let (_, stderr, success) = run_sb(&config, &["login", "--session", "session=stale"]).await;
    assert!(!success);
    assert!(stderr.contains("hint: sign in again"));
    assert!(!fs::read_to_string(&config).unwrap().contains("session=stale"));

    let out = run_sb_ok(&config, &["login", "--session", "session=fresh"]).await;
    assert!(out.contains("signed in as Alan Turing"));
    let stored = fs::read_to_string(&config).unwrap();
    assert!(stored.contains("session_cookie = \"session=fresh\""));
    assert!(stored.contains("default_project = \"p-1\""));

    let out = run_sb_ok(&config, &["whoami"]).await;
    assert!(out.contains("Alan Turing"));
}
