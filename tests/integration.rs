use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cbk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cbk");
    path
}

fn run_cbk(config_path: Option<&Path>, args: &[&str]) -> (String, String, bool) {
    let binary = cbk_binary();
    let mut command = Command::new(&binary);
    if let Some(config) = config_path {
        command.arg("--config").arg(config);
    }
    let output = command
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cbk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_ask_rule_answer() {
    let (stdout, stderr, success) = run_cbk(None, &["ask", "what products do they sell"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rubber bands and condoms"));
}

#[test]
fn test_ask_greeting() {
    let (stdout, _, success) = run_cbk(None, &["ask", "hello"]);
    assert!(success);
    assert!(stdout.contains("case study assistant"));
}

#[test]
fn test_ask_empty_query_prompts() {
    let (stdout, _, success) = run_cbk(None, &["ask", ""]);
    assert!(success);
    assert!(stdout.contains("Please ask me a question about Rubber Bumper Co."));
}

#[test]
fn test_ask_out_of_scope() {
    let (stdout, _, success) = run_cbk(None, &["ask", "tell me about the weather today"]);
    assert!(success);
    assert!(stdout.contains("I can only answer questions about Rubber Bumper Co."));
}

#[test]
fn test_ask_deterministic() {
    let (first, _, _) = run_cbk(None, &["ask", "market share"]);
    let (second, _, _) = run_cbk(None, &["ask", "market share"]);
    assert_eq!(first, second);
}

#[test]
fn test_explain_flag_reports_tier() {
    let (stdout, _, success) = run_cbk(None, &["ask", "--explain", "what product"]);
    assert!(success);
    assert!(stdout.starts_with("[rule]"), "unexpected output: {}", stdout);
}

#[test]
fn test_invalid_config_refuses_to_start() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("cbk.toml");
    fs::write(&config_path, "[retrieval]\nrelevance_floor = 1.5\n").unwrap();

    let (stdout, stderr, success) = run_cbk(Some(&config_path), &["ask", "what product"]);
    assert!(!success, "expected startup failure, got stdout={}", stdout);
    assert!(stderr.contains("relevance_floor"));
}

#[test]
fn test_corpus_file_feeds_retrieval() {
    let tmp = TempDir::new().unwrap();
    let notes_dir = tmp.path().join("notes");
    fs::create_dir_all(&notes_dir).unwrap();
    fs::write(
        notes_dir.join("history.txt"),
        "The company was founded in 1952 in Akron by the Bumper family. \
         The founders sold rubber goods to local general stores.",
    )
    .unwrap();

    let config_path = tmp.path().join("cbk.toml");
    fs::write(
        &config_path,
        format!(
            "[corpus]\npaths = [\"{}\"]\n",
            notes_dir.display()
        ),
    )
    .unwrap();

    let (stdout, stderr, success) = run_cbk(
        Some(&config_path),
        &["ask", "how was the company founded and by whom in which town"],
    );
    assert!(success, "ask failed: stderr={}", stderr);
    assert!(stdout.contains("1952"), "unexpected answer: {}", stdout);
}

#[test]
fn test_extra_rules_file() {
    let tmp = TempDir::new().unwrap();
    let rules_path = tmp.path().join("rules.toml");
    fs::write(
        &rules_path,
        r#"
[[rule]]
trigger = "office dog"
answer = "The office dog is named Bando."
"#,
    )
    .unwrap();

    let config_path = tmp.path().join("cbk.toml");
    fs::write(
        &config_path,
        format!(
            "[knowledge]\nrules_path = \"{}\"\n",
            rules_path.display()
        ),
    )
    .unwrap();

    let (stdout, _, success) = run_cbk(Some(&config_path), &["ask", "office dog"]);
    assert!(success);
    assert!(stdout.contains("Bando"));
}

#[test]
fn test_duplicate_extra_rule_refuses_to_start() {
    let tmp = TempDir::new().unwrap();
    let rules_path = tmp.path().join("rules.toml");
    // "factory" already exists in the built-in table.
    fs::write(
        &rules_path,
        r#"
[[rule]]
trigger = "factory"
answer = "shadowed"
"#,
    )
    .unwrap();

    let config_path = tmp.path().join("cbk.toml");
    fs::write(
        &config_path,
        format!(
            "[knowledge]\nrules_path = \"{}\"\n",
            rules_path.display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_cbk(Some(&config_path), &["ask", "factory"]);
    assert!(!success);
    assert!(stderr.contains("Duplicate rule trigger"));
}

#[test]
fn test_chat_pipes_cleanly() {
    use std::io::Write;
    use std::process::Stdio;

    let binary = cbk_binary();
    let mut child = Command::new(&binary)
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"what product\nexit\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("rubber bands and condoms"));
    // No prompt decoration when stdin is not a terminal.
    assert!(!stdout.contains("> "));
}
