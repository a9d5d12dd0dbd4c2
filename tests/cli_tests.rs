//! End-to-end runs of the compiled binary for commands that need no TTY

use assert_cmd::Command;
use predicates::prelude::*;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn knit() -> Command {
    let mut cmd = Command::cargo_bin("knit").unwrap();
    cmd.env_remove("KNIT_LOG").env_remove("KNIT_THEME");
    cmd
}

#[test]
fn test_version_prints_package_version() {
    knit()
        .arg("version")
        .assert()
        .success()
        .stdout(format!("knit version {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_spin_emits_child_stdout() {
    knit()
        .args(["spin", "--title", "working", "--", "printf", "hello"])
        .assert()
        .success()
        .stdout("hello");
}

#[test]
fn test_spin_propagates_child_status_and_errors() {
    knit()
        .args(["spin", "--", "sh", "-c", "echo broke >&2; exit 42"])
        .assert()
        .code(42)
        .stdout("")
        .stderr(predicate::str::contains("broke"));
}

#[test]
fn test_spin_missing_command_exits_127() {
    knit()
        .args(["spin", "--", "definitely-not-a-real-command-knit"])
        .assert()
        .code(127)
        .stderr(predicate::str::starts_with("knit:"));
}

#[test]
fn test_spin_timeout_exits_124() {
    knit()
        .args(["spin", "--timeout", "1s", "--", "sleep", "30"])
        .assert()
        .code(124);
}

#[test]
fn test_spin_sigint_stops_child_and_exits_130() {
    let dir = TempDir::new().unwrap();
    let pidfile = dir.path().join("child.pid");
    let script = format!("echo $$ > {}; exec sleep 30", pidfile.display());
    let mut knit = std::process::Command::new(assert_cmd::cargo::cargo_bin("knit"))
        .args(["spin", "--", "sh", "-c", &script])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let child_pid = loop {
        if let Ok(pid) = std::fs::read_to_string(&pidfile) {
            if pid.ends_with('\n') {
                break pid.trim().to_string();
            }
        }
        assert!(Instant::now() < deadline, "child never started");
        std::thread::sleep(Duration::from_millis(20));
    };
    // Give the session time to install its handlers.
    std::thread::sleep(Duration::from_millis(500));

    let sent = std::process::Command::new("kill")
        .args(["-INT", &knit.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());
    let status = knit.wait().unwrap();
    assert_eq!(status.code(), Some(130));

    let alive = std::process::Command::new("kill")
        .args(["-0", &child_pid])
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!alive.success(), "child {child_pid} outlived knit");
}

#[test]
fn test_choose_without_any_terminal_fails_instead_of_waiting() {
    Command::new("setsid")
        .arg("-w")
        .arg(assert_cmd::cargo::cargo_bin("knit"))
        .args(["choose", "a", "b", "c"])
        .env_remove("KNIT_LOG")
        .timeout(Duration::from_secs(10))
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("knit:"));
}

#[test]
fn test_progress_commits_at_end_of_input() {
    knit()
        .args(["progress", "--limit", "4"])
        .write_stdin("a\nb\nc\nd\n")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_progress_show_output_echoes() {
    knit()
        .args(["progress", "--show-output"])
        .write_stdin("one\ntwo\n")
        .assert()
        .success()
        .stdout("one\ntwo\n");
}

#[test]
fn test_tail_keeps_last_lines() {
    knit()
        .args(["tail", "--lines", "2"])
        .write_stdin("1\n2\n3\n")
        .assert()
        .success()
        .stdout("2\n3\n");
}

#[test]
fn test_join_horizontal_and_vertical() {
    knit()
        .args(["join", "a\nb", "c"])
        .assert()
        .success()
        .stdout("ac\nb \n");
    knit()
        .args(["join", "--vertical", "--align", "right", "abc", "d"])
        .assert()
        .success()
        .stdout("abc\n  d\n");
}

#[test]
fn test_choose_select_if_one_skips_ui() {
    knit()
        .args(["choose", "--select-if-one", "only"])
        .assert()
        .success()
        .stdout("only\n");
}

#[test]
fn test_choose_without_options_is_an_error() {
    knit().arg("choose").assert().code(1).stdout("");
}

#[test]
fn test_confirm_timeout_answers_with_default() {
    knit()
        .args(["confirm", "--timeout", "1s", "--default=false", "Proceed?"])
        .assert()
        .code(1)
        .stdout("");
}

#[test]
fn test_confirm_reads_piped_answer() {
    knit().arg("confirm").write_stdin("yes\n").assert().success();
    knit().arg("confirm").write_stdin("nope\n").assert().code(1);
}

#[test]
fn test_log_writes_to_stderr() {
    knit()
        .args(["log", "--level", "info", "--structured", "deployed", "env", "prod"])
        .assert()
        .success()
        .stdout("")
        .stderr("INFO deployed env=prod\n");
}

#[test]
fn test_log_fatal_exits_one_and_appends_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.log");
    knit()
        .args(["log", "--formatter", "json", "--level", "fatal", "-o"])
        .arg(&path)
        .arg("gave up")
        .assert()
        .code(1)
        .stderr("");
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, "{\"level\":\"fatal\",\"msg\":\"gave up\"}\n");
}

#[test]
fn test_style_draws_border() {
    knit()
        .args(["style", "--border", "normal", "hi"])
        .assert()
        .success()
        .stdout("┌──┐\n│hi│\n└──┘\n");
}

#[test]
fn test_format_emoji() {
    knit()
        .args(["format", "--type", "emoji", "launch :rocket:"])
        .assert()
        .success()
        .stdout("launch 🚀\n");
}

#[test]
fn test_table_print_renders_plain_table() {
    knit()
        .args(["table", "--print"])
        .write_stdin("Name,Colour\nApple,red\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Apple  red"));
}

#[test]
fn test_unknown_theme_is_rejected() {
    knit()
        .args(["--theme", "no-such-theme", "join", "a"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("knit:"));
}

#[test]
fn test_invalid_enum_value_is_a_usage_error() {
    knit().args(["join", "--align", "sideways", "a"]).assert().code(2);
}
