use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn logvm() -> Command {
    Command::new(env!("CARGO_BIN_EXE_logvm"))
}

fn program_dir(programs: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, source) in programs {
        std::fs::write(dir.path().join(name), source).unwrap();
    }
    dir
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = logvm()
        .arg("init")
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    let config_path = temp_dir.path().join(".logvm/settings.toml");
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[loader]"));

    // Second init without --force refuses
    let output = logvm()
        .arg("init")
        .current_dir(temp_dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_command_reads_workspace_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".logvm");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        "version = 2\n[loader]\nextension = \"prog\"\n",
    )
    .unwrap();

    let output = logvm()
        .arg("config")
        .current_dir(temp_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("extension = \"prog\""));
}

#[test]
fn test_check_exit_status() {
    let good = program_dir(&[("a.mtail", "counter a\n/a/ { a++ }\n")]);
    let output = logvm().arg("check").arg(good.path()).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok      a.mtail"));

    let bad = program_dir(&[
        ("a.mtail", "counter a\n/a/ { a++ }\n"),
        ("b.mtail", "counter b\n/b/ { missing++ }\n"),
    ]);
    let output = logvm().arg("check").arg(bad.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAILED  b.mtail"));
}

#[test]
fn test_dump_prints_bytecode() {
    let dir = program_dir(&[("a.mtail", "counter hits\n/GET/ { hits++ }\n")]);

    let output = logvm().arg("dump").arg(dir.path()).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Bytecode for a.mtail"));
    assert!(stdout.contains("/GET/"));
}

#[test]
fn test_run_counts_stdin_lines() {
    let dir = program_dir(&[("a.mtail", "counter gets\n/GET/ { gets++ }\n")]);

    let mut child = logvm()
        .arg("run")
        .arg(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(b"GET /index.html\nPOST /form\nGET /about\n")
            .unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["lines"], 3);
    assert_eq!(report["matches"], 2);
    assert_eq!(report["prog_loads_total"]["a.mtail"], 1);
    assert_eq!(report["counters"][0]["name"], "gets");
    assert_eq!(report["counters"][0]["value"], 2);
}

#[test]
fn test_run_tolerates_invalid_utf8_input() {
    let dir = program_dir(&[("a.mtail", "counter gets\n/GET/ { gets++ }\n")]);

    let mut child = logvm()
        .arg("run")
        .arg(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(b"GET /1\n\xff\xfe bad bytes\nGET /2\n")
            .unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["lines"], 3);
    assert_eq!(report["matches"], 2);
}

#[test]
fn test_run_strict_refuses_broken_programs() {
    let dir = program_dir(&[("a.mtail", "counter a\n/a { a++ }\n")]);

    let output = logvm()
        .arg("run")
        .arg("--strict")
        .arg(dir.path())
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
