use assert_cmd::Command;
use predicates::prelude::*;

fn maestro() -> Command {
    Command::cargo_bin("maestro").unwrap()
}

/// Write a config to a temp dir and point MAESTRO_CONFIG at it.
fn write_config(dir: &tempfile::TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("maestro.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_help_shows_dry_run_flag() {
    maestro()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_unknown_flag_is_usage_error_with_exit_1() {
    maestro().arg("--bogus").assert().failure().code(1);
}

#[test]
fn test_dry_run_prints_resolved_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "domain: example.com\n");

    maestro()
        .env("MAESTRO_CONFIG", &path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("example.com"))
        .stdout(predicate::str::contains("pulumi.sshPort: 22"))
        .stdout(predicate::str::contains("ansible.groups: [devops]"));
}

#[test]
fn test_dry_run_shows_detected_roles() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [backend, web]
"#,
    );

    maestro()
        .env("MAESTRO_CONFIG", &path)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("detected roles: [backend, web]"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    maestro()
        .env("MAESTRO_CONFIG", dir.path().join("absent.yaml"))
        .arg("--dry-run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("[maestro] Error"))
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_schema_error_names_the_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "pulumi:\n  enabled: false\n");

    maestro()
        .env("MAESTRO_CONFIG", &path)
        .arg("--dry-run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("domain"));
}

#[test]
fn test_semantic_error_surfaces_at_top_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
domain: example.com
pulumi:
  enabled: true
  stacks:
    dev:
      servers:
        - roles: [backend]
"#,
    );

    maestro()
        .env("MAESTRO_CONFIG", &path)
        .arg("--dry-run")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cloudflareAccountId"));
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "domain: example.com\nextra: true\n");

    maestro()
        .env("MAESTRO_CONFIG", &path)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field 'extra'"));
}
