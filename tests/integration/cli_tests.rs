//! Integration tests for the CLI binary.
//!
//! Drives the `trustdir` binary against snapshot files in a temporary
//! directory.
//!
//! This test is registered as a [[test]] in the trustdir-cli crate so that
//! CARGO_BIN_EXE_trustdir is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `trustdir` binary.
fn trustdir_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_trustdir"))
}

/// Run the binary against `snapshot` with an inline layout.
fn run(snapshot: &Path, args: &[&str]) -> Output {
    trustdir_binary()
        .arg("--directory")
        .arg(snapshot)
        .args([
            "--domain-dn",
            "dc=ipa,dc=example,dc=com",
            "--realm",
            "IPA.EXAMPLE.COM",
        ])
        .args(args)
        .output()
        .expect("failed to execute trustdir")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_responds_to_help() {
    let output = trustdir_binary()
        .arg("--help")
        .output()
        .expect("failed to execute trustdir --help");

    assert_success(&output, "trustdir --help");
    let out = stdout(&output);
    assert!(
        out.contains("trustdir") || out.contains("Usage"),
        "trustdir --help output should contain usage information, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = trustdir_binary()
        .arg("--version")
        .output()
        .expect("failed to execute trustdir --version");

    assert_success(&output, "trustdir --version");
    assert!(stdout(&output).contains("0.3"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = trustdir_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute trustdir");

    assert!(
        !output.status.success(),
        "trustdir with unknown flag should exit with error"
    );
}

#[test]
fn cli_requires_a_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let output = trustdir_binary()
        .arg("--directory")
        .arg(tmp.path().join("directory.json"))
        .args(["trust", "list"])
        .output()
        .expect("failed to execute trustdir");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--domain-dn"));
}

#[test]
fn cli_set_show_delete_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let snapshot = tmp.path().join("directory.json");

    // Listing a missing snapshot is an empty directory, not an error.
    let output = run(&snapshot, &["trust", "list"]);
    assert_success(&output, "trust list");
    assert!(stdout(&output).contains("No trusted domains"));
    assert!(!snapshot.exists(), "read-only commands must not write");

    let output = run(
        &snapshot,
        &[
            "trust",
            "set",
            "ad.example.org",
            "--netbios-name",
            "AD",
            "--domain-name",
            "ad.example.org",
            "--sid",
            "S-1-5-21-1-2-3",
            "--direction",
            "bidirectional",
            "--type",
            "uplevel",
            "--attributes",
            "0x8",
            "--auth-incoming",
            "deadbeef",
        ],
    );
    assert_success(&output, "trust set");
    assert!(snapshot.exists(), "set must save the snapshot");

    let output = run(&snapshot, &["trust", "show", "AD", "--json"]);
    assert_success(&output, "trust show");
    let view: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(view["netbios_name"], "AD");
    assert_eq!(view["domain_name"], "ad.example.org");
    assert_eq!(view["security_identifier"], "S-1-5-21-1-2-3");
    assert_eq!(view["trust_direction"], 3);
    assert_eq!(view["trust_type"], 2);
    assert_eq!(view["trust_attributes"], 8);
    assert_eq!(view["trust_auth_incoming"], "deadbeef");
    assert!(view["trust_auth_outgoing"].is_null());

    let output = run(&snapshot, &["trust", "show-sid", "S-1-5-21-1-2-3"]);
    assert_success(&output, "trust show-sid");
    let out = stdout(&output);
    assert!(out.contains("Trusted domain: AD"));
    assert!(out.contains("bidirectional"));
    assert!(out.contains("forest_transitive"));
    assert!(!out.contains("deadbeef"), "secrets are hidden without -v");

    let output = run(&snapshot, &["trust", "summaries", "--json"]);
    assert_success(&output, "trust summaries");
    let summaries: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summaries[0]["name"], "AD");
    assert_eq!(summaries[0]["security_identifier"], "S-1-5-21-1-2-3");

    let output = run(&snapshot, &["trust", "delete", "AD"]);
    assert_success(&output, "trust delete");

    let output = run(&snapshot, &["trust", "show", "AD"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not found"));
}

#[test]
fn cli_rejects_bad_field_values() {
    let tmp = tempfile::tempdir().unwrap();
    let snapshot = tmp.path().join("directory.json");

    for args in [
        ["trust", "set", "X", "--sid", "not-a-sid"],
        ["trust", "set", "X", "--auth-incoming", "zz"],
        ["trust", "set", "X", "--direction", "sideways"],
    ] {
        let output = run(&snapshot, &args);
        assert!(!output.status.success(), "{args:?} should fail");
    }
    assert!(!snapshot.exists());
}

#[test]
fn cli_info_reports_backend_and_domain() {
    let tmp = tempfile::tempdir().unwrap();
    let snapshot = tmp.path().join("directory.json");

    let output = run(&snapshot, &["--domain-sid", "S-1-5-21-7-8-9", "info"]);
    assert_success(&output, "info");
    let out = stdout(&output);
    assert!(out.contains("IPA_ldapsam"));
    assert!(out.contains("0x7"));
    assert!(out.contains("Domain:    IPA"));
    assert!(out.contains("ipa.example.com"));
    assert!(out.contains("S-1-5-21-7-8-9"));
}

#[test]
fn cli_reads_layout_file() {
    let tmp = tempfile::tempdir().unwrap();
    let snapshot = tmp.path().join("directory.json");
    let config = tmp.path().join("layout.json");
    std::fs::write(
        &config,
        r#"{
            "domain_dn": "dc=corp,dc=test",
            "user_suffix": "cn=users,cn=accounts,dc=corp,dc=test",
            "machine_suffix": "cn=computers,cn=accounts,dc=corp,dc=test",
            "realm": "CORP.TEST",
            "domain_name": "CORP",
            "domain_sid": "S-1-5-21-4-5-6"
        }"#,
    )
    .unwrap();

    let output = trustdir_binary()
        .arg("--directory")
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .args(["trust", "set", "CHILD", "--netbios-name", "CHILD"])
        .output()
        .expect("failed to execute trustdir");
    assert_success(&output, "trust set with --config");

    let saved = std::fs::read_to_string(&snapshot).unwrap();
    assert!(saved.contains("cn=CHILD,ou=system,dc=corp,dc=test"));
}
