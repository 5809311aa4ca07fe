//! Integration tests for `ironaudit scan` command.
//!
//! Runs the command handler against temporary checkouts and a temporary
//! vulnerability database directory.

use std::fs;
use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use ironaudit_cli::cli::{Cli, Commands, ScanArgs};
use ironaudit_cli::commands::scan::{ScanReport, check_outcome, run_scan};
use ironaudit_cli::error::CliError;
use ironaudit_core::config::IronauditConfig;
use ironaudit_core::types::Severity;
use ironaudit_scanner::{ScanStatus, VulnSource};

const PACKAGE_LOCK: &str = r#"{
  "name": "widgets",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "widgets", "version": "1.0.0" },
    "node_modules/lodash": { "version": "4.17.20" }
  }
}"#;

const NPM_DB: &str = r#"[
  {
    "id": "GHSA-35jh-r3h4-6jhm",
    "package": "lodash",
    "ecosystem": "Npm",
    "title": "Command Injection in lodash",
    "affected_ranges": [{ "introduced": "0.0.0", "fixed": "4.17.21" }],
    "fixed_version": "4.17.21",
    "severity": "high",
    "description": "lodash versions prior to 4.17.21 are vulnerable to command injection via template."
  }
]"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dir");
    }
    fs::write(path, content).expect("should write file");
}

fn fixture() -> (TempDir, TempDir) {
    let checkout = TempDir::new().expect("should create checkout dir");
    write(checkout.path(), "package-lock.json", PACKAGE_LOCK);
    write(checkout.path(), "SECURITY.md", "Report issues to security@example.com\n");

    let db = TempDir::new().expect("should create db dir");
    write(db.path(), "npm.json", NPM_DB);

    (checkout, db)
}

fn scan_args(extra: &[&str]) -> ScanArgs {
    let mut argv = vec!["ironaudit", "scan"];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).expect("arguments should parse").command {
        Commands::Scan(args) => args,
        _ => panic!("expected Scan command"),
    }
}

#[tokio::test]
async fn test_scan_reports_vuln_db_finding() {
    let (checkout, db) = fixture();
    let path = checkout.path().display().to_string();
    let db_path = db.path().display().to_string();
    let args = scan_args(&[&path, "--vuln-db", &db_path, "--project-id", "widgets"]);

    let result = run_scan(&args, &IronauditConfig::default())
        .await
        .expect("scan should run");

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.request.project_id, "widgets");
    assert!(
        result
            .vulnerabilities
            .iter()
            .any(|v| v.source == VulnSource::VulnDb && v.id == "GHSA-35jh-r3h4-6jhm")
    );
    assert_eq!(result.summary.total_vulnerabilities, result.vulnerabilities.len());
}

#[tokio::test]
async fn test_scan_fail_on_threshold() {
    let (checkout, db) = fixture();
    let path = checkout.path().display().to_string();
    let db_path = db.path().display().to_string();
    let args = scan_args(&[&path, "--vuln-db", &db_path]);

    let result = run_scan(&args, &IronauditConfig::default())
        .await
        .expect("scan should run");

    // high findings trip the default threshold but not `--fail-on critical`
    let err = check_outcome(&result, Severity::High).expect_err("high findings present");
    assert_eq!(err.exit_code(), 4);
    assert!(matches!(err, CliError::Findings { threshold: Severity::High, .. }));
    assert!(check_outcome(&result, Severity::Critical).is_ok());
}

#[tokio::test]
async fn test_scan_disable_flags_skip_dependency_sources() {
    let (checkout, db) = fixture();
    let path = checkout.path().display().to_string();
    let db_path = db.path().display().to_string();
    let args = scan_args(&[
        &path,
        "--vuln-db",
        &db_path,
        "--no-dependency-audit",
        "--no-vuln-db",
    ]);

    let result = run_scan(&args, &IronauditConfig::default())
        .await
        .expect("scan should run");

    assert_eq!(result.status, ScanStatus::Completed);
    assert!(result.vulnerabilities.iter().all(|v| !matches!(
        v.source,
        VulnSource::RegistryAudit | VulnSource::VulnDb
    )));
}

#[tokio::test]
async fn test_scan_missing_vuln_db_dir_is_empty_database() {
    let (checkout, _db) = fixture();
    let missing_db = checkout.path().join("no-db-here");
    let path = checkout.path().display().to_string();
    let db_path = missing_db.display().to_string();
    let args = scan_args(&[&path, "--vuln-db", &db_path, "--fail-on", "low"]);

    let result = run_scan(&args, &IronauditConfig::default())
        .await
        .expect("scan should run without a database");

    assert_eq!(result.status, ScanStatus::Completed);
    assert!(result.vulnerabilities.is_empty());
    assert_eq!(result.summary.security_score, 100);
    assert!(check_outcome(&result, Severity::Low).is_ok());
}

#[tokio::test]
async fn test_scan_missing_checkout_is_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let missing = dir.path().join("gone").display().to_string();
    let db_path = dir.path().display().to_string();
    let args = scan_args(&[&missing, "--vuln-db", &db_path]);

    let err = run_scan(&args, &IronauditConfig::default())
        .await
        .expect_err("missing checkout should fail");

    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("not a directory"));
}

#[tokio::test]
async fn test_scan_report_json_shape() {
    let (checkout, db) = fixture();
    let path = checkout.path().display().to_string();
    let db_path = db.path().display().to_string();
    let args = scan_args(&[&path, "--vuln-db", &db_path]);

    let result = run_scan(&args, &IronauditConfig::default())
        .await
        .expect("scan should run");
    let report = ScanReport::new(path.clone(), &result, Severity::High);

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["fail_on"], "high");
    assert_eq!(json["path"], path.as_str());
    assert_eq!(
        json["vulnerabilities"]["total"].as_u64(),
        Some(result.vulnerabilities.len() as u64)
    );
    assert_eq!(json["findings"][0]["severity"], "high");
}
