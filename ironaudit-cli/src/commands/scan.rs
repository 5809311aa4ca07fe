//! `ironaudit scan` command handler

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use ironaudit_core::config::IronauditConfig;
use ironaudit_core::types::Severity;
use ironaudit_scanner::{
    DependencyRegistryClient, InMemoryPersistence, LocalContentClient, LocalVulnDb,
    LockfileAnalyzer, RepositoryRef, RiskLevel, ScanOptions, ScanOrchestratorBuilder, ScanRequest,
    ScanResult, ScanStatus, ScannerConfig, VulnerabilityRecord, standard_adapters,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = IronauditConfig::load_or_default(config_path).await?;
    let threshold = Severity::from(args.fail_on);

    let result = run_scan(&args, &config).await?;

    let report = ScanReport::new(args.path.display().to_string(), &result, threshold);
    writer.render(&report)?;

    check_outcome(&result, threshold)
}

/// Run the full pipeline against a local checkout and return the terminal result.
///
/// Ctrl-C cancels the running scan; the cancelled result is still returned.
pub async fn run_scan(args: &ScanArgs, config: &IronauditConfig) -> Result<ScanResult, CliError> {
    let scanner_config = ScannerConfig::from_core(&config.engine);

    let db_path = args
        .vuln_db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.vuln_db.path));
    let vuln_db = Arc::new(LocalVulnDb::load(db_path.clone()).await?);
    info!(
        path = %db_path.display(),
        entries = vuln_db.entry_count(),
        "vulnerability database loaded"
    );

    let content = Arc::new(LocalContentClient::new(scanner_config.max_file_size));
    let registry: Arc<dyn DependencyRegistryClient> = vuln_db.clone();
    let adapters = standard_adapters(content, registry, vuln_db, &scanner_config)?;

    let orchestrator = ScanOrchestratorBuilder::new()
        .analyzer(Arc::new(LockfileAnalyzer::new(scanner_config.max_file_size)))
        .persistence(Arc::new(InMemoryPersistence::new()))
        .config(scanner_config)
        .adapters(adapters)
        .build()?;

    let mut options = ScanOptions::from_core(&config.scan);
    args.apply_to(&mut options);

    let mut repository = RepositoryRef::new(args.path.display().to_string());
    if let Some(revision) = &args.revision {
        repository = repository.with_revision(revision.clone());
    }
    let project_id = args
        .project_id
        .clone()
        .unwrap_or_else(|| project_name(&args.path));
    let request = ScanRequest::new(project_id, repository, options);

    info!(
        scan_id = %request.scan_id,
        path = %args.path.display(),
        "starting scan"
    );

    let cancellations = orchestrator.cancellations();
    let scan_id = request.scan_id.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(scan_id = %scan_id, "interrupt received, cancelling scan");
            cancellations.cancel(&scan_id);
        }
    });

    let outcome = orchestrator.run_scan(request).await;
    interrupt.abort();

    Ok(outcome?)
}

/// Map a terminal result to the command outcome.
///
/// Cancelled scans are a command error; otherwise any finding at or above
/// `threshold` produces [`CliError::Findings`].
pub fn check_outcome(result: &ScanResult, threshold: Severity) -> Result<(), CliError> {
    match result.status {
        ScanStatus::Cancelled => return Err(CliError::Command("scan cancelled".to_owned())),
        ScanStatus::Failed => {
            return Err(CliError::Command(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "scan failed".to_owned()),
            ));
        }
        _ => {}
    }

    let count = result
        .vulnerabilities
        .iter()
        .filter(|v| v.severity >= threshold)
        .count();
    if count > 0 {
        return Err(CliError::Findings { count, threshold });
    }

    Ok(())
}

/// Directory name of the scanned path, or `"local"` when it has none.
fn project_name(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "local".to_owned())
}

#[derive(Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    pub path: String,
    pub status: ScanStatus,
    pub security_score: u8,
    pub risk_level: RiskLevel,
    pub fail_on: Severity,
    pub vulnerabilities: VulnSummary,
    pub findings: Vec<FindingEntry>,
}

#[derive(Serialize, Default)]
pub struct VulnSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub fixable: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct FindingEntry {
    pub id: String,
    pub source: String,
    pub severity: Severity,
    pub package: String,
    pub version: String,
    pub fixed_in: Option<String>,
    pub title: String,
}

impl From<&VulnerabilityRecord> for FindingEntry {
    fn from(record: &VulnerabilityRecord) -> Self {
        Self {
            id: record.id.clone(),
            source: record.source.to_string(),
            severity: record.severity,
            package: record.package_name.clone(),
            version: record.version.clone(),
            fixed_in: record.fixed_in.clone(),
            title: record.title.clone(),
        }
    }
}

impl ScanReport {
    /// Build a report from a terminal result; findings are ordered most severe first.
    pub fn new(path: String, result: &ScanResult, fail_on: Severity) -> Self {
        let summary = &result.summary;
        let mut findings: Vec<FindingEntry> =
            result.vulnerabilities.iter().map(FindingEntry::from).collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.id.cmp(&b.id)));

        Self {
            scan_id: result.scan_id().to_owned(),
            path,
            status: result.status,
            security_score: summary.security_score,
            risk_level: summary.risk_level,
            fail_on,
            vulnerabilities: VulnSummary {
                critical: summary.critical_count,
                high: summary.high_count,
                medium: summary.medium_count,
                low: summary.low_count,
                fixable: summary.fixable_count,
                total: summary.total_vulnerabilities,
            },
            findings,
        }
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan: {}", self.path.bold())?;
        writeln!(w, "Scan ID: {}", self.scan_id)?;
        writeln!(w, "Status: {}", self.status)?;

        let score = format!("{}/100 ({})", self.security_score, self.risk_level);
        let score_colored = match self.risk_level {
            RiskLevel::Critical => score.red().bold(),
            RiskLevel::High => score.red(),
            RiskLevel::Medium => score.yellow(),
            RiskLevel::Low => score.green(),
        };
        writeln!(w, "Security score: {score_colored}")?;
        writeln!(w)?;

        let vuln_str = format!(
            "{} total (C:{} H:{} M:{} L:{}), {} fixable",
            self.vulnerabilities.total,
            self.vulnerabilities.critical,
            self.vulnerabilities.high,
            self.vulnerabilities.medium,
            self.vulnerabilities.low,
            self.vulnerabilities.fixable
        );

        if self.vulnerabilities.total > 0 {
            writeln!(w, "Vulnerabilities: {}", vuln_str.red().bold())?;
        } else {
            writeln!(w, "Vulnerabilities: {}", vuln_str.green().bold())?;
        }

        writeln!(w)?;

        if self.findings.is_empty() {
            writeln!(w, "{}", "No vulnerabilities found.".green())?;
        } else {
            writeln!(
                w,
                "{:<40} {:<10} {:<16} {:<25} {:<12} Fixed",
                "ID", "Severity", "Source", "Package", "Version"
            )?;
            writeln!(w, "{}", "-".repeat(110))?;

            for f in &self.findings {
                let label = f.severity.as_str();
                let severity_colored = match f.severity {
                    Severity::Critical => label.red().bold(),
                    Severity::High => label.red(),
                    Severity::Medium => label.yellow(),
                    Severity::Low => label.normal(),
                };

                writeln!(
                    w,
                    "{:<40} {:<10} {:<16} {:<25} {:<12} {}",
                    f.id,
                    severity_colored,
                    f.source,
                    f.package,
                    f.version,
                    f.fixed_in.as_deref().unwrap_or("N/A")
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironaudit_scanner::{ScanSummary, VulnSource};

    fn record(id: &str, severity: Severity) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_owned(),
            title: format!("title of {id}"),
            description: String::new(),
            severity,
            package_name: "lodash".to_owned(),
            version: "4.17.20".to_owned(),
            fixed_in: Some("4.17.21".to_owned()),
            references: Vec::new(),
            cvss_score: None,
            source: VulnSource::VulnDb,
        }
    }

    fn completed(records: Vec<VulnerabilityRecord>) -> ScanResult {
        let request = ScanRequest::new("p", RepositoryRef::new("/tmp/p"), ScanOptions::default());
        let mut result = ScanResult::new(request);
        result.mark_running().unwrap();
        let summary = ScanSummary {
            total_vulnerabilities: records.len(),
            ..ScanSummary::default()
        };
        result.complete(records, summary).unwrap();
        result
    }

    #[test]
    fn test_check_outcome_below_threshold_passes() {
        let result = completed(vec![record("GHSA-1", Severity::Medium)]);
        assert!(check_outcome(&result, Severity::High).is_ok());
    }

    #[test]
    fn test_check_outcome_at_threshold_fails() {
        let result = completed(vec![
            record("GHSA-1", Severity::High),
            record("GHSA-2", Severity::Critical),
            record("GHSA-3", Severity::Low),
        ]);
        match check_outcome(&result, Severity::High) {
            Err(CliError::Findings { count, threshold }) => {
                assert_eq!(count, 2);
                assert_eq!(threshold, Severity::High);
            }
            other => panic!("expected Findings error, got {other:?}"),
        }
    }

    #[test]
    fn test_check_outcome_cancelled_is_command_error() {
        let request = ScanRequest::new("p", RepositoryRef::new("/tmp/p"), ScanOptions::default());
        let mut result = ScanResult::new(request);
        result.mark_running().unwrap();
        result.cancel().unwrap();

        let err = check_outcome(&result, Severity::Low).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "scan cancelled");
    }

    #[test]
    fn test_report_orders_findings_by_severity() {
        let result = completed(vec![
            record("GHSA-low", Severity::Low),
            record("GHSA-crit", Severity::Critical),
            record("GHSA-med", Severity::Medium),
        ]);
        let report = ScanReport::new("/tmp/p".to_owned(), &result, Severity::High);
        let ids: Vec<&str> = report.findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["GHSA-crit", "GHSA-med", "GHSA-low"]);
    }

    #[test]
    fn test_report_text_lists_findings() {
        colored::control::set_override(false);
        let result = completed(vec![record("GHSA-35jh-r3h4-6jhm", Severity::High)]);
        let report = ScanReport::new("/tmp/p".to_owned(), &result, Severity::High);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("GHSA-35jh-r3h4-6jhm"));
        assert!(text.contains("4.17.21"));
        assert!(text.contains("Status: completed"));
    }

    #[test]
    fn test_report_text_clean_scan() {
        colored::control::set_override(false);
        let result = completed(Vec::new());
        let report = ScanReport::new("/tmp/p".to_owned(), &result, Severity::High);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("No vulnerabilities found."));
        assert!(text.contains("100/100 (low)"));
    }

    #[test]
    fn test_project_name_uses_directory() {
        assert_eq!(project_name(Path::new("/srv/acme-widgets")), "acme-widgets");
    }
}
