//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ironaudit_core::types::Severity;
use ironaudit_scanner::{AdapterKind, ScanOptions};

/// ironaudit -- vulnerability scan orchestration for source repositories.
///
/// Use `ironaudit <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironaudit", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironaudit.toml configuration file.
    #[arg(short, long, default_value = "ironaudit.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a local checkout for known vulnerabilities.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Severity threshold for `--fail-on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => Severity::Low,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::High => Severity::High,
            SeverityArg::Critical => Severity::Critical,
        }
    }
}

/// Run a one-shot scan on a project directory.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path to scan (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Project identifier recorded with the scan (default: directory name).
    #[arg(long)]
    pub project_id: Option<String>,

    /// Revision label recorded with the scan.
    #[arg(long)]
    pub revision: Option<String>,

    /// Vulnerability database directory (overrides `[vuln_db] path`).
    #[arg(long)]
    pub vuln_db: Option<PathBuf>,

    /// Exit with code 4 when a finding at or above this severity is reported.
    #[arg(long, value_enum, default_value = "high")]
    pub fail_on: SeverityArg,

    /// Skip the package registry audit.
    #[arg(long)]
    pub no_dependency_audit: bool,

    /// Skip the vulnerability database query.
    #[arg(long)]
    pub no_vuln_db: bool,

    /// Skip CI workflow analysis.
    #[arg(long)]
    pub no_workflow: bool,

    /// Skip Dockerfile analysis.
    #[arg(long)]
    pub no_container: bool,

    /// Skip code pattern analysis.
    #[arg(long)]
    pub no_code_analysis: bool,
}

impl ScanArgs {
    /// Apply the `--no-*` flags on top of the configured defaults.
    pub fn apply_to(&self, options: &mut ScanOptions) {
        for (kind, disabled) in [
            (AdapterKind::DependencyAudit, self.no_dependency_audit),
            (AdapterKind::VulnDbQuery, self.no_vuln_db),
            (AdapterKind::WorkflowAnalysis, self.no_workflow),
            (AdapterKind::ContainerScan, self.no_container),
            (AdapterKind::CodePattern, self.no_code_analysis),
        ] {
            if disabled {
                options.set_enabled(kind, false);
            }
        }
    }
}

// ---- config ----

/// Manage ironaudit configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scan, engine, vuln_db).
        #[arg(long)]
        section: Option<String>,
    },
}
