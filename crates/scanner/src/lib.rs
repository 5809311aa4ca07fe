#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScannerError`)
//! - [`config`]: Scanner configuration (`ScannerConfig`, builder)
//! - [`types`]: Domain types (`ScanRequest`, `ProjectInfo`, `VulnerabilityRecord`, `ScanResult`)
//! - [`raw`]: Source-shaped raw findings (`RawFinding`, npm audit / OSV / Snyk / Trivy shapes)
//! - [`ports`]: Upstream boundary traits (`ProjectAnalyzer`, `VulnDbClient`, `PersistenceGateway`, ...)
//! - [`adapter`]: Scanner adapters, one per vulnerability source (`ScannerAdapter` trait)
//! - [`normalize`]: Raw finding normalization and deduplication
//! - [`scoring`]: Severity counts, security score, risk level
//! - [`progress`]: Per-run progress tracking (`ProgressTracker`)
//! - [`rate_limit`]: Per-adapter request pacing (`RateLimiter`)
//! - [`orchestrator`]: Main orchestrator (`ScanOrchestrator`, `ScanOrchestratorBuilder`)
//! - [`persistence`]: In-memory `PersistenceGateway`
//! - [`local`]: Local checkout analysis (`LockfileAnalyzer`, `LocalContentClient`, lockfile parsers)
//! - [`vuln`]: Offline vulnerability database (`LocalVulnDb`)

pub mod adapter;
pub mod config;
pub mod error;
pub mod local;
pub mod normalize;
pub mod orchestrator;
pub mod persistence;
pub mod ports;
pub mod progress;
pub mod rate_limit;
pub mod raw;
pub mod scoring;
pub mod types;
pub mod vuln;

// --- Public API Re-exports ---

// Orchestrator
pub use orchestrator::{CancellationRegistry, ScanOrchestrator, ScanOrchestratorBuilder};

// Configuration
pub use config::{ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::ScannerError;

// Types
pub use types::{
    AdapterKind, Dependency, Ecosystem, ProjectInfo, RepositoryRef, RiskLevel, ScanOptions,
    ScanProgress, ScanRequest, ScanResult, ScanStage, ScanStatus, ScanSummary, ScanUpdate,
    VulnSource, VulnerabilityRecord,
};
pub use raw::RawFinding;

// Adapters
pub use adapter::{ScannerAdapter, standard_adapters};

// Ports
pub use ports::{
    ContentClient, DependencyRegistryClient, PersistenceGateway, ProjectAnalyzer,
    ProxyScanEndpoint, VulnDbClient,
};

// Local implementations
pub use local::{LocalContentClient, LockfileAnalyzer};
pub use persistence::InMemoryPersistence;
pub use vuln::LocalVulnDb;
