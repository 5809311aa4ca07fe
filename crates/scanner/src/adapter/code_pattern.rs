//! 코드 패턴 분석 어댑터
//!
//! - 보안 정책(`SECURITY.md`)이 루트, `.github/`, `docs/` 어디에도 없으면 low
//! - 설정 파일에 하드코딩된 비밀값이 보이면 high (값은 결과에 남기지 않음)
//! - 1.0 미만 버전에 고정된 런타임 의존성은 low
//!
//! 정규식은 어댑터 생성 시 한 번 컴파일합니다.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use ironaudit_core::types::Severity;

use crate::adapter::{ScannerAdapter, local_finding, text_of};
use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ContentClient, DirectoryEntry, EntryKind};
use crate::rate_limit::RateLimiter;
use crate::raw::{LocalFinding, RawFinding};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

/// 보안 정책 파일을 찾는 디렉토리 (루트 포함)
const POLICY_DIRS: &[&str] = &["", ".github", "docs"];

/// 설정 파일을 찾는 디렉토리
const CONFIG_DIRS: &[&str] = &["", "config"];

/// 설정 파일로 보는 확장자
const CONFIG_EXTENSIONS: &[&str] = &[
    ".env",
    ".ini",
    ".cfg",
    ".conf",
    ".toml",
    ".yaml",
    ".yml",
    ".json",
    ".properties",
];

/// 비밀값 검사에서 제외하는 생성 파일
const GENERATED_FILES: &[&str] = &["package-lock.json", "npm-shrinkwrap.json", "composer.lock"];

/// 키-값 할당 패턴 (키, 값)
const ASSIGNMENT_PATTERN: &str = r#"([A-Za-z0-9_.-]+)["']?\s*[:=]\s*["']?([^\s"',#]+)"#;

/// 비밀값 키로 보는 조각 (소문자 비교)
const SECRET_KEY_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "api-key",
    "private_key",
    "access_key",
];

/// 알려진 토큰 형식 (이름, 패턴)
const TOKEN_PATTERNS: &[(&str, &str)] = &[
    ("aws access key", r"\bAKIA[0-9A-Z]{16}\b"),
    ("github token", r"\bgh[pousr]_[A-Za-z0-9]{36,}\b"),
    ("slack token", r"\bxox[abprs]-[A-Za-z0-9-]{10,}"),
    ("private key", r"-----BEGIN [A-Z ]*PRIVATE KEY-----"),
    ("opaque token", r#"["'][A-Za-z0-9+/_=-]{40,}["']"#),
];

/// 비밀값 매처
pub struct SecretMatcher {
    assignment: Regex,
    tokens: Vec<(&'static str, Regex)>,
}

impl SecretMatcher {
    /// 패턴을 컴파일합니다.
    pub fn new() -> Result<Self, ScannerError> {
        let assignment = compile("assignment", ASSIGNMENT_PATTERN)?;
        let tokens = TOKEN_PATTERNS
            .iter()
            .map(|(name, pattern)| Ok((*name, compile(name, pattern)?)))
            .collect::<Result<Vec<_>, ScannerError>>()?;
        Ok(Self { assignment, tokens })
    }

    /// 한 줄을 검사하여 일치한 패턴 이름을 반환합니다.
    pub fn find(&self, line: &str) -> Option<&'static str> {
        if let Some((name, _)) = self.tokens.iter().find(|(_, re)| re.is_match(line)) {
            return Some(*name);
        }

        self.assignment
            .captures_iter(line)
            .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
            .any(|(key, value)| is_secret_key(key) && is_literal_secret(value))
            .then_some("secret assignment")
    }
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower == "key" || SECRET_KEY_MARKERS.iter().any(|m| lower.contains(m))
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ScannerError> {
    Regex::new(pattern).map_err(|e| ScannerError::Config {
        field: format!("secret_pattern.{name}"),
        reason: e.to_string(),
    })
}

/// 플레이스홀더나 참조가 아닌 실제 값인지 판단합니다.
fn is_literal_secret(value: &str) -> bool {
    const PLACEHOLDER_PREFIXES: &[char] = &['$', '{', '<', '%'];
    if value.len() < 4 || value.starts_with(PLACEHOLDER_PREFIXES) {
        return false;
    }
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "null" | "none" | "changeme" | "required" | "string"
    )
}

/// 코드 패턴 분석 어댑터
pub struct CodePatternAdapter {
    content: Arc<dyn ContentClient>,
    matcher: SecretMatcher,
    max_config_files: usize,
    max_file_size: usize,
    limiter: RateLimiter,
}

impl CodePatternAdapter {
    /// 새 어댑터를 생성합니다.
    pub fn new(
        content: Arc<dyn ContentClient>,
        max_config_files: usize,
        max_file_size: usize,
        limiter: RateLimiter,
    ) -> Result<Self, ScannerError> {
        Ok(Self {
            content,
            matcher: SecretMatcher::new()?,
            max_config_files,
            max_file_size,
            limiter,
        })
    }

    /// 스캐너 설정의 한도로 어댑터를 생성합니다.
    pub fn from_config(
        content: Arc<dyn ContentClient>,
        config: &ScannerConfig,
    ) -> Result<Self, ScannerError> {
        Self::new(
            content,
            config.max_config_files,
            config.max_file_size,
            RateLimiter::new(config.rate_limit()),
        )
    }

    async fn analyze(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        let mut findings = Vec::new();

        if let Some(finding) = self.check_security_policy(project).await? {
            findings.push(finding);
        }
        findings.extend(self.scan_config_files(project).await?);
        findings.extend(pre_release_dependencies(project));

        Ok(findings.into_iter().map(RawFinding::CodePattern).collect())
    }

    async fn list(
        &self,
        project: &ProjectInfo,
        dir: &str,
    ) -> Result<Vec<DirectoryEntry>, ScannerError> {
        self.limiter.acquire().await;
        Ok(self
            .content
            .list_directory(&project.repository, dir)
            .await?
            .unwrap_or_default())
    }

    async fn check_security_policy(
        &self,
        project: &ProjectInfo,
    ) -> Result<Option<LocalFinding>, ScannerError> {
        for &dir in POLICY_DIRS {
            let entries = self.list(project, dir).await?;
            if entries
                .iter()
                .any(|e| e.kind == EntryKind::File && e.name.eq_ignore_ascii_case("SECURITY.md"))
            {
                debug!(dir, "security policy found");
                return Ok(None);
            }
        }

        Ok(Some(local_finding(
            "missing-security-policy",
            "No security policy",
            "No SECURITY.md in the repository root, .github/ or docs/; reporters have no \
             documented way to disclose vulnerabilities",
            Severity::Low,
            project.repository.locator.as_str(),
            project.revision.as_str(),
        )))
    }

    async fn scan_config_files(
        &self,
        project: &ProjectInfo,
    ) -> Result<Vec<LocalFinding>, ScannerError> {
        let mut candidates = Vec::new();
        for &dir in CONFIG_DIRS {
            candidates.extend(
                self.list(project, dir)
                    .await?
                    .into_iter()
                    .filter(|e| e.kind == EntryKind::File && is_config_file(&e.name)),
            );
        }
        if candidates.len() > self.max_config_files {
            debug!(
                found = candidates.len(),
                limit = self.max_config_files,
                "config file list truncated"
            );
            candidates.truncate(self.max_config_files);
        }

        let mut findings = Vec::new();
        for entry in &candidates {
            self.limiter.acquire().await;
            let bytes = match self.content.get_file(&project.repository, &entry.path).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "failed to fetch config file, skipping");
                    continue;
                }
            };
            if bytes.len() > self.max_file_size {
                debug!(path = %entry.path, size = bytes.len(), "config file too large, skipping");
                continue;
            }
            findings.extend(self.scan_text(&entry.path, &text_of(&bytes), &project.revision));
        }
        Ok(findings)
    }

    /// 파일 하나에서 비밀값처럼 보이는 줄을 찾습니다 (줄마다 최대 한 건).
    pub fn scan_text(&self, path: &str, text: &str, revision: &str) -> Vec<LocalFinding> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim_start().starts_with('#'))
            .filter_map(|(idx, line)| {
                let kind = self.matcher.find(line)?;
                let line_no = idx + 1;
                Some(local_finding(
                    format!("hardcoded-secret:{path}:{line_no}"),
                    "Hardcoded secret in configuration",
                    format!("{path}:{line_no} contains a value matching the {kind} pattern (redacted)"),
                    Severity::High,
                    path,
                    revision,
                ))
            })
            .collect()
    }
}

impl ScannerAdapter for CodePatternAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::CodePattern
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.analyze(project))
    }
}

fn is_config_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if GENERATED_FILES.contains(&lower.as_str()) {
        return false;
    }
    lower.starts_with(".env") || CONFIG_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// 1.0 미만 버전의 런타임 의존성
fn pre_release_dependencies(project: &ProjectInfo) -> Vec<LocalFinding> {
    project
        .dependencies
        .iter()
        .filter(|d| !d.dev)
        .filter(|d| {
            semver::Version::parse(d.version.trim_start_matches('v'))
                .is_ok_and(|v| v.major == 0)
        })
        .map(|d| {
            local_finding(
                format!("pre-release-dependency:{}", d.name),
                "Dependency below 1.0",
                format!(
                    "{} is locked to {}, a pre-1.0 release that may be outdated or unmaintained",
                    d.name, d.version
                ),
                Severity::Low,
                d.name.as_str(),
                d.version.as_str(),
            )
        })
        .collect()
}
