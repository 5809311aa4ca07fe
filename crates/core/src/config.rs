//! 설정 관리: ironaudit.toml 파싱 및 런타임 설정
//!
//! [`IronauditConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONAUDIT_ENGINE_RATE_LIMIT_MS=250` 형식)
//! 3. 설정 파일 (`ironaudit.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironaudit_core::error::IronauditError> {
//! use ironaudit_core::config::IronauditConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronauditConfig::load("ironaudit.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronauditConfig::parse("[engine]\nvuln_db_chunk_size = 20")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronauditError};

/// 설정 상한값 상수
const MAX_CHUNK_SIZE: usize = 1_000;
const MAX_QUERIED_DEPENDENCIES: usize = 10_000;
const MAX_RATE_LIMIT_MS: u64 = 60_000;
const MAX_CONFIG_FILES: usize = 1_000;
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB
const MAX_PATH_LEN: usize = 4096;

/// ironaudit 통합 설정
///
/// `ironaudit.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronauditConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 기본 스캔 옵션
    #[serde(default)]
    pub scan: ScanDefaults,
    /// 스캔 엔진 한도 및 어댑터 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 로컬 취약점 DB 설정
    #[serde(default)]
    pub vuln_db: VulnDbConfig,
}

impl IronauditConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronauditError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값을 사용하고, 있으면 [`load`](Self::load)와 같이 동작합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, IronauditError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(IronauditError::Config(ConfigError::FileNotFound { .. })) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronauditError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronauditError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronauditError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronauditError> {
        toml::from_str(toml_str).map_err(|e| {
            IronauditError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 설정을 TOML 문자열로 직렬화합니다.
    pub fn to_toml(&self) -> Result<String, IronauditError> {
        toml::to_string_pretty(self).map_err(|e| {
            IronauditError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONAUDIT_{SECTION}_{FIELD}`
    /// 예: `IRONAUDIT_SCAN_SCAN_CONTAINERS=false`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONAUDIT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONAUDIT_GENERAL_LOG_FORMAT");

        // Scan
        override_bool(
            &mut self.scan.enable_dependency_audit,
            "IRONAUDIT_SCAN_ENABLE_DEPENDENCY_AUDIT",
        );
        override_bool(
            &mut self.scan.enable_vuln_db_query,
            "IRONAUDIT_SCAN_ENABLE_VULN_DB_QUERY",
        );
        override_bool(
            &mut self.scan.enable_proxy_scanner_a,
            "IRONAUDIT_SCAN_ENABLE_PROXY_SCANNER_A",
        );
        override_bool(
            &mut self.scan.enable_proxy_scanner_b,
            "IRONAUDIT_SCAN_ENABLE_PROXY_SCANNER_B",
        );
        override_bool(
            &mut self.scan.enable_workflow_analysis,
            "IRONAUDIT_SCAN_ENABLE_WORKFLOW_ANALYSIS",
        );
        override_bool(
            &mut self.scan.enable_container_scan,
            "IRONAUDIT_SCAN_ENABLE_CONTAINER_SCAN",
        );
        override_bool(
            &mut self.scan.enable_code_analysis,
            "IRONAUDIT_SCAN_ENABLE_CODE_ANALYSIS",
        );
        override_bool(
            &mut self.scan.scan_dependencies,
            "IRONAUDIT_SCAN_SCAN_DEPENDENCIES",
        );
        override_bool(&mut self.scan.scan_code, "IRONAUDIT_SCAN_SCAN_CODE");
        override_bool(
            &mut self.scan.scan_containers,
            "IRONAUDIT_SCAN_SCAN_CONTAINERS",
        );

        // Engine
        override_usize(
            &mut self.engine.vuln_db_chunk_size,
            "IRONAUDIT_ENGINE_VULN_DB_CHUNK_SIZE",
        );
        override_usize(
            &mut self.engine.vuln_db_max_dependencies,
            "IRONAUDIT_ENGINE_VULN_DB_MAX_DEPENDENCIES",
        );
        override_u64(
            &mut self.engine.rate_limit_ms,
            "IRONAUDIT_ENGINE_RATE_LIMIT_MS",
        );
        override_usize(
            &mut self.engine.max_config_files,
            "IRONAUDIT_ENGINE_MAX_CONFIG_FILES",
        );
        override_usize(
            &mut self.engine.max_file_size,
            "IRONAUDIT_ENGINE_MAX_FILE_SIZE",
        );
        override_string(
            &mut self.engine.proxy_a_scan_path,
            "IRONAUDIT_ENGINE_PROXY_A_SCAN_PATH",
        );
        override_string(
            &mut self.engine.proxy_b_scan_path,
            "IRONAUDIT_ENGINE_PROXY_B_SCAN_PATH",
        );
        override_bool(
            &mut self.engine.retry_terminal_write,
            "IRONAUDIT_ENGINE_RETRY_TERMINAL_WRITE",
        );

        // Vuln DB
        override_string(&mut self.vuln_db.path, "IRONAUDIT_VULN_DB_PATH");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronauditError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.engine.validate()?;

        if Path::new(&self.vuln_db.path)
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(invalid(
                "vuln_db.path",
                "path contains traversal pattern '..'".to_owned(),
            ));
        }

        if self.vuln_db.path.len() > MAX_PATH_LEN {
            return Err(invalid(
                "vuln_db.path",
                format!("path exceeds maximum length {MAX_PATH_LEN}"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> IronauditError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 기본 스캔 옵션
///
/// 어댑터는 자기 플래그와 카테고리 게이트가 모두 `true`일 때만 실행됩니다.
/// 프록시 스캐너는 서버 측 엔드포인트가 필요하므로 기본적으로 꺼져 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    /// 의존성 레지스트리 감사
    pub enable_dependency_audit: bool,
    /// 취약점 DB 조회
    pub enable_vuln_db_query: bool,
    /// 프록시 스캐너 A
    pub enable_proxy_scanner_a: bool,
    /// 프록시 스캐너 B
    pub enable_proxy_scanner_b: bool,
    /// CI 워크플로 정적 분석
    pub enable_workflow_analysis: bool,
    /// 컨테이너 설정 분석
    pub enable_container_scan: bool,
    /// 코드 패턴 분석
    pub enable_code_analysis: bool,
    /// 카테고리 게이트: 의존성 계열
    pub scan_dependencies: bool,
    /// 카테고리 게이트: 코드 계열
    pub scan_code: bool,
    /// 카테고리 게이트: 컨테이너 계열
    pub scan_containers: bool,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            enable_dependency_audit: true,
            enable_vuln_db_query: true,
            enable_proxy_scanner_a: false,
            enable_proxy_scanner_b: false,
            enable_workflow_analysis: true,
            enable_container_scan: true,
            enable_code_analysis: true,
            scan_dependencies: true,
            scan_code: true,
            scan_containers: true,
        }
    }
}

/// 스캔 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 취약점 DB 배치 조회 한 번에 담는 쿼리 수
    pub vuln_db_chunk_size: usize,
    /// 취약점 DB에 조회할 최대 의존성 수 (앞에서부터 자름)
    pub vuln_db_max_dependencies: usize,
    /// 어댑터별 업스트림 요청 최소 간격 (밀리초, 0이면 제한 없음)
    pub rate_limit_ms: u64,
    /// 코드 패턴 분석이 읽는 설정 파일 최대 개수
    pub max_config_files: usize,
    /// 분석 대상 파일 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 프록시 스캐너 A 엔드포인트 경로
    pub proxy_a_scan_path: String,
    /// 프록시 스캐너 B 엔드포인트 경로
    pub proxy_b_scan_path: String,
    /// 최종 결과 저장 실패 시 한 번 재시도
    pub retry_terminal_write: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vuln_db_chunk_size: 10,
            vuln_db_max_dependencies: 50,
            rate_limit_ms: 100,
            max_config_files: 20,
            max_file_size: 1024 * 1024, // 1 MB
            proxy_a_scan_path: "/api/scan/snyk".to_owned(),
            proxy_b_scan_path: "/api/scan/trivy".to_owned(),
            retry_terminal_write: false,
        }
    }
}

impl EngineConfig {
    /// 엔진 설정값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `vuln_db_chunk_size`: 1-1000
    /// - `vuln_db_max_dependencies`: 1-10000
    /// - `rate_limit_ms`: 0-60000
    /// - `max_config_files`: 1-1000
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - 프록시 경로: `/`로 시작
    pub fn validate(&self) -> Result<(), IronauditError> {
        if self.vuln_db_chunk_size == 0 || self.vuln_db_chunk_size > MAX_CHUNK_SIZE {
            return Err(invalid(
                "engine.vuln_db_chunk_size",
                format!("must be 1-{MAX_CHUNK_SIZE}"),
            ));
        }

        if self.vuln_db_max_dependencies == 0
            || self.vuln_db_max_dependencies > MAX_QUERIED_DEPENDENCIES
        {
            return Err(invalid(
                "engine.vuln_db_max_dependencies",
                format!("must be 1-{MAX_QUERIED_DEPENDENCIES}"),
            ));
        }

        if self.rate_limit_ms > MAX_RATE_LIMIT_MS {
            return Err(invalid(
                "engine.rate_limit_ms",
                format!("must be 0-{MAX_RATE_LIMIT_MS}"),
            ));
        }

        if self.max_config_files == 0 || self.max_config_files > MAX_CONFIG_FILES {
            return Err(invalid(
                "engine.max_config_files",
                format!("must be 1-{MAX_CONFIG_FILES}"),
            ));
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(invalid(
                "engine.max_file_size",
                format!("must be 1-{MAX_FILE_SIZE}"),
            ));
        }

        for (field, path) in [
            ("engine.proxy_a_scan_path", &self.proxy_a_scan_path),
            ("engine.proxy_b_scan_path", &self.proxy_b_scan_path),
        ] {
            if !path.starts_with('/') {
                return Err(invalid(field, "must start with '/'".to_owned()));
            }
        }

        Ok(())
    }
}

/// 로컬 취약점 DB 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnDbConfig {
    /// `{ecosystem}.json` 파일이 들어있는 디렉토리
    pub path: String,
}

impl Default for VulnDbConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/ironaudit/vuln-db".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = IronauditConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "pretty");
        assert!(config.scan.enable_dependency_audit);
        assert!(!config.scan.enable_proxy_scanner_a);
        assert_eq!(config.engine.vuln_db_chunk_size, 10);
        assert_eq!(config.engine.vuln_db_max_dependencies, 50);
    }

    #[test]
    fn default_config_passes_validation() {
        IronauditConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = IronauditConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.engine.rate_limit_ms, 100);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[scan]
scan_containers = false
"#;
        let config = IronauditConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "pretty");
        assert!(!config.scan.scan_containers);
        assert!(config.scan.scan_code);
    }

    #[test]
    fn from_str_invalid_toml_fails() {
        let err = IronauditConfig::parse("[general\nlog_level = ").unwrap_err();
        assert!(matches!(
            err,
            IronauditError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = IronauditConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = IronauditConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let mut config = IronauditConfig::default();
        config.engine.vuln_db_chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vuln_db_chunk_size"));
    }

    #[test]
    fn validate_rejects_too_many_queried_dependencies() {
        let mut config = IronauditConfig::default();
        config.engine.vuln_db_max_dependencies = MAX_QUERIED_DEPENDENCIES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_rate_limit() {
        let mut config = IronauditConfig::default();
        config.engine.rate_limit_ms = MAX_RATE_LIMIT_MS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_zero_rate_limit() {
        let mut config = IronauditConfig::default();
        config.engine.rate_limit_ms = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_relative_proxy_path() {
        let mut config = IronauditConfig::default();
        config.engine.proxy_b_scan_path = "api/scan".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("proxy_b_scan_path"));
    }

    #[test]
    fn validate_rejects_vuln_db_path_traversal() {
        let mut config = IronauditConfig::default();
        config.vuln_db.path = "/var/lib/../../etc".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn to_toml_roundtrip_preserves_values() {
        let mut config = IronauditConfig::default();
        config.engine.max_config_files = 7;
        let text = config.to_toml().unwrap();
        let back = IronauditConfig::parse(&text).unwrap();
        assert_eq!(back.engine.max_config_files, 7);
    }
}
