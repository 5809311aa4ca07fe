//! 스캐너 설정
//!
//! [`ScannerConfig`]는 core의 [`EngineConfig`](ironaudit_core::config::EngineConfig)에서
//! 파생되며, 어댑터 한도와 재시도 정책을 담습니다.
//!
//! # 사용 예시
//!
//! ```
//! use ironaudit_scanner::ScannerConfig;
//!
//! // 기본값으로 생성
//! let config = ScannerConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use ironaudit_scanner::ScannerConfigBuilder;
//!
//! let config = ScannerConfigBuilder::new()
//!     .vuln_db_chunk_size(20)
//!     .rate_limit_ms(0)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.vuln_db_chunk_size, 20);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ironaudit_core::config::EngineConfig;

use crate::error::ScannerError;

/// 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 취약점 DB 배치 크기
    pub vuln_db_chunk_size: usize,
    /// 취약점 DB에 조회할 최대 의존성 수
    pub vuln_db_max_dependencies: usize,
    /// 어댑터별 업스트림 요청 최소 간격 (밀리초)
    pub rate_limit_ms: u64,
    /// 코드 패턴 분석이 읽는 설정 파일 최대 개수
    pub max_config_files: usize,
    /// 분석 대상 파일 최대 크기 (바이트)
    pub max_file_size: usize,
    /// 프록시 스캐너 A 경로
    pub proxy_a_scan_path: String,
    /// 프록시 스캐너 B 경로
    pub proxy_b_scan_path: String,
    /// 최종 결과 저장 실패 시 한 번 재시도
    pub retry_terminal_write: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_core(&EngineConfig::default())
    }
}

/// 설정 상한값 상수
const MAX_CHUNK_SIZE: usize = 1_000;
const MAX_FILE_SIZE: usize = 100 * 1024 * 1024; // 100 MB

impl ScannerConfig {
    /// core의 `[engine]` 섹션에서 스캐너 설정을 생성합니다.
    pub fn from_core(core: &EngineConfig) -> Self {
        Self {
            vuln_db_chunk_size: core.vuln_db_chunk_size,
            vuln_db_max_dependencies: core.vuln_db_max_dependencies,
            rate_limit_ms: core.rate_limit_ms,
            max_config_files: core.max_config_files,
            max_file_size: core.max_file_size,
            proxy_a_scan_path: core.proxy_a_scan_path.clone(),
            proxy_b_scan_path: core.proxy_b_scan_path.clone(),
            retry_terminal_write: core.retry_terminal_write,
        }
    }

    /// 요청 간격을 `Duration`으로 반환합니다.
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `vuln_db_chunk_size`: 1-1000
    /// - `vuln_db_max_dependencies`: 1 이상
    /// - `max_config_files`: 1 이상
    /// - `max_file_size`: 1-104857600 (100MB)
    /// - 프록시 경로: 비어 있지 않고 `/`로 시작
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.vuln_db_chunk_size == 0 || self.vuln_db_chunk_size > MAX_CHUNK_SIZE {
            return Err(ScannerError::Config {
                field: "vuln_db_chunk_size".to_owned(),
                reason: format!("must be 1-{MAX_CHUNK_SIZE}"),
            });
        }

        if self.vuln_db_max_dependencies == 0 {
            return Err(ScannerError::Config {
                field: "vuln_db_max_dependencies".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_config_files == 0 {
            return Err(ScannerError::Config {
                field: "max_config_files".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE {
            return Err(ScannerError::Config {
                field: "max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE}"),
            });
        }

        for (field, path) in [
            ("proxy_a_scan_path", &self.proxy_a_scan_path),
            ("proxy_b_scan_path", &self.proxy_b_scan_path),
        ] {
            if !path.starts_with('/') {
                return Err(ScannerError::Config {
                    field: field.to_owned(),
                    reason: "must start with '/'".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// [`ScannerConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 취약점 DB 배치 크기를 설정합니다.
    pub fn vuln_db_chunk_size(mut self, size: usize) -> Self {
        self.config.vuln_db_chunk_size = size;
        self
    }

    /// 취약점 DB 최대 조회 의존성 수를 설정합니다.
    pub fn vuln_db_max_dependencies(mut self, max: usize) -> Self {
        self.config.vuln_db_max_dependencies = max;
        self
    }

    /// 요청 간격(밀리초)을 설정합니다.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.config.rate_limit_ms = ms;
        self
    }

    /// 설정 파일 최대 개수를 설정합니다.
    pub fn max_config_files(mut self, max: usize) -> Self {
        self.config.max_config_files = max;
        self
    }

    /// 최대 파일 크기(바이트)를 설정합니다.
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = size;
        self
    }

    /// 프록시 스캐너 경로를 설정합니다.
    pub fn proxy_scan_paths(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.config.proxy_a_scan_path = a.into();
        self.config.proxy_b_scan_path = b.into();
        self
    }

    /// 최종 저장 재시도 여부를 설정합니다.
    pub fn retry_terminal_write(mut self, retry: bool) -> Self {
        self.config.retry_terminal_write = retry;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ScannerError::Config` 반환
    pub fn build(self) -> Result<ScannerConfig, ScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
