//! 스캐너 에러 타입
//!
//! [`ScannerError`]는 스캔 파이프라인 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<ScannerError> for IronauditError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **치명적 선행 단계**: `Analysis`: 스캔 전체가 `failed`로 종료
//! - **어댑터**: `Upstream`, `Decode`: 오케스트레이터가 잡아서 빈 결과로 대체
//! - **상태 머신**: `InvalidTransition`
//! - **저장소**: `Persistence`, `NotFound`, `AlreadyExists`
//! - **로컬 구현**: `LockfileParse`, `VulnDbLoad`, `VulnDbParse`, `InvalidPath`, `FileTooBig`, `Io`
//! - **설정**: `Config`

use ironaudit_core::error::{ConfigError, IronauditError, ScanError, StorageError};

use crate::types::ScanStatus;

/// 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// 프로젝트 분석 실패 (메시지는 그대로 스캔 결과에 기록됨)
    #[error("{0}")]
    Analysis(String),

    /// 업스트림 호출 실패
    #[error("upstream '{adapter}' failed: {reason}")]
    Upstream {
        /// 어댑터 또는 클라이언트 이름
        adapter: String,
        /// 실패 사유
        reason: String,
    },

    /// 업스트림 응답 본문 해석 실패
    #[error("failed to decode '{adapter}' response: {reason}")]
    Decode {
        /// 어댑터 이름
        adapter: String,
        /// 실패 사유
        reason: String,
    },

    /// 허용되지 않는 상태 전이
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// 현재 상태
        from: ScanStatus,
        /// 요청된 상태
        to: ScanStatus,
    },

    /// 저장소 쓰기 실패
    #[error("persistence error: {0}")]
    Persistence(String),

    /// 스캔 레코드 없음
    #[error("scan not found: {0}")]
    NotFound(String),

    /// 이미 존재하는 스캔 레코드
    #[error("scan already exists: {0}")]
    AlreadyExists(String),

    /// Lockfile 파싱 실패
    #[error("lockfile parse error: {path}: {reason}")]
    LockfileParse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 취약점 DB 로딩 실패
    #[error("vulnerability db load error: {path}: {reason}")]
    VulnDbLoad {
        /// DB 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 취약점 DB 파싱 실패
    #[error("vulnerability db parse error: {0}")]
    VulnDbParse(String),

    /// 저장소 밖을 가리키는 경로
    #[error("invalid repository path: {0}")]
    InvalidPath(String),

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: usize,
        /// 최대 허용 크기 (바이트)
        max: usize,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl ScannerError {
    /// 업스트림 에러를 생성합니다.
    pub fn upstream(adapter: impl Into<String>, reason: impl ToString) -> Self {
        Self::Upstream {
            adapter: adapter.into(),
            reason: reason.to_string(),
        }
    }

    /// 응답 디코딩 에러를 생성합니다.
    pub fn decode(adapter: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            adapter: adapter.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<ScannerError> for IronauditError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::Analysis(reason) => ScanError::Prerequisite(reason).into(),
            ScannerError::Upstream { adapter, reason } | ScannerError::Decode { adapter, reason } => {
                ScanError::Adapter { adapter, reason }.into()
            }
            ScannerError::InvalidTransition { from, to } => ScanError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into(),
            ScannerError::Persistence(msg) => StorageError::Write(msg).into(),
            ScannerError::NotFound(id) => StorageError::NotFound(id).into(),
            ScannerError::AlreadyExists(id) => StorageError::AlreadyExists(id).into(),
            ScannerError::Config { field, reason } => {
                ConfigError::InvalidValue { field, reason }.into()
            }
            ScannerError::Io { source, .. } => IronauditError::Io(source),
            other @ (ScannerError::LockfileParse { .. }
            | ScannerError::VulnDbLoad { .. }
            | ScannerError::VulnDbParse(_)
            | ScannerError::InvalidPath(_)
            | ScannerError::FileTooBig { .. }) => ScanError::InvalidInput(other.to_string()).into(),
        }
    }
}
