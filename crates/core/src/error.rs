//! 에러 타입: 도메인별 에러 정의

/// ironaudit 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronauditError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 파이프라인 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// 스캔 결과 저장소 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캔 파이프라인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 선행 단계(프로젝트 분석) 실패: 스캔 전체가 실패합니다
    #[error("prerequisite stage failed: {0}")]
    Prerequisite(String),

    /// 개별 스캐너 어댑터 실패
    #[error("adapter '{adapter}' failed: {reason}")]
    Adapter { adapter: String, reason: String },

    /// 허용되지 않는 상태 전이
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// 입력 검증 실패
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// 스캔 결과 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 대상 레코드 없음
    #[error("scan record not found: {0}")]
    NotFound(String),

    /// 이미 존재하는 레코드
    #[error("scan record already exists: {0}")]
    AlreadyExists(String),

    /// 쓰기 실패
    #[error("write failed: {0}")]
    Write(String),
}
