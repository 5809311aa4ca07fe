//! 오프라인 취약점 조회
//!
//! [`LocalVulnDb`]는 디스크의 권고 JSON을 읽어 취약점 DB 조회와 npm 레지스트리
//! 감사를 네트워크 없이 수행합니다.
//!
//! 1. `LocalVulnDb::load(dir)` -- 생태계별 JSON 로드 (blocking 스레드)
//! 2. `Arc<LocalVulnDb>`를 [`VulnDbAdapter`](crate::adapter::VulnDbAdapter)와
//!    [`RegistryAuditAdapter`](crate::adapter::RegistryAuditAdapter)에 함께 주입

pub mod db;
pub mod version;

pub use db::{LocalVulnDb, VersionRange, VulnDbEntry};
