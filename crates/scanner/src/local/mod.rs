//! 로컬 실행용 포트 구현
//!
//! 네트워크 없이 체크아웃 디렉토리 하나로 파이프라인 전체를 돌릴 수 있도록
//! [`ProjectAnalyzer`](crate::ports::ProjectAnalyzer)와
//! [`ContentClient`](crate::ports::ContentClient)를 파일시스템으로 구현합니다.

pub mod analyzer;
pub mod content;
pub mod parser;

pub use analyzer::LockfileAnalyzer;
pub use content::LocalContentClient;
pub use parser::{CargoLockParser, LockfileDetector, LockfileParser, NpmLockParser};
