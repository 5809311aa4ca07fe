//! 잠금 파일 파서 -- `Cargo.lock`, `package-lock.json`
//!
//! [`LockfileParser`]는 형식별 파서가 구현하는 trait이고,
//! [`LockfileDetector`]는 파일 이름으로 담당 파서를 고릅니다.
//!
//! 파서 출력은 이름, 버전 순으로 정렬되고 `(이름, 버전)` 중복이 제거된
//! [`Dependency`] 목록입니다.

pub mod cargo;
pub mod npm;

use std::path::Path;

use crate::error::ScannerError;
use crate::types::{Dependency, Ecosystem};

pub use cargo::CargoLockParser;
pub use npm::NpmLockParser;

/// 잠금 파일 파서
pub trait LockfileParser: Send + Sync {
    /// 이 파서가 담당하는 생태계
    fn ecosystem(&self) -> Ecosystem;

    /// 파일 이름으로 처리 가능 여부를 판단합니다.
    fn can_parse(&self, path: &Path) -> bool;

    /// 잠금 파일 내용을 의존성 목록으로 바꿉니다.
    ///
    /// `source_path`는 에러 메시지에만 쓰입니다.
    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Dependency>, ScannerError>;
}

/// 잠금 파일 탐지기
pub struct LockfileDetector {
    parsers: Vec<Box<dyn LockfileParser>>,
}

impl LockfileDetector {
    /// 기본 파서(Cargo, npm)로 탐지기를 생성합니다.
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(CargoLockParser), Box::new(NpmLockParser)],
        }
    }

    /// 주어진 경로가 알려진 잠금 파일인지 확인합니다.
    pub fn is_lockfile(&self, path: &Path) -> bool {
        self.parser_for(path).is_some()
    }

    /// 경로를 처리할 파서를 반환합니다.
    pub fn parser_for(&self, path: &Path) -> Option<&dyn LockfileParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .map(|p| p.as_ref())
    }
}

impl Default for LockfileDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// 파일 이름이 정확히 `expected`인지 확인합니다.
pub(crate) fn file_name_is(path: &Path, expected: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name == expected)
}

/// 정렬 후 `(이름, 버전)` 중복을 제거합니다. 같은 항목 중 하나라도 런타임
/// 의존성이면 런타임으로 남깁니다.
pub(crate) fn finish(mut deps: Vec<Dependency>) -> Vec<Dependency> {
    deps.sort_by(|a, b| (&a.name, &a.version, a.dev).cmp(&(&b.name, &b.version, b.dev)));
    deps.dedup_by(|later, kept| later.name == kept.name && later.version == kept.version);
    deps
}
