//! Cargo.lock 파서
//!
//! `[[package]]` 배열을 읽습니다. `source`가 없는 항목은 워크스페이스 자신의
//! 크레이트이므로 의존성에서 제외합니다. Cargo.lock에는 개발 의존성 구분이
//! 없어 모두 런타임 의존성으로 취급합니다.

use std::path::Path;

use serde::Deserialize;

use super::{LockfileParser, file_name_is, finish};
use crate::error::ScannerError;
use crate::types::{Dependency, Ecosystem};

/// Cargo.lock 파서
pub struct CargoLockParser;

#[derive(Deserialize)]
struct CargoLockFile {
    #[serde(default, rename = "package")]
    packages: Vec<CargoPackage>,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
    version: String,
    #[serde(default)]
    source: Option<String>,
}

impl LockfileParser for CargoLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name_is(path, "Cargo.lock")
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Dependency>, ScannerError> {
        let lock: CargoLockFile = toml::from_str(content).map_err(|e| ScannerError::LockfileParse {
            path: source_path.to_owned(),
            reason: e.to_string(),
        })?;

        let deps = lock
            .packages
            .into_iter()
            .filter(|p| p.source.is_some())
            .map(|p| Dependency {
                name: p.name,
                version: p.version,
                ecosystem: Ecosystem::Cargo,
                dev: false,
            })
            .collect();

        Ok(finish(deps))
    }
}
