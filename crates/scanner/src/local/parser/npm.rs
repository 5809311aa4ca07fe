//! package-lock.json 파서
//!
//! lockfile v2/v3의 `packages` 맵을 우선 읽고, 없으면 v1의 중첩
//! `dependencies` 트리를 읽습니다.
//!
//! ```json
//! {
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0" },
//!     "node_modules/lodash": { "version": "4.17.21" },
//!     "node_modules/jest": { "version": "29.7.0", "dev": true }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{LockfileParser, file_name_is, finish};
use crate::error::ScannerError;
use crate::types::{Dependency, Ecosystem};

/// package-lock.json 파서
pub struct NpmLockParser;

#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    packages: BTreeMap<String, NpmPackageEntry>,
    /// lockfile v1
    #[serde(default)]
    dependencies: BTreeMap<String, NpmLegacyEntry>,
}

#[derive(Deserialize)]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    link: bool,
}

#[derive(Deserialize)]
struct NpmLegacyEntry {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmLegacyEntry>,
}

impl LockfileParser for NpmLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        file_name_is(path, "package-lock.json")
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<Dependency>, ScannerError> {
        let lock: NpmLockFile =
            serde_json::from_str(content).map_err(|e| ScannerError::LockfileParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        let mut deps = Vec::new();
        if lock.packages.is_empty() {
            collect_legacy(&lock.dependencies, &mut deps);
        } else {
            for (key, entry) in &lock.packages {
                // 루트 패키지는 키가 빈 문자열, 워크스페이스 링크는 버전이 없음
                if key.is_empty() || entry.link {
                    continue;
                }
                let Some(version) = entry.version.clone() else {
                    continue;
                };
                let name = entry
                    .name
                    .clone()
                    .unwrap_or_else(|| extract_package_name(key).to_owned());
                deps.push(Dependency {
                    name,
                    version,
                    ecosystem: Ecosystem::Npm,
                    dev: entry.dev,
                });
            }
        }

        Ok(finish(deps))
    }
}

fn collect_legacy(entries: &BTreeMap<String, NpmLegacyEntry>, out: &mut Vec<Dependency>) {
    for (name, entry) in entries {
        if let Some(version) = &entry.version
            && !version.starts_with("file:")
        {
            out.push(Dependency {
                name: name.clone(),
                version: version.clone(),
                ecosystem: Ecosystem::Npm,
                dev: entry.dev,
            });
        }
        collect_legacy(&entry.dependencies, out);
    }
}

/// `node_modules/a/node_modules/@scope/b` -> `@scope/b`
fn extract_package_name(key: &str) -> &str {
    match key.rfind("node_modules/") {
        Some(pos) => &key[pos + "node_modules/".len()..],
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_LOCK_V3: &str = r#"{
  "name": "my-app",
  "version": "1.0.0",
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "my-app", "version": "1.0.0", "dependencies": { "lodash": "^4.17.21" } },
    "node_modules/lodash": {
      "version": "4.17.21",
      "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
      "integrity": "sha512-v2kDE..."
    },
    "node_modules/express": { "version": "4.18.2" },
    "node_modules/express/node_modules/debug": { "version": "2.6.9" },
    "node_modules/@babel/core": { "version": "7.24.0", "dev": true },
    "node_modules/local-lib": { "link": true, "resolved": "packages/local-lib" },
    "node_modules/broken": {}
  }
}"#;

    #[test]
    fn can_parse_only_package_lock() {
        let parser = NpmLockParser;
        assert!(parser.can_parse(Path::new("/project/package-lock.json")));
        assert!(!parser.can_parse(Path::new("package.json")));
        assert!(!parser.can_parse(Path::new("Cargo.lock")));
    }

    #[test]
    fn parses_v3_packages() {
        let deps = NpmLockParser.parse(PACKAGE_LOCK_V3, "package-lock.json").unwrap();
        let names: Vec<_> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["@babel/core", "debug", "express", "lodash"]);

        let babel = &deps[0];
        assert!(babel.dev);
        assert_eq!(babel.version, "7.24.0");
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::Npm));
    }

    #[test]
    fn parses_v1_dependency_tree() {
        let lock = r#"{
  "lockfileVersion": 1,
  "dependencies": {
    "minimist": { "version": "1.2.0" },
    "mocha": {
      "version": "10.2.0",
      "dev": true,
      "dependencies": { "ms": { "version": "2.1.3", "dev": true } }
    },
    "local": { "version": "file:../local" }
  }
}"#;
        let deps = NpmLockParser.parse(lock, "package-lock.json").unwrap();
        let summary: Vec<_> = deps
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_str(), d.dev))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("minimist", "1.2.0", false),
                ("mocha", "10.2.0", true),
                ("ms", "2.1.3", true),
            ]
        );
    }

    #[test]
    fn empty_lockfile_has_no_dependencies() {
        assert!(NpmLockParser.parse("{}", "package-lock.json").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = NpmLockParser.parse("{ nope", "web/package-lock.json").unwrap_err();
        match err {
            ScannerError::LockfileParse { path, .. } => assert_eq!(path, "web/package-lock.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extracts_scoped_nested_names() {
        assert_eq!(extract_package_name("node_modules/a/node_modules/@scope/b"), "@scope/b");
        assert_eq!(extract_package_name("packages/x"), "packages/x");
    }
}
