//! 로컬 체크아웃 분석기
//!
//! [`LockfileAnalyzer`]는 [`ProjectAnalyzer`]의 로컬 구현입니다. 저장소
//! 디렉토리를 얕게 탐색하여 잠금 파일을 파싱하고, `Dockerfile`과
//! `.github/workflows` 존재 여부를 기록합니다.
//!
//! 파일시스템 탐색은 동기 I/O이므로 `spawn_blocking`에서 실행합니다.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::parser::LockfileDetector;
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ProjectAnalyzer};
use crate::types::{Dependency, ProjectInfo, RepositoryRef};

/// 잠금 파일을 찾는 최대 디렉토리 깊이 (루트 = 0)
const MAX_DISCOVERY_DEPTH: usize = 3;

/// 탐색하지 않는 디렉토리
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "build"];

/// 잠금 파일 기반 프로젝트 분석기
pub struct LockfileAnalyzer {
    max_file_size: usize,
}

impl LockfileAnalyzer {
    /// 잠금 파일 크기 상한을 지정하여 생성합니다.
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }
}

impl ProjectAnalyzer for LockfileAnalyzer {
    fn analyze<'a>(
        &'a self,
        repository: &'a RepositoryRef,
    ) -> BoxFuture<'a, Result<ProjectInfo, ScannerError>> {
        Box::pin(async move {
            let root = PathBuf::from(&repository.locator);
            let max_file_size = self.max_file_size;
            let repo = repository.clone();

            let info = tokio::task::spawn_blocking(move || analyze_blocking(&root, repo, max_file_size))
                .await
                .map_err(|e| ScannerError::Analysis(format!("project analysis task failed: {e}")))??;

            info!(
                repository = %repository,
                ecosystems = ?info.ecosystems,
                dependencies = info.dependencies.len(),
                dockerfile = info.has_dockerfile,
                workflows = info.has_workflows,
                "project analyzed"
            );
            Ok(info)
        })
    }
}

fn analyze_blocking(
    root: &Path,
    repository: RepositoryRef,
    max_file_size: usize,
) -> Result<ProjectInfo, ScannerError> {
    if !root.is_dir() {
        return Err(ScannerError::Analysis(format!(
            "repository path is not a directory: {}",
            root.display()
        )));
    }

    let detector = LockfileDetector::new();
    let mut lockfiles = Vec::new();
    discover_lockfiles(root, &detector, 0, &mut lockfiles);
    lockfiles.sort();

    let mut ecosystems = BTreeSet::new();
    let mut dependencies: Vec<Dependency> = Vec::new();

    for path in &lockfiles {
        let Some(parser) = detector.parser_for(path) else {
            continue;
        };
        let rel_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();

        let size = std::fs::metadata(path)
            .map(|m| usize::try_from(m.len()).unwrap_or(usize::MAX))
            .unwrap_or(0);
        if size > max_file_size {
            warn!(path = %rel_path, size, max = max_file_size, "lockfile too large, skipping");
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %rel_path, error = %e, "failed to read lockfile");
                continue;
            }
        };

        match parser.parse(&content, &rel_path) {
            Ok(deps) => {
                debug!(path = %rel_path, count = deps.len(), "lockfile parsed");
                ecosystems.insert(parser.ecosystem());
                dependencies.extend(deps);
            }
            Err(e) => warn!(path = %rel_path, error = %e, "failed to parse lockfile, skipping"),
        }
    }

    let mut info = ProjectInfo::new(repository);
    info.ecosystems = ecosystems.into_iter().collect();
    info.dependencies = dependencies;
    info.has_dockerfile = root.join("Dockerfile").is_file();
    info.has_workflows = root.join(".github").join("workflows").is_dir();
    Ok(info)
}

/// 깊이 제한 안에서 잠금 파일을 찾습니다. 읽을 수 없는 디렉토리는 건너뜁니다.
fn discover_lockfiles(dir: &Path, detector: &LockfileDetector, depth: usize, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if depth < MAX_DISCOVERY_DEPTH && !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name) {
                discover_lockfiles(&path, detector, depth + 1, out);
            }
        } else if file_type.is_file() && detector.is_lockfile(&path) {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ecosystem;

    const CARGO_LOCK: &str = r#"
[[package]]
name = "app"
version = "0.1.0"

[[package]]
name = "serde"
version = "1.0.203"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#;

    const PACKAGE_LOCK: &str = r#"{
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "web" },
    "node_modules/lodash": { "version": "4.17.11" },
    "node_modules/jest": { "version": "29.7.0", "dev": true }
  }
}"#;

    #[tokio::test]
    async fn analyzes_polyglot_checkout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.lock"), CARGO_LOCK).unwrap();
        std::fs::create_dir_all(dir.path().join("web/node_modules/x")).unwrap();
        std::fs::write(dir.path().join("web/package-lock.json"), PACKAGE_LOCK).unwrap();
        // node_modules 아래 잠금 파일은 무시
        std::fs::write(dir.path().join("web/node_modules/x/package-lock.json"), PACKAGE_LOCK).unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();

        let repo = RepositoryRef::new(dir.path().display().to_string()).with_revision("v1.2.0");
        let info = LockfileAnalyzer::new(1024 * 1024).analyze(&repo).await.unwrap();

        assert_eq!(info.revision, "v1.2.0");
        assert_eq!(info.ecosystems, vec![Ecosystem::Cargo, Ecosystem::Npm]);
        assert_eq!(info.dependencies.len(), 3);
        assert!(info.has_dockerfile);
        assert!(info.has_workflows);
        assert_eq!(info.dependencies_in(Ecosystem::Npm).count(), 2);
    }

    #[tokio::test]
    async fn corrupt_lockfile_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.lock"), "[[package]\n").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), PACKAGE_LOCK).unwrap();

        let repo = RepositoryRef::new(dir.path().display().to_string());
        let info = LockfileAnalyzer::new(1024 * 1024).analyze(&repo).await.unwrap();
        assert_eq!(info.ecosystems, vec![Ecosystem::Npm]);
        assert!(!info.has_dockerfile);
        assert!(!info.has_workflows);
    }

    #[tokio::test]
    async fn oversized_lockfile_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), PACKAGE_LOCK).unwrap();

        let repo = RepositoryRef::new(dir.path().display().to_string());
        let info = LockfileAnalyzer::new(16).analyze(&repo).await.unwrap();
        assert!(info.dependencies.is_empty());
        assert!(info.ecosystems.is_empty());
    }

    #[tokio::test]
    async fn missing_checkout_is_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = RepositoryRef::new(dir.path().join("gone").display().to_string());
        let err = LockfileAnalyzer::new(1024).analyze(&repo).await.unwrap_err();
        assert!(matches!(err, ScannerError::Analysis(ref msg) if msg.contains("not a directory")));
    }
}
