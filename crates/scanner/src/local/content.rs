//! 파일시스템 기반 [`ContentClient`]
//!
//! 저장소 위치(`RepositoryRef::locator`)를 로컬 체크아웃 디렉토리로 보고,
//! 그 아래의 상대 경로만 읽습니다. 절대 경로와 `..`는 거부합니다.

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::trace;

use crate::error::ScannerError;
use crate::ports::{BoxFuture, ContentClient, DirectoryEntry, EntryKind};
use crate::types::RepositoryRef;

/// 로컬 체크아웃을 읽는 콘텐츠 클라이언트
#[derive(Debug, Clone)]
pub struct LocalContentClient {
    max_file_size: usize,
}

impl LocalContentClient {
    /// 파일 크기 상한을 지정하여 생성합니다.
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }
}

/// 저장소 루트와 상대 경로를 합칩니다. 루트 밖을 가리키면 에러입니다.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, ScannerError> {
    let relative = relative.trim_end_matches('/');
    let rel = Path::new(relative);
    if rel.is_absolute() || relative.starts_with('/') || relative.starts_with('\\') {
        return Err(ScannerError::InvalidPath(relative.to_owned()));
    }

    let mut resolved = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ScannerError::InvalidPath(relative.to_owned()));
            }
        }
    }
    Ok(resolved)
}

fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

fn io_error(path: &Path, source: io::Error) -> ScannerError {
    ScannerError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn list_blocking(root: &Path, dir: &str) -> Result<Option<Vec<DirectoryEntry>>, ScannerError> {
    let path = resolve(root, dir)?;
    let read_dir = match std::fs::read_dir(&path) {
        Ok(rd) => rd,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            trace!(path = %path.display(), "directory not found");
            return Ok(None);
        }
        Err(e) => return Err(io_error(&path, e)),
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| io_error(&path, e))?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(DirectoryEntry {
            path: join_relative(dir, &name),
            name,
            kind,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Some(entries))
}

fn read_blocking(root: &Path, relative: &str, max: usize) -> Result<Option<Bytes>, ScannerError> {
    let path = resolve(root, relative)?;
    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(&path, e)),
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > max {
        return Err(ScannerError::FileTooBig {
            path: relative.to_owned(),
            size,
            max,
        });
    }

    let content = std::fs::read(&path).map_err(|e| io_error(&path, e))?;
    Ok(Some(Bytes::from(content)))
}

/// blocking 작업 실패를 I/O 에러로 바꿉니다.
fn join_error(path: &str, e: tokio::task::JoinError) -> ScannerError {
    ScannerError::Io {
        path: path.to_owned(),
        source: io::Error::other(e),
    }
}

impl ContentClient for LocalContentClient {
    fn list_directory<'a>(
        &'a self,
        repository: &'a RepositoryRef,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<DirectoryEntry>>, ScannerError>> {
        Box::pin(async move {
            let root = PathBuf::from(&repository.locator);
            let dir = path.to_owned();
            tokio::task::spawn_blocking(move || list_blocking(&root, &dir))
                .await
                .map_err(|e| join_error(path, e))?
        })
    }

    fn get_file<'a>(
        &'a self,
        repository: &'a RepositoryRef,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ScannerError>> {
        Box::pin(async move {
            let root = PathBuf::from(&repository.locator);
            let relative = path.to_owned();
            let max = self.max_file_size;
            tokio::task::spawn_blocking(move || read_blocking(&root, &relative, max))
                .await
                .map_err(|e| join_error(path, e))?
        })
    }
}
