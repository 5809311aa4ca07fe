//! CI 워크플로 정적 분석 어댑터
//!
//! `.github/workflows` 아래 `*.yml`/`*.yaml` 파일을 줄 단위로 검사합니다.
//!
//! | 규칙 | 심각도 | ID |
//! |---|---|---|
//! | 커밋 SHA가 아닌 ref로 고정된 `uses:` | medium | `unpinned-action:<file>:<action>` |
//! | 여러 줄 인라인 스크립트 `run: \|` / `run: >` | low | `inline-script:<file>:<line>` |
//! | `pull_request_target` 트리거 | high | `pull-request-target:<file>` |

use std::sync::Arc;

use tracing::{debug, warn};

use ironaudit_core::types::Severity;

use crate::adapter::{ScannerAdapter, local_finding, text_of};
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ContentClient, EntryKind};
use crate::rate_limit::RateLimiter;
use crate::raw::{LocalFinding, RawFinding};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

/// 워크플로 디렉토리
pub const WORKFLOW_DIR: &str = ".github/workflows";

/// ref가 없는 `uses:`에 붙이는 버전 표기
const UNVERSIONED_REF: &str = "default-branch";

/// CI 워크플로 분석 어댑터
pub struct WorkflowAdapter {
    content: Arc<dyn ContentClient>,
    limiter: RateLimiter,
}

impl WorkflowAdapter {
    /// 새 어댑터를 생성합니다.
    pub fn new(content: Arc<dyn ContentClient>, limiter: RateLimiter) -> Self {
        Self { content, limiter }
    }

    async fn analyze(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        self.limiter.acquire().await;
        let Some(entries) = self
            .content
            .list_directory(&project.repository, WORKFLOW_DIR)
            .await?
        else {
            debug!("no workflow directory");
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for entry in entries
            .iter()
            .filter(|e| e.kind == EntryKind::File && is_workflow_file(&e.name))
        {
            self.limiter.acquire().await;
            let bytes = match self.content.get_file(&project.repository, &entry.path).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "failed to fetch workflow file, skipping");
                    continue;
                }
            };
            let text = text_of(&bytes);
            findings.extend(
                analyze_workflow(&entry.name, &text, &project.revision)
                    .into_iter()
                    .map(RawFinding::Workflow),
            );
        }

        Ok(findings)
    }
}

impl ScannerAdapter for WorkflowAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::WorkflowAnalysis
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.analyze(project))
    }
}

fn is_workflow_file(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

/// 워크플로 파일 하나를 검사합니다.
pub fn analyze_workflow(file: &str, text: &str, revision: &str) -> Vec<LocalFinding> {
    let mut findings = Vec::new();
    let mut uses_pull_request_target = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        let item = line
            .strip_prefix('-')
            .map(str::trim_start)
            .unwrap_or(line);

        if let Some(value) = item.strip_prefix("uses:") {
            if let Some(finding) = check_uses(file, value) {
                findings.push(finding);
            }
        } else if let Some(value) = item.strip_prefix("run:") {
            let value = value.trim();
            if value.starts_with('|') || value.starts_with('>') {
                let line_no = idx + 1;
                findings.push(local_finding(
                    format!("inline-script:{file}:{line_no}"),
                    "Multi-line inline script in workflow",
                    format!(
                        "{file}:{line_no} runs a multi-line inline shell script; move it into a \
                         versioned script file so it can be reviewed and tested"
                    ),
                    Severity::Low,
                    file,
                    revision,
                ));
            }
        } else if is_pull_request_target(item) {
            uses_pull_request_target = true;
        }
    }

    if uses_pull_request_target {
        findings.push(local_finding(
            format!("pull-request-target:{file}"),
            "Workflow triggered by pull_request_target",
            format!(
                "{file} runs on pull_request_target, which executes with repository secrets \
                 and write permissions for pull requests from forks"
            ),
            Severity::High,
            file,
            revision,
        ));
    }

    findings
}

/// `uses:` 값이 커밋 SHA로 고정되어 있지 않으면 결과를 만듭니다.
fn check_uses(file: &str, value: &str) -> Option<LocalFinding> {
    let reference = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
    if reference.is_empty() || reference.starts_with("./") || reference.starts_with("docker://") {
        return None;
    }

    let (action, git_ref) = match reference.split_once('@') {
        Some((action, git_ref)) if is_commit_sha(git_ref) => {
            debug!(action, "action pinned to commit");
            return None;
        }
        Some((action, git_ref)) => (action, git_ref),
        None => (reference, UNVERSIONED_REF),
    };

    Some(local_finding(
        format!("unpinned-action:{file}:{action}"),
        "Action not pinned to a commit SHA",
        format!(
            "{file} uses {action}@{git_ref}; tags and branches are mutable, pin the action to a \
             full 40-character commit SHA"
        ),
        Severity::Medium,
        action,
        git_ref,
    ))
}

fn is_commit_sha(git_ref: &str) -> bool {
    git_ref.len() == 40 && git_ref.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_pull_request_target(item: &str) -> bool {
    item == "pull_request_target"
        || item.starts_with("pull_request_target:")
        || (item.starts_with("on:") && item.contains("pull_request_target"))
}

/// YAML 주석을 제거합니다.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(pos) => &line[..pos],
        None => line,
    }
}
