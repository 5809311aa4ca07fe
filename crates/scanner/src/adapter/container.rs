//! 컨테이너 설정 분석 어댑터 (`Dockerfile`)
//!
//! | 규칙 | 심각도 | ID |
//! |---|---|---|
//! | 태그가 없거나 `latest`인 베이스 이미지 | medium | `unpinned-base-image:<image>` |
//! | `USER` 없음 또는 마지막 `USER`가 root | medium | `container-runs-as-root` |
//! | 비밀값처럼 보이는 `ENV`/`ARG` 할당 | high | `secret-in-build-config:<key>` |
//! | 원격 URL에서 `ADD` | low | `remote-add:<url>` |

use std::sync::Arc;

use tracing::debug;

use ironaudit_core::types::Severity;

use crate::adapter::{ScannerAdapter, local_finding, text_of};
use crate::error::ScannerError;
use crate::ports::{BoxFuture, ContentClient};
use crate::rate_limit::RateLimiter;
use crate::raw::{LocalFinding, RawFinding};
use crate::types::{AdapterKind, ProjectInfo, ScanOptions};

/// 검사 대상 파일
pub const DOCKERFILE: &str = "Dockerfile";

/// 비밀값으로 보는 키 조각 (대문자 비교)
const SECRET_KEY_MARKERS: &[&str] = &[
    "PASSWORD",
    "PASSWD",
    "SECRET",
    "TOKEN",
    "API_KEY",
    "APIKEY",
    "PRIVATE_KEY",
    "ACCESS_KEY",
    "CREDENTIAL",
];

/// 컨테이너 설정 분석 어댑터
pub struct ContainerAdapter {
    content: Arc<dyn ContentClient>,
    limiter: RateLimiter,
}

impl ContainerAdapter {
    /// 새 어댑터를 생성합니다.
    pub fn new(content: Arc<dyn ContentClient>, limiter: RateLimiter) -> Self {
        Self { content, limiter }
    }

    async fn analyze(&self, project: &ProjectInfo) -> Result<Vec<RawFinding>, ScannerError> {
        self.limiter.acquire().await;
        let Some(bytes) = self
            .content
            .get_file(&project.repository, DOCKERFILE)
            .await?
        else {
            debug!("no Dockerfile");
            return Ok(Vec::new());
        };

        Ok(analyze_dockerfile(&text_of(&bytes), &project.revision)
            .into_iter()
            .map(RawFinding::Container)
            .collect())
    }
}

impl ScannerAdapter for ContainerAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ContainerScan
    }

    fn run<'a>(
        &'a self,
        project: &'a ProjectInfo,
        _options: &'a ScanOptions,
    ) -> BoxFuture<'a, Result<Vec<RawFinding>, ScannerError>> {
        Box::pin(self.analyze(project))
    }
}

/// `Dockerfile` 내용을 검사합니다.
pub fn analyze_dockerfile(text: &str, revision: &str) -> Vec<LocalFinding> {
    let mut findings = Vec::new();
    let mut stage_aliases: Vec<String> = Vec::new();
    let mut saw_from = false;
    let mut last_user: Option<String> = None;

    for line in logical_lines(text) {
        let Some((instruction, args)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let args = args.trim();

        match instruction.to_ascii_uppercase().as_str() {
            "FROM" => {
                saw_from = true;
                // USER는 스테이지마다 초기화
                last_user = None;
                if let Some(finding) = check_base_image(args, &mut stage_aliases) {
                    findings.push(finding);
                }
            }
            "USER" => {
                last_user = args.split_whitespace().next().map(str::to_owned);
            }
            "ENV" | "ARG" => {
                for (key, value) in assignments(args, instruction.eq_ignore_ascii_case("ENV")) {
                    if is_secret_key(key) && is_literal(value) {
                        findings.push(local_finding(
                            format!("secret-in-build-config:{key}"),
                            "Secret-looking value in Dockerfile",
                            format!(
                                "{} {key} assigns a literal value; build arguments and environment \
                                 variables are stored in image layers",
                                instruction.to_ascii_uppercase()
                            ),
                            Severity::High,
                            DOCKERFILE,
                            revision,
                        ));
                    }
                }
            }
            "ADD" => {
                let operands: Vec<&str> = args
                    .split_whitespace()
                    .filter(|t| !t.starts_with("--"))
                    .collect();
                let sources = operands.len().saturating_sub(1);
                for url in operands.iter().take(sources).filter(|s| is_remote(s)) {
                    findings.push(local_finding(
                        format!("remote-add:{url}"),
                        "ADD from remote URL",
                        format!("ADD downloads {url} without checksum verification; use curl with a pinned digest or COPY"),
                        Severity::Low,
                        DOCKERFILE,
                        revision,
                    ));
                }
            }
            _ => {}
        }
    }

    let runs_as_root = match last_user.as_deref() {
        None => true,
        Some(user) => {
            let name = user.split(':').next().unwrap_or(user);
            name == "root" || name == "0"
        }
    };
    if saw_from && runs_as_root {
        findings.push(local_finding(
            "container-runs-as-root",
            "Container runs as root",
            "The final stage has no USER directive or switches to root",
            Severity::Medium,
            DOCKERFILE,
            revision,
        ));
    }

    findings
}

/// 줄 이음(`\`)을 합치고 주석과 빈 줄을 제거합니다.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for raw in text.lines() {
        let trimmed = raw.trim();
        if current.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        match trimmed.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head);
                current.push(' ');
            }
            None => {
                current.push_str(trimmed);
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }
    lines
}

fn check_base_image(args: &str, stage_aliases: &mut Vec<String>) -> Option<LocalFinding> {
    let tokens: Vec<&str> = args
        .split_whitespace()
        .filter(|t| !t.starts_with("--"))
        .collect();
    let image = *tokens.first()?;

    let lowered = image.to_ascii_lowercase();
    let references_stage = stage_aliases.contains(&lowered);
    if let [_, keyword, alias, ..] = tokens.as_slice()
        && keyword.eq_ignore_ascii_case("as")
    {
        stage_aliases.push(alias.to_ascii_lowercase());
    }

    if references_stage || lowered == "scratch" || image.contains('$') || image.contains('@') {
        return None;
    }

    // 레지스트리 포트(`host:5000/img`)와 태그를 구분하기 위해 마지막 경로 요소만 본다
    let (repo_path, last) = image.rsplit_once('/').map_or(("", image), |(p, l)| (p, l));
    let (name, tag) = match last.split_once(':') {
        Some((name, tag)) => (name, Some(tag)),
        None => (last, None),
    };
    if tag.is_some_and(|t| t != "latest") {
        return None;
    }

    let image_name = if repo_path.is_empty() {
        name.to_owned()
    } else {
        format!("{repo_path}/{name}")
    };
    Some(local_finding(
        format!("unpinned-base-image:{image_name}"),
        "Base image not pinned to a version",
        format!("FROM {image} resolves to whatever 'latest' points to at build time"),
        Severity::Medium,
        image_name,
        "latest",
    ))
}

/// `ENV`/`ARG` 인자에서 `(키, 값)` 목록을 뽑습니다.
fn assignments(args: &str, legacy_env: bool) -> Vec<(&str, &str)> {
    if legacy_env && !args.split_whitespace().next().is_some_and(|t| t.contains('=')) {
        // ENV KEY value
        return args
            .split_once(char::is_whitespace)
            .map(|(k, v)| vec![(k, v.trim())])
            .unwrap_or_default();
    }
    args.split_whitespace()
        .filter_map(|token| token.split_once('='))
        .collect()
}

fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SECRET_KEY_MARKERS.iter().any(|m| upper.contains(m))
}

fn is_literal(value: &str) -> bool {
    let value = value.trim_matches(|c: char| c == '"' || c == '\'');
    !value.is_empty() && !value.starts_with('$')
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
