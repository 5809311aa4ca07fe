//! 스캔 오케스트레이터 -- 전체 스캔 흐름 관리
//!
//! [`ScanOrchestrator`]는 요청 한 건을 받아 고정된 단계 순서로 어댑터를 실행하고,
//! 결과를 정규화하고 점수를 매긴 뒤 최종 결과를 저장소에 한 번 기록합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! ScanRequest --> ProjectAnalyzer --> ProjectInfo
//!                                         |
//!        +-------------+------------------+------ ... ------+
//!        |             |                                    |
//!  registry-audit   vuln-db   proxy-a  proxy-b  workflow  container  code-pattern
//!        |             |                                    |
//!        +-------------+------------------+------ ... ------+
//!                                         |
//!                                  Vec<RawFinding>
//!                                         |
//!                              normalize --> summarize
//!                                         |
//!                      PersistenceGateway::update_by_scan_id
//! ```
//!
//! # 실패 정책
//!
//! - 프로젝트 분석 실패: 스캔은 `failed`, 이후 단계는 실행하지 않음
//! - 어댑터 실패: 경고 로그와 메트릭만 남기고 빈 결과로 계속 진행
//! - 진행률 기록 실패: 경고 로그만 남김
//! - 최종 결과 기록 실패: 에러 반환 (설정 시 한 번 재시도)
//!
//! # 취소
//!
//! [`ScanOrchestrator::cancel`]은 협력적 취소입니다. 단계 사이에서만 확인하며,
//! 아직 시작하지 않은 스캔에 대한 취소도 기억해 두었다가 첫 경계에서 반영합니다.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ironaudit_core::metrics as m;
use ironaudit_core::types::Severity;

use crate::adapter::ScannerAdapter;
use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::normalize;
use crate::ports::{PersistenceGateway, ProjectAnalyzer};
use crate::progress::ProgressTracker;
use crate::scoring;
use crate::types::{AdapterKind, ScanProgress, ScanRequest, ScanResult, ScanStage, ScanStatus, ScanUpdate};

/// 시작 전 취소 요청을 기억해 두는 최대 개수
///
/// 넘치면 가장 오래된 요청부터 버립니다.
pub const MAX_PENDING_CANCELLATIONS: usize = 256;

/// `scan_id`별 취소 토큰 저장소
///
/// 실행 중인 스캔의 토큰과 아직 시작하지 않은 스캔의 취소 요청을 따로 보관합니다.
/// 실행 중 항목은 스캔이 끝나면 오케스트레이터가 제거하고, 시작 전 요청은
/// [`MAX_PENDING_CANCELLATIONS`]개까지만 남습니다.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    active: HashMap<String, CancellationToken>,
    pending: VecDeque<String>,
}

impl RegistryState {
    fn take_pending(&mut self, scan_id: &str) -> bool {
        match self.pending.iter().position(|id| id == scan_id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }
}

impl CancellationRegistry {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 스캔의 토큰을 반환합니다. 없으면 새로 만들고 시작 전 취소 요청을 반영합니다.
    pub fn token_for(&self, scan_id: &str) -> CancellationToken {
        let mut state = self.state();
        if let Some(token) = state.active.get(scan_id) {
            return token.clone();
        }
        let token = CancellationToken::new();
        if state.take_pending(scan_id) {
            token.cancel();
        }
        state.active.insert(scan_id.to_owned(), token.clone());
        token
    }

    /// 취소를 요청합니다.
    ///
    /// 실행 중인 스캔이면 `true`, 시작 전 요청으로 기억만 해 두면 `false`를 반환합니다.
    pub fn cancel(&self, scan_id: &str) -> bool {
        let mut state = self.state();
        if let Some(token) = state.active.get(scan_id) {
            token.cancel();
            return true;
        }
        if !state.pending.iter().any(|id| id == scan_id) {
            if state.pending.len() >= MAX_PENDING_CANCELLATIONS {
                state.pending.pop_front();
            }
            state.pending.push_back(scan_id.to_owned());
        }
        false
    }

    /// 취소 요청 여부
    pub fn is_cancelled(&self, scan_id: &str) -> bool {
        let state = self.state();
        match state.active.get(scan_id) {
            Some(token) => token.is_cancelled(),
            None => state.pending.iter().any(|id| id == scan_id),
        }
    }

    /// 항목을 제거합니다.
    pub fn remove(&self, scan_id: &str) {
        let mut state = self.state();
        state.active.remove(scan_id);
        state.take_pending(scan_id);
    }

    /// 보관 중인 항목 수 (실행 중 + 시작 전 요청)
    pub fn len(&self) -> usize {
        let state = self.state();
        state.active.len() + state.pending.len()
    }

    /// 보관 중인 항목이 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 스캔 오케스트레이터
///
/// 여러 스캔을 동시에 실행할 수 있도록 `&self`만 요구합니다.
/// 태스크로 띄우려면 `Arc<ScanOrchestrator>`로 공유합니다.
pub struct ScanOrchestrator {
    /// 스캐너 설정
    config: ScannerConfig,
    /// 프로젝트 분석기
    analyzer: Arc<dyn ProjectAnalyzer>,
    /// 결과 저장소
    persistence: Arc<dyn PersistenceGateway>,
    /// 등록된 어댑터 (종류당 하나)
    adapters: Vec<Box<dyn ScannerAdapter>>,
    /// 취소 토큰
    cancellations: Arc<CancellationRegistry>,
}

impl ScanOrchestrator {
    /// 스캐너 설정
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// 등록된 어댑터 종류 (실행 순서)
    pub fn registered_adapters(&self) -> Vec<AdapterKind> {
        AdapterKind::ALL
            .into_iter()
            .filter(|kind| self.adapter(*kind).is_some())
            .collect()
    }

    /// 취소 토큰 저장소 핸들 (시그널 처리기 등에서 사용)
    pub fn cancellations(&self) -> Arc<CancellationRegistry> {
        Arc::clone(&self.cancellations)
    }

    /// 스캔 취소를 요청합니다.
    ///
    /// 다음 단계 경계에서 반영됩니다. 시작 전 스캔이면 `false`를 반환하지만
    /// 요청은 기억됩니다.
    pub fn cancel(&self, scan_id: &str) -> bool {
        let known = self.cancellations.cancel(scan_id);
        info!(scan_id, running = known, "scan cancellation requested");
        known
    }

    /// 스캔 한 건을 끝까지 실행합니다.
    ///
    /// 완료 또는 취소된 결과를 반환합니다. 프로젝트 분석이 실패하면 실패 결과를
    /// 저장한 뒤 [`ScannerError::Analysis`]를, 최종 결과 기록이 실패하면
    /// [`ScannerError::Persistence`]를 반환합니다.
    pub async fn run_scan(&self, request: ScanRequest) -> Result<ScanResult, ScannerError> {
        let scan_id = request.scan_id.clone();
        let token = self.cancellations.token_for(&scan_id);
        let outcome = self.execute(request, &token).await;
        self.cancellations.remove(&scan_id);
        outcome
    }

    async fn execute(
        &self,
        request: ScanRequest,
        token: &CancellationToken,
    ) -> Result<ScanResult, ScannerError> {
        let started = Instant::now();
        let mut running = ScanResult::new(request);
        running.mark_running()?;
        self.persistence.create(&running).await?;

        let scan_id = running.scan_id().to_owned();
        let options = running.request.options.clone();
        info!(
            scan_id = %scan_id,
            project_id = %running.request.project_id,
            repository = %running.request.repository,
            "scan started"
        );

        let mut tracker = ProgressTracker::new();

        if token.is_cancelled() {
            return self.finish_cancelled(&running, &tracker, started).await;
        }

        // 1. 프로젝트 분석 (실패 시 즉시 종료)
        let progress = tracker.enter(ScanStage::Analyze, None);
        self.report_progress(&scan_id, progress).await;

        let project = match self.analyzer.analyze(&running.request.repository).await {
            Ok(project) => project,
            Err(e) => {
                let message = e.to_string();
                error!(scan_id = %scan_id, error = %message, "project analysis failed");

                let mut failed = running.clone();
                failed.progress = tracker.current().clone();
                failed.fail(message.clone())?;
                self.persist_terminal(&running, failed, started).await?;
                return Err(ScannerError::Analysis(message));
            }
        };
        debug!(
            scan_id = %scan_id,
            ecosystems = project.ecosystems.len(),
            dependencies = project.dependencies.len(),
            has_dockerfile = project.has_dockerfile,
            has_workflows = project.has_workflows,
            "project analyzed"
        );

        // 2. 어댑터 단계 (고정 순서, 순차 실행)
        let mut raw = Vec::new();
        for kind in AdapterKind::ALL {
            if token.is_cancelled() {
                return self.finish_cancelled(&running, &tracker, started).await;
            }

            if !options.is_enabled(kind) {
                debug!(scan_id = %scan_id, adapter = kind.as_str(), "stage disabled, skipping");
                continue;
            }
            let Some(adapter) = self.adapter(kind) else {
                debug!(scan_id = %scan_id, adapter = kind.as_str(), "no adapter registered, skipping");
                continue;
            };

            let progress = tracker.enter(kind.stage(), Some(kind.as_str()));
            self.report_progress(&scan_id, progress).await;

            match adapter.run(&project, &options).await {
                Ok(findings) => {
                    debug!(
                        scan_id = %scan_id,
                        adapter = kind.as_str(),
                        findings = findings.len(),
                        "stage finished"
                    );
                    raw.extend(findings);
                }
                Err(e) => {
                    warn!(
                        scan_id = %scan_id,
                        adapter = kind.as_str(),
                        error = %e,
                        "adapter failed, continuing without its findings"
                    );
                    metrics::counter!(m::ADAPTER_FAILURES_TOTAL, m::LABEL_ADAPTER => kind.as_str())
                        .increment(1);
                }
            }
        }

        if token.is_cancelled() {
            return self.finish_cancelled(&running, &tracker, started).await;
        }

        // 3. 정규화 및 점수 산정
        let progress = tracker.enter(ScanStage::Normalize, None);
        self.report_progress(&scan_id, progress).await;

        let outcome = normalize::normalize(&raw);
        debug!(
            scan_id = %scan_id,
            candidates = outcome.candidate_count,
            pre_filter_total = outcome.pre_filter_summary.total_vulnerabilities,
            pre_filter_score = outcome.pre_filter_summary.security_score,
            dropped_invalid = outcome.dropped_invalid,
            dropped_duplicates = outcome.dropped_duplicates,
            "findings normalized"
        );
        metrics::counter!(m::FINDINGS_DROPPED_TOTAL).increment(outcome.dropped() as u64);

        let summary = scoring::summarize(&outcome.records);
        for severity in Severity::ALL {
            let count = summary.count_of(severity);
            if count > 0 {
                metrics::counter!(m::FINDINGS_TOTAL, m::LABEL_SEVERITY => severity.as_str())
                    .increment(count as u64);
            }
        }

        // 4. 최종 기록
        let mut completed = running.clone();
        completed.complete(outcome.records, summary)?;
        completed.progress = tracker.finish();
        let completed = self.persist_terminal(&running, completed, started).await?;

        info!(
            scan_id = %scan_id,
            total = completed.summary.total_vulnerabilities,
            critical = completed.summary.critical_count,
            high = completed.summary.high_count,
            security_score = completed.summary.security_score,
            risk_level = %completed.summary.risk_level,
            "scan completed"
        );
        Ok(completed)
    }

    fn adapter(&self, kind: AdapterKind) -> Option<&dyn ScannerAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.kind() == kind)
            .map(|adapter| adapter.as_ref())
    }

    async fn report_progress(&self, scan_id: &str, progress: ScanProgress) {
        debug!(
            scan_id,
            stage = %progress.stage,
            percentage = progress.percentage,
            "progress"
        );
        if let Err(e) = self.persistence.update_progress(scan_id, progress).await {
            warn!(scan_id, error = %e, "failed to record progress");
        }
    }

    async fn finish_cancelled(
        &self,
        running: &ScanResult,
        tracker: &ProgressTracker,
        started: Instant,
    ) -> Result<ScanResult, ScannerError> {
        let mut cancelled = running.clone();
        cancelled.progress = tracker.current().clone();
        cancelled.cancel()?;
        let cancelled = self.persist_terminal(running, cancelled, started).await?;
        info!(
            scan_id = %cancelled.scan_id(),
            stage = %cancelled.progress.stage,
            "scan cancelled"
        );
        Ok(cancelled)
    }

    /// 종료 결과를 기록합니다.
    ///
    /// 기록에 실패하면 실행 중 상태에서 `failed`로 전이한 결과를 한 번 더
    /// 기록해 보고 [`ScannerError::Persistence`]를 반환합니다.
    async fn persist_terminal(
        &self,
        running: &ScanResult,
        finished: ScanResult,
        started: Instant,
    ) -> Result<ScanResult, ScannerError> {
        let scan_id = finished.scan_id();

        let mut outcome = self
            .persistence
            .update_by_scan_id(scan_id, ScanUpdate::terminal(&finished))
            .await;
        if let Err(e) = &outcome
            && self.config.retry_terminal_write
        {
            warn!(scan_id, error = %e, "terminal write failed, retrying once");
            outcome = self
                .persistence
                .update_by_scan_id(scan_id, ScanUpdate::terminal(&finished))
                .await;
        }

        match outcome {
            Ok(()) => {
                record_terminal(finished.status, started);
                Ok(finished)
            }
            Err(e) => {
                let reason = format!("failed to persist {} result: {e}", finished.status);
                error!(scan_id, error = %e, status = %finished.status, "terminal write failed");

                if finished.status != ScanStatus::Failed {
                    let mut failed = running.clone();
                    failed.progress = finished.progress.clone();
                    if failed.fail(reason.clone()).is_ok()
                        && let Err(e) = self
                            .persistence
                            .update_by_scan_id(scan_id, ScanUpdate::terminal(&failed))
                            .await
                    {
                        warn!(scan_id, error = %e, "failed to record scan failure");
                    }
                }

                record_terminal(ScanStatus::Failed, started);
                Err(ScannerError::Persistence(reason))
            }
        }
    }
}

fn record_terminal(status: ScanStatus, started: Instant) {
    metrics::counter!(m::SCANS_TOTAL, m::LABEL_RESULT => status.as_str()).increment(1);
    metrics::histogram!(m::SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

/// 스캔 오케스트레이터 빌더
///
/// 분석기와 저장소는 필수입니다. 어댑터는 종류당 하나만 유지되며,
/// 같은 종류를 다시 등록하면 이전 어댑터를 대체합니다.
pub struct ScanOrchestratorBuilder {
    config: ScannerConfig,
    analyzer: Option<Arc<dyn ProjectAnalyzer>>,
    persistence: Option<Arc<dyn PersistenceGateway>>,
    adapters: Vec<Box<dyn ScannerAdapter>>,
    cancellations: Option<Arc<CancellationRegistry>>,
}

impl ScanOrchestratorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
            analyzer: None,
            persistence: None,
            adapters: Vec::new(),
            cancellations: None,
        }
    }

    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 프로젝트 분석기를 지정합니다.
    pub fn analyzer(mut self, analyzer: Arc<dyn ProjectAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// 결과 저장소를 지정합니다.
    pub fn persistence(mut self, persistence: Arc<dyn PersistenceGateway>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// 어댑터를 등록합니다.
    pub fn adapter(mut self, adapter: Box<dyn ScannerAdapter>) -> Self {
        let kind = adapter.kind();
        self.adapters.retain(|existing| existing.kind() != kind);
        self.adapters.push(adapter);
        self
    }

    /// 여러 어댑터를 한 번에 등록합니다.
    pub fn adapters(self, adapters: impl IntoIterator<Item = Box<dyn ScannerAdapter>>) -> Self {
        adapters
            .into_iter()
            .fold(self, |builder, adapter| builder.adapter(adapter))
    }

    /// 외부에서 만든 취소 토큰 저장소를 공유합니다.
    pub fn cancellations(mut self, cancellations: Arc<CancellationRegistry>) -> Self {
        self.cancellations = Some(cancellations);
        self
    }

    /// 오케스트레이터를 빌드합니다.
    pub fn build(self) -> Result<ScanOrchestrator, ScannerError> {
        self.config.validate()?;

        let analyzer = self.analyzer.ok_or_else(|| ScannerError::Config {
            field: "analyzer".to_owned(),
            reason: "a project analyzer is required".to_owned(),
        })?;
        let persistence = self.persistence.ok_or_else(|| ScannerError::Config {
            field: "persistence".to_owned(),
            reason: "a persistence gateway is required".to_owned(),
        })?;

        let orchestrator = ScanOrchestrator {
            config: self.config,
            analyzer,
            persistence,
            adapters: self.adapters,
            cancellations: self.cancellations.unwrap_or_default(),
        };
        debug!(adapters = ?orchestrator.registered_adapters(), "scan orchestrator built");
        Ok(orchestrator)
    }
}

impl Default for ScanOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
