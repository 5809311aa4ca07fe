//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 스캐너는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 경우 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironaudit_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 어댑터 레이블 키 (registry-audit, vuln-db, ...)
pub const LABEL_ADAPTER: &str = "adapter";

/// 결과 레이블 키 (completed, failed, cancelled)
pub const LABEL_RESULT: &str = "result";

// ─── 스캔 메트릭 ────────────────────────────────────────────────────

/// 종료된 스캔 수 (counter, label: result)
pub const SCANS_TOTAL: &str = "ironaudit_scans_total";

/// 실패한 어댑터 실행 수 (counter, label: adapter)
pub const ADAPTER_FAILURES_TOTAL: &str = "ironaudit_adapter_failures_total";

/// 정규화 후 남은 취약점 수 (counter, label: severity)
pub const FINDINGS_TOTAL: &str = "ironaudit_findings_total";

/// 유효성 검사 또는 중복 제거로 버려진 후보 수 (counter)
pub const FINDINGS_DROPPED_TOTAL: &str = "ironaudit_findings_dropped_total";

/// 스캔 소요 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "ironaudit_scan_duration_seconds";

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SCANS_TOTAL,
        "Total number of scans that reached a terminal status"
    );
    describe_counter!(
        ADAPTER_FAILURES_TOTAL,
        "Total number of scanner adapter invocations that failed and were skipped"
    );
    describe_counter!(
        FINDINGS_TOTAL,
        "Total number of normalized, deduplicated findings per severity"
    );
    describe_counter!(
        FINDINGS_DROPPED_TOTAL,
        "Total number of raw candidates dropped by validation or deduplication"
    );
    describe_histogram!(SCAN_DURATION_SECONDS, "End-to-end scan duration in seconds");
}
