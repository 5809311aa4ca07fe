//! 점수 산정 -- 심각도 집계, 보안 점수, 위험 등급
//!
//! 점수는 `100 - (10·critical + 5·high + 2·medium + 1·low)`이며 0 아래로
//! 내려가지 않습니다. 개수로 정규화하지 않으므로 취약점이 많을수록 점수는
//! 단조 감소합니다.

use ironaudit_core::types::Severity;

use crate::types::{RiskLevel, ScanSummary, VulnerabilityRecord};

const CRITICAL_PENALTY: usize = 10;
const HIGH_PENALTY: usize = 5;
const MEDIUM_PENALTY: usize = 2;
const LOW_PENALTY: usize = 1;

/// medium 개수가 이 값을 넘으면 최소 `medium` 등급
const MEDIUM_RISK_THRESHOLD: usize = 5;
/// 전체 개수가 이 값을 넘으면 최소 `medium` 등급
const TOTAL_RISK_THRESHOLD: usize = 10;

/// 0-100 보안 점수를 계산합니다.
pub fn security_score(critical: usize, high: usize, medium: usize, low: usize) -> u8 {
    let penalty = critical
        .saturating_mul(CRITICAL_PENALTY)
        .saturating_add(high.saturating_mul(HIGH_PENALTY))
        .saturating_add(medium.saturating_mul(MEDIUM_PENALTY))
        .saturating_add(low.saturating_mul(LOW_PENALTY));
    let remaining = 100usize.saturating_sub(penalty);
    u8::try_from(remaining).unwrap_or(0)
}

/// 위험 등급을 결정합니다.
pub fn risk_level(critical: usize, high: usize, medium: usize, total: usize) -> RiskLevel {
    if critical > 0 {
        RiskLevel::Critical
    } else if high > 0 {
        RiskLevel::High
    } else if medium > MEDIUM_RISK_THRESHOLD || total > TOTAL_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// `(심각도, 수정 가능 여부)` 목록으로 요약을 만듭니다.
pub fn summarize_iter(items: impl IntoIterator<Item = (Severity, bool)>) -> ScanSummary {
    let mut summary = ScanSummary::default();
    for (severity, fixable) in items {
        summary.total_vulnerabilities += 1;
        match severity {
            Severity::Critical => summary.critical_count += 1,
            Severity::High => summary.high_count += 1,
            Severity::Medium => summary.medium_count += 1,
            Severity::Low => summary.low_count += 1,
        }
        if fixable {
            summary.fixable_count += 1;
        }
    }

    summary.security_score = security_score(
        summary.critical_count,
        summary.high_count,
        summary.medium_count,
        summary.low_count,
    );
    summary.risk_level = risk_level(
        summary.critical_count,
        summary.high_count,
        summary.medium_count,
        summary.total_vulnerabilities,
    );
    summary
}

/// 정규화된 레코드 목록으로 요약을 만듭니다.
pub fn summarize(records: &[VulnerabilityRecord]) -> ScanSummary {
    summarize_iter(records.iter().map(|r| (r.severity, r.is_fixable())))
}
