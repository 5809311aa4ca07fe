//! 취약점 정규화 및 중복 제거
//!
//! 모든 어댑터의 원시 결과를 하나로 모은 뒤 다음 순서로 처리합니다.
//!
//! ```text
//! Vec<RawFinding> --> VulnerabilityCandidate --> into_record() --> deduplicate --> Vec<VulnerabilityRecord>
//!                          |                          |                 |
//!                    pre-filter summary        invalid dropped    duplicates dropped
//! ```
//!
//! 중복 판정 키는 `(source, id, package_name)`이며 먼저 나온 항목이 남습니다.
//! 이미 정규화된 레코드를 다시 넣어도 결과는 같습니다.

pub mod candidate;

use std::collections::HashSet;

use tracing::trace;

use crate::raw::RawFinding;
use crate::scoring;
use crate::types::{ScanSummary, VulnSource, VulnerabilityRecord};

pub use candidate::VulnerabilityCandidate;

/// 정규화 결과
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    /// 유효하고 중복이 제거된 레코드
    pub records: Vec<VulnerabilityRecord>,
    /// 입력 후보 수
    pub candidate_count: usize,
    /// 유효성 검사로 버려진 수
    pub dropped_invalid: usize,
    /// 중복으로 버려진 수
    pub dropped_duplicates: usize,
    /// 필터링 전 후보 전체에 대한 요약 (로그용)
    pub pre_filter_summary: ScanSummary,
}

impl NormalizeOutcome {
    /// 버려진 후보 총 수
    pub fn dropped(&self) -> usize {
        self.dropped_invalid + self.dropped_duplicates
    }
}

/// 원시 결과 전체를 정규화합니다.
pub fn normalize(raw: &[RawFinding]) -> NormalizeOutcome {
    let candidates: Vec<VulnerabilityCandidate> =
        raw.iter().map(VulnerabilityCandidate::from).collect();
    normalize_candidates(candidates)
}

/// 이미 정규화된 레코드를 다시 정규화합니다.
pub fn normalize_records(records: &[VulnerabilityRecord]) -> Vec<VulnerabilityRecord> {
    let candidates = records.iter().map(VulnerabilityCandidate::from).collect();
    normalize_candidates(candidates).records
}

fn normalize_candidates(candidates: Vec<VulnerabilityCandidate>) -> NormalizeOutcome {
    let candidate_count = candidates.len();
    let pre_filter_summary = scoring::summarize_iter(
        candidates
            .iter()
            .map(|c| (c.severity, c.fixed_in.as_deref().is_some_and(|v| !v.is_empty()))),
    );

    let mut valid = Vec::with_capacity(candidate_count);
    let mut dropped_invalid = 0;
    for candidate in candidates {
        let source = candidate.source;
        let id = candidate.id.clone();
        match candidate.into_record() {
            Some(record) => valid.push(record),
            None => {
                dropped_invalid += 1;
                trace!(source = %source, id = ?id, "dropping invalid vulnerability candidate");
            }
        }
    }

    let (records, dropped_duplicates) = deduplicate(valid);

    NormalizeOutcome {
        records,
        candidate_count,
        dropped_invalid,
        dropped_duplicates,
        pre_filter_summary,
    }
}

/// `(source, id, package_name)`이 같은 레코드를 제거합니다. 첫 항목이 남습니다.
///
/// 남은 레코드와 제거된 개수를 반환합니다.
pub fn deduplicate(records: Vec<VulnerabilityRecord>) -> (Vec<VulnerabilityRecord>, usize) {
    let mut seen: HashSet<(VulnSource, String, String)> = HashSet::with_capacity(records.len());
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        let key = (record.source, record.id.clone(), record.package_name.clone());
        if seen.insert(key) {
            kept.push(record);
        } else {
            dropped += 1;
            trace!(
                source = %record.source,
                id = %record.id,
                package = %record.package_name,
                "dropping duplicate vulnerability"
            );
        }
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::LocalFinding;
    use ironaudit_core::types::Severity;

    fn record(source: VulnSource, id: &str, package: &str) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_owned(),
            title: format!("{id} title"),
            description: "d".to_owned(),
            severity: Severity::High,
            package_name: package.to_owned(),
            version: "1.0.0".to_owned(),
            fixed_in: None,
            references: vec![],
            cvss_score: None,
            source,
        }
    }

    fn local(id: &str, package: &str, version: &str) -> RawFinding {
        RawFinding::CodePattern(LocalFinding {
            id: id.to_owned(),
            title: "t".to_owned(),
            description: "d".to_owned(),
            severity: Severity::Low,
            package: package.to_owned(),
            version: version.to_owned(),
            references: vec![],
        })
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let mut first = record(VulnSource::VulnDb, "CVE-1", "a");
        first.title = "first".to_owned();
        let mut second = record(VulnSource::VulnDb, "CVE-1", "a");
        second.title = "second".to_owned();

        let (kept, dropped) = deduplicate(vec![first, second]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].title, "first");
    }

    #[test]
    fn deduplicate_distinguishes_source_and_package() {
        let (kept, dropped) = deduplicate(vec![
            record(VulnSource::VulnDb, "CVE-1", "a"),
            record(VulnSource::RegistryAudit, "CVE-1", "a"),
            record(VulnSource::VulnDb, "CVE-1", "b"),
        ]);
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn deduplicate_key_is_tuple_not_joined_string() {
        // "a-b" + "c" 와 "a" + "b-c" 는 문자열로 이으면 같아 보임
        let (kept, _) = deduplicate(vec![
            record(VulnSource::VulnDb, "a-b", "c"),
            record(VulnSource::VulnDb, "a", "b-c"),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn normalize_counts_invalid_and_duplicates() {
        let raw = vec![
            local("rule-1", "Dockerfile", "HEAD"),
            local("rule-1", "Dockerfile", "HEAD"),
            local("", "Dockerfile", "HEAD"),
            local("rule-2", "Dockerfile", "0"),
        ];
        let outcome = normalize(&raw);
        assert_eq!(outcome.candidate_count, 4);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.dropped_invalid, 2);
        assert_eq!(outcome.dropped_duplicates, 1);
        assert_eq!(outcome.dropped(), 3);
        // 필터 전 요약은 버려진 후보까지 셈
        assert_eq!(outcome.pre_filter_summary.total_vulnerabilities, 4);
    }

    #[test]
    fn normalize_empty_input() {
        let outcome = normalize(&[]);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pre_filter_summary.security_score, 100);
    }

    #[test]
    fn normalize_records_is_idempotent() {
        let raw = vec![
            local("rule-1", "SECURITY.md", "HEAD"),
            local("rule-2", "config.env", "HEAD"),
            local("rule-1", "SECURITY.md", "HEAD"),
        ];
        let once = normalize(&raw).records;
        let twice = normalize_records(&once);
        assert_eq!(once, twice);
        assert_eq!(normalize_records(&twice), twice);
    }
}
