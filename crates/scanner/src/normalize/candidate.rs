//! 원시 결과 -> 후보 -> 레코드 변환
//!
//! [`VulnerabilityCandidate`]의 필드는 모두 `Option`입니다. 값이 없으면 `None`으로
//! 남기고, 유효성 판단은 [`VulnerabilityCandidate::into_record`] 한 곳에서만 합니다.

use ironaudit_core::types::Severity;

use crate::raw::{
    LocalFinding, NpmFixAvailable, NpmVia, OsvVulnerability, RawFinding, RegistryAuditFinding,
    SnykIssue, TrivyVulnerability, VulnDbFinding,
};
use crate::types::{VulnSource, VulnerabilityRecord};

/// 유효하지 않은 제목 표식
const UNKNOWN_TITLE: &str = "Unknown vulnerability";

/// 정규화 전 후보
#[derive(Debug, Clone, PartialEq)]
pub struct VulnerabilityCandidate {
    /// 식별자
    pub id: Option<String>,
    /// 제목
    pub title: Option<String>,
    /// 설명
    pub description: Option<String>,
    /// 심각도 (알 수 없는 표기는 medium)
    pub severity: Severity,
    /// 패키지 이름
    pub package_name: Option<String>,
    /// 버전
    pub version: Option<String>,
    /// 수정 버전
    pub fixed_in: Option<String>,
    /// 참고 링크
    pub references: Vec<String>,
    /// CVSS 점수
    pub cvss_score: Option<f64>,
    /// 출처
    pub source: VulnSource,
}

impl VulnerabilityCandidate {
    /// 빈 후보를 생성합니다.
    pub fn empty(source: VulnSource) -> Self {
        Self {
            id: None,
            title: None,
            description: None,
            severity: Severity::Medium,
            package_name: None,
            version: None,
            fixed_in: None,
            references: Vec::new(),
            cvss_score: None,
            source,
        }
    }

    /// 유효한 후보만 레코드로 변환합니다.
    ///
    /// 다음 경우 `None`을 반환합니다.
    /// - ID가 없거나 비었거나 `unknown`이거나 출처별 표식을 포함
    /// - 패키지가 없거나 비었거나 `unknown`
    /// - 버전이 없거나 비었거나 `0` 또는 `unknown`
    /// - 제목이 `Unknown vulnerability`
    pub fn into_record(self) -> Option<VulnerabilityRecord> {
        let id = self.id.filter(|id| is_valid_id(id, self.source))?;
        let package_name = self.package_name.filter(|p| !is_unknown(p))?;
        let version = self
            .version
            .filter(|v| !is_unknown(v) && v.trim() != "0")?;
        if self
            .title
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(UNKNOWN_TITLE))
        {
            return None;
        }

        let title = self.title.unwrap_or_else(|| id.clone());
        let description = self.description.unwrap_or_else(|| title.clone());

        Some(VulnerabilityRecord {
            id,
            title,
            description,
            severity: self.severity,
            package_name,
            version,
            fixed_in: self.fixed_in,
            references: self.references,
            cvss_score: self.cvss_score,
            source: self.source,
        })
    }
}

impl From<&RawFinding> for VulnerabilityCandidate {
    fn from(raw: &RawFinding) -> Self {
        match raw {
            RawFinding::RegistryAudit(f) => from_registry_audit(f),
            RawFinding::VulnDb(f) => from_vuln_db(f),
            RawFinding::ProxyA(issue) => from_snyk(issue),
            RawFinding::ProxyB(vuln) => from_trivy(vuln),
            RawFinding::Workflow(f) => from_local(f, VulnSource::Workflow),
            RawFinding::Container(f) => from_local(f, VulnSource::Container),
            RawFinding::CodePattern(f) => from_local(f, VulnSource::CodePattern),
        }
    }
}

impl From<&VulnerabilityRecord> for VulnerabilityCandidate {
    fn from(record: &VulnerabilityRecord) -> Self {
        Self {
            id: Some(record.id.clone()),
            title: Some(record.title.clone()),
            description: Some(record.description.clone()),
            severity: record.severity,
            package_name: Some(record.package_name.clone()),
            version: Some(record.version.clone()),
            fixed_in: record.fixed_in.clone(),
            references: record.references.clone(),
            cvss_score: record.cvss_score,
            source: record.source,
        }
    }
}

// ─── 유효성 ─────────────────────────────────────────────────────────

fn is_unknown(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown")
}

fn is_valid_id(id: &str, source: VulnSource) -> bool {
    if is_unknown(id) {
        return false;
    }
    let lower = id.to_lowercase();
    let segments: Vec<&str> = lower.split(['-', ':']).collect();
    !source
        .sentinel_markers()
        .iter()
        .any(|marker| contains_segments(&segments, marker))
}

/// `marker`의 구분자 단위 조각들이 `segments` 안에 연속으로 나타나는지 확인합니다.
///
/// 부분 문자열이 아니라 조각 전체가 일치해야 하므로 `cleancss` 같은 패키지 이름은 걸리지 않습니다.
fn contains_segments(segments: &[&str], marker: &str) -> bool {
    let needle: Vec<&str> = marker.split(['-', ':']).collect();
    segments.windows(needle.len()).any(|window| window == needle.as_slice())
}

// ─── 추출 헬퍼 ───────────────────────────────────────────────────────

/// 비어 있지 않은 첫 값을 고릅니다.
fn first_non_empty<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_owned)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    first_non_empty([value])
}

fn parse_severity(value: Option<&str>) -> Option<Severity> {
    value.and_then(Severity::from_str_loose)
}

/// CVSS 점수를 심각도 구간으로 바꿉니다.
fn severity_from_cvss(score: f64) -> Option<Severity> {
    match score {
        s if s >= 9.0 => Some(Severity::Critical),
        s if s >= 7.0 => Some(Severity::High),
        s if s >= 4.0 => Some(Severity::Medium),
        s if s > 0.0 => Some(Severity::Low),
        _ => None,
    }
}

/// 권고 URL의 마지막 경로 요소가 권고 ID 형식인지 확인합니다.
fn is_advisory_id(segment: &str) -> bool {
    const PREFIXES: &[&str] = &["GHSA-", "CVE-", "RUSTSEC-", "PYSEC-", "GO-"];
    PREFIXES.iter().any(|p| segment.starts_with(p))
}

fn push_unique(references: &mut Vec<String>, url: Option<&str>) {
    if let Some(url) = non_empty(url)
        && !references.contains(&url)
    {
        references.push(url);
    }
}

// ─── 출처별 변환 ────────────────────────────────────────────────────

fn from_registry_audit(finding: &RegistryAuditFinding) -> VulnerabilityCandidate {
    let vuln = &finding.vulnerability;
    let advisories: Vec<_> = vuln
        .via
        .iter()
        .filter_map(|via| match via {
            NpmVia::Advisory(a) => Some(a),
            NpmVia::Package(_) => None,
        })
        .collect();
    let primary = advisories.first();

    let id = primary.and_then(|a| {
        let from_url = a
            .url
            .as_deref()
            .and_then(|u| u.rsplit('/').next())
            .filter(|seg| is_advisory_id(seg));
        first_non_empty([from_url]).or_else(|| a.source.map(|n| n.to_string()))
    });

    let titles: Vec<&str> = advisories
        .iter()
        .filter_map(|a| a.title.as_deref())
        .filter(|t| !t.trim().is_empty())
        .collect();
    let description = (!titles.is_empty()).then(|| titles.join("; "));

    let severity = parse_severity(vuln.severity.as_deref())
        .or_else(|| parse_severity(primary.and_then(|a| a.severity.as_deref())))
        .unwrap_or(Severity::Medium);

    let fixed_in = match &vuln.fix_available {
        Some(NpmFixAvailable::Fix { name, version, .. }) if *name == finding.package => {
            non_empty(Some(version.as_str()))
        }
        _ => None,
    };

    let mut references = Vec::new();
    for advisory in &advisories {
        push_unique(&mut references, advisory.url.as_deref());
    }

    VulnerabilityCandidate {
        id,
        title: non_empty(primary.and_then(|a| a.title.as_deref())),
        description,
        severity,
        package_name: first_non_empty([Some(finding.package.as_str()), vuln.name.as_deref()]),
        // 설치 버전이 없으면 영향 범위 문자열로 대체
        version: first_non_empty([
            finding.installed_version.as_deref(),
            vuln.range.as_deref(),
            primary.and_then(|a| a.range.as_deref()),
        ]),
        fixed_in,
        references,
        cvss_score: primary.and_then(|a| a.cvss.as_ref()).and_then(|c| c.score),
        source: VulnSource::RegistryAudit,
    }
}

fn from_vuln_db(finding: &VulnDbFinding) -> VulnerabilityCandidate {
    let vuln: &OsvVulnerability = &finding.vulnerability;

    let cvss_score = vuln
        .severity
        .iter()
        .filter_map(|s| s.score.as_deref())
        .find_map(|s| s.trim().parse::<f64>().ok());

    let db_severity = vuln
        .database_specific
        .as_ref()
        .and_then(|v| v.get("severity"))
        .and_then(|v| v.as_str());
    let severity = parse_severity(db_severity)
        .or_else(|| cvss_score.and_then(severity_from_cvss))
        .unwrap_or(Severity::Medium);

    // 조회한 패키지에 해당하는 affected 항목을 우선 사용
    let matching = vuln
        .affected
        .iter()
        .filter(|a| {
            a.package
                .as_ref()
                .is_none_or(|p| p.name == finding.package)
        })
        .collect::<Vec<_>>();

    let fixed_in = matching
        .iter()
        .flat_map(|a| a.ranges.iter())
        .flat_map(|r| r.events.iter())
        .find_map(|e| non_empty(e.fixed.as_deref()));

    let version = first_non_empty([
        Some(finding.version.as_str()),
        matching
            .iter()
            .find_map(|a| a.versions.first())
            .map(String::as_str),
    ]);

    let mut references = Vec::new();
    for reference in &vuln.references {
        push_unique(&mut references, reference.url.as_deref());
    }

    VulnerabilityCandidate {
        id: non_empty(vuln.id.as_deref()),
        title: first_non_empty([vuln.summary.as_deref(), vuln.aliases.first().map(String::as_str)]),
        description: first_non_empty([vuln.details.as_deref(), vuln.summary.as_deref()]),
        severity,
        package_name: non_empty(Some(finding.package.as_str())),
        version,
        fixed_in,
        references,
        cvss_score,
        source: VulnSource::VulnDb,
    }
}

fn from_snyk(issue: &SnykIssue) -> VulnerabilityCandidate {
    // "lodash@4.17.15" 형식의 마지막 경로 요소에서 버전 추출
    let from_path = issue
        .from
        .last()
        .and_then(|s| s.rsplit_once('@'))
        .map(|(_, v)| v);

    let mut references = Vec::new();
    for reference in &issue.references {
        push_unique(&mut references, reference.url.as_deref());
    }

    VulnerabilityCandidate {
        id: non_empty(issue.id.as_deref()),
        title: non_empty(issue.title.as_deref()),
        description: non_empty(issue.description.as_deref()),
        severity: parse_severity(issue.severity.as_deref())
            .or_else(|| issue.cvss_score.and_then(severity_from_cvss))
            .unwrap_or(Severity::Medium),
        package_name: non_empty(issue.package_name.as_deref()),
        version: first_non_empty([
            issue.version.as_deref(),
            issue.pkg_versions.first().map(String::as_str),
            from_path,
        ]),
        fixed_in: first_non_empty(issue.fixed_in.iter().map(|v| Some(v.as_str()))),
        references,
        cvss_score: issue.cvss_score,
        source: VulnSource::ProxyA,
    }
}

fn from_trivy(vuln: &TrivyVulnerability) -> VulnerabilityCandidate {
    let cvss_score = vuln
        .cvss
        .get("nvd")
        .and_then(|c| c.v3_score)
        .or_else(|| vuln.cvss.values().find_map(|c| c.v3_score))
        .or_else(|| vuln.cvss.values().find_map(|c| c.v2_score));

    // "4.17.21, 5.0.0" 처럼 여러 버전이 올 수 있음
    let fixed_in = vuln
        .fixed_version
        .as_deref()
        .and_then(|v| first_non_empty(v.split(',').map(Some)));

    let mut references = Vec::new();
    push_unique(&mut references, vuln.primary_url.as_deref());
    for url in &vuln.references {
        push_unique(&mut references, Some(url.as_str()));
    }

    VulnerabilityCandidate {
        id: non_empty(vuln.vulnerability_id.as_deref()),
        title: non_empty(vuln.title.as_deref()),
        description: non_empty(vuln.description.as_deref()),
        severity: parse_severity(vuln.severity.as_deref())
            .or_else(|| cvss_score.and_then(severity_from_cvss))
            .unwrap_or(Severity::Medium),
        package_name: non_empty(vuln.pkg_name.as_deref()),
        version: non_empty(vuln.installed_version.as_deref()),
        fixed_in,
        references,
        cvss_score,
        source: VulnSource::ProxyB,
    }
}

fn from_local(finding: &LocalFinding, source: VulnSource) -> VulnerabilityCandidate {
    VulnerabilityCandidate {
        id: non_empty(Some(finding.id.as_str())),
        title: non_empty(Some(finding.title.as_str())),
        description: non_empty(Some(finding.description.as_str())),
        severity: finding.severity,
        package_name: non_empty(Some(finding.package.as_str())),
        version: non_empty(Some(finding.version.as_str())),
        fixed_in: None,
        references: finding.references.clone(),
        cvss_score: None,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{
        NpmAdvisory, NpmVulnerability, OsvAffected, OsvEvent, OsvPackage, OsvRange,
        OsvReference, OsvSeverity,
    };

    fn lodash_audit() -> RegistryAuditFinding {
        RegistryAuditFinding {
            package: "lodash".to_owned(),
            installed_version: Some("4.17.11".to_owned()),
            vulnerability: NpmVulnerability {
                name: Some("lodash".to_owned()),
                severity: Some("critical".to_owned()),
                via: vec![
                    NpmVia::Advisory(NpmAdvisory {
                        source: Some(1065),
                        title: Some("Prototype Pollution".to_owned()),
                        url: Some("https://github.com/advisories/GHSA-jf85-cpcp-j695".to_owned()),
                        ..Default::default()
                    }),
                    NpmVia::Advisory(NpmAdvisory {
                        source: Some(1523),
                        title: Some("Command Injection".to_owned()),
                        ..Default::default()
                    }),
                    NpmVia::Package("other".to_owned()),
                ],
                fix_available: Some(NpmFixAvailable::Fix {
                    name: "lodash".to_owned(),
                    version: "4.17.21".to_owned(),
                    is_semver_major: false,
                }),
                ..Default::default()
            },
        }
    }

    #[test]
    fn registry_audit_extracts_fields() {
        let candidate = VulnerabilityCandidate::from(&RawFinding::RegistryAudit(lodash_audit()));
        assert_eq!(candidate.id.as_deref(), Some("GHSA-jf85-cpcp-j695"));
        assert_eq!(candidate.severity, Severity::Critical);
        assert_eq!(
            candidate.description.as_deref(),
            Some("Prototype Pollution; Command Injection")
        );
        assert_eq!(candidate.fixed_in.as_deref(), Some("4.17.21"));
        assert_eq!(candidate.version.as_deref(), Some("4.17.11"));

        let record = candidate.into_record().unwrap();
        assert_eq!(record.title, "Prototype Pollution");
        assert_eq!(record.source, VulnSource::RegistryAudit);
    }

    #[test]
    fn registry_audit_without_installed_version_uses_range() {
        let mut finding = lodash_audit();
        finding.installed_version = None;
        finding.vulnerability.range = Some("<0.2.1".to_owned());
        let record = VulnerabilityCandidate::from(&RawFinding::RegistryAudit(finding.clone()))
            .into_record()
            .expect("range stands in for the installed version");
        assert_eq!(record.version, "<0.2.1");

        // 패키지 범위도 없으면 권고 범위 사용
        finding.vulnerability.range = None;
        if let NpmVia::Advisory(a) = &mut finding.vulnerability.via[0] {
            a.range = Some("<4.17.12".to_owned());
        }
        let candidate = VulnerabilityCandidate::from(&RawFinding::RegistryAudit(finding));
        assert_eq!(candidate.version.as_deref(), Some("<4.17.12"));
    }

    #[test]
    fn registry_audit_falls_back_to_advisory_number() {
        let mut finding = lodash_audit();
        finding.vulnerability.via.remove(0);
        let candidate = VulnerabilityCandidate::from(&RawFinding::RegistryAudit(finding));
        assert_eq!(candidate.id.as_deref(), Some("1523"));
    }

    #[test]
    fn registry_audit_transitive_only_has_no_id() {
        let mut finding = lodash_audit();
        finding.vulnerability.via = vec![NpmVia::Package("qs".to_owned())];
        let candidate = VulnerabilityCandidate::from(&RawFinding::RegistryAudit(finding));
        assert!(candidate.id.is_none());
        assert!(candidate.into_record().is_none());
    }

    #[test]
    fn vuln_db_uses_database_severity_and_fixed_event() {
        let finding = VulnDbFinding {
            package: "serde".to_owned(),
            version: "1.0.0".to_owned(),
            vulnerability: OsvVulnerability {
                id: Some("RUSTSEC-2024-0001".to_owned()),
                summary: Some("Deserialization issue".to_owned()),
                severity: vec![OsvSeverity {
                    kind: Some("CVSS_V3".to_owned()),
                    score: Some("CVSS:3.1/AV:N/AC:L".to_owned()),
                }],
                affected: vec![OsvAffected {
                    package: Some(OsvPackage {
                        name: "serde".to_owned(),
                        ecosystem: "crates.io".to_owned(),
                    }),
                    ranges: vec![OsvRange {
                        kind: Some("SEMVER".to_owned()),
                        events: vec![
                            OsvEvent {
                                introduced: Some("0".to_owned()),
                                fixed: None,
                            },
                            OsvEvent {
                                introduced: None,
                                fixed: Some("1.0.100".to_owned()),
                            },
                        ],
                    }],
                    versions: vec![],
                }],
                references: vec![OsvReference {
                    kind: Some("ADVISORY".to_owned()),
                    url: Some("https://rustsec.org/advisories/RUSTSEC-2024-0001".to_owned()),
                }],
                database_specific: Some(serde_json::json!({ "severity": "HIGH" })),
                ..Default::default()
            },
        };
        let record = VulnerabilityCandidate::from(&RawFinding::VulnDb(finding))
            .into_record()
            .unwrap();
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.fixed_in.as_deref(), Some("1.0.100"));
        // 벡터 문자열은 숫자 점수가 아님
        assert!(record.cvss_score.is_none());
        assert_eq!(record.description, "Deserialization issue");
        assert_eq!(record.references.len(), 1);
    }

    #[test]
    fn vuln_db_numeric_score_sets_severity() {
        let finding = VulnDbFinding {
            package: "left-pad".to_owned(),
            version: "1.0.0".to_owned(),
            vulnerability: OsvVulnerability {
                id: Some("GHSA-xxxx-yyyy-zzzz".to_owned()),
                severity: vec![OsvSeverity {
                    kind: None,
                    score: Some("9.8".to_owned()),
                }],
                ..Default::default()
            },
        };
        let candidate = VulnerabilityCandidate::from(&RawFinding::VulnDb(finding));
        assert_eq!(candidate.severity, Severity::Critical);
        assert_eq!(candidate.cvss_score, Some(9.8));
    }

    #[test]
    fn snyk_version_from_nested_locations() {
        let issue = SnykIssue {
            id: Some("SNYK-JS-LODASH-567746".to_owned()),
            title: Some("Prototype Pollution".to_owned()),
            severity: Some("high".to_owned()),
            package_name: Some("lodash".to_owned()),
            from: vec!["app@1.0.0".to_owned(), "lodash@4.17.15".to_owned()],
            fixed_in: vec!["4.17.16".to_owned()],
            ..Default::default()
        };
        let candidate = VulnerabilityCandidate::from(&RawFinding::ProxyA(issue.clone()));
        assert_eq!(candidate.version.as_deref(), Some("4.17.15"));

        let with_pkg_versions = SnykIssue {
            pkg_versions: vec!["4.17.14".to_owned()],
            ..issue.clone()
        };
        let candidate = VulnerabilityCandidate::from(&RawFinding::ProxyA(with_pkg_versions));
        assert_eq!(candidate.version.as_deref(), Some("4.17.14"));

        let with_version = SnykIssue {
            version: Some("4.17.13".to_owned()),
            pkg_versions: vec!["4.17.14".to_owned()],
            ..issue
        };
        let candidate = VulnerabilityCandidate::from(&RawFinding::ProxyA(with_version));
        assert_eq!(candidate.version.as_deref(), Some("4.17.13"));
        assert_eq!(candidate.fixed_in.as_deref(), Some("4.17.16"));
    }

    #[test]
    fn trivy_takes_first_fixed_version_and_nvd_score() {
        let vuln = TrivyVulnerability {
            vulnerability_id: Some("CVE-2021-23337".to_owned()),
            pkg_name: Some("lodash".to_owned()),
            installed_version: Some("4.17.20".to_owned()),
            fixed_version: Some("4.17.21, 5.0.0".to_owned()),
            severity: Some("UNKNOWN".to_owned()),
            primary_url: Some("https://avd.aquasec.com/nvd/cve-2021-23337".to_owned()),
            references: vec!["https://avd.aquasec.com/nvd/cve-2021-23337".to_owned()],
            cvss: [(
                "nvd".to_owned(),
                crate::raw::TrivyCvss {
                    v3_score: Some(7.2),
                    v2_score: Some(6.5),
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let record = VulnerabilityCandidate::from(&RawFinding::ProxyB(vuln))
            .into_record()
            .unwrap();
        assert_eq!(record.fixed_in.as_deref(), Some("4.17.21"));
        assert_eq!(record.cvss_score, Some(7.2));
        // UNKNOWN 심각도는 CVSS 점수로 대체
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.references.len(), 1);
        assert_eq!(record.title, "CVE-2021-23337");
    }

    fn valid_candidate() -> VulnerabilityCandidate {
        VulnerabilityCandidate {
            id: Some("CVE-2024-1234".to_owned()),
            title: Some("Buffer overflow".to_owned()),
            package_name: Some("openssl".to_owned()),
            version: Some("1.1.1".to_owned()),
            ..VulnerabilityCandidate::empty(VulnSource::VulnDb)
        }
    }

    #[test]
    fn into_record_accepts_valid_candidate() {
        let record = valid_candidate().into_record().unwrap();
        assert_eq!(record.description, "Buffer overflow");
        assert_eq!(record.severity, Severity::Medium);
    }

    #[test]
    fn into_record_rejects_bad_ids() {
        for id in [None, Some(""), Some("  "), Some("unknown"), Some("UNKNOWN")] {
            let candidate = VulnerabilityCandidate {
                id: id.map(str::to_owned),
                ..valid_candidate()
            };
            assert!(candidate.into_record().is_none(), "{id:?}");
        }
    }

    #[test]
    fn into_record_rejects_sentinel_markers_per_source() {
        let candidate = VulnerabilityCandidate {
            id: Some("osv-not-found".to_owned()),
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_none());

        let candidate = VulnerabilityCandidate {
            id: Some("trivy-clean".to_owned()),
            source: VulnSource::ProxyB,
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_none());

        let candidate = VulnerabilityCandidate {
            id: Some("snyk:error".to_owned()),
            source: VulnSource::ProxyA,
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_none());

        // 로컬 분석기는 표식 검사를 하지 않음
        let candidate = VulnerabilityCandidate {
            id: Some("unpinned-action:error-handling.yml:actions/checkout".to_owned()),
            source: VulnSource::Workflow,
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_some());
    }

    #[test]
    fn into_record_keeps_ids_with_marker_substrings() {
        for id in [
            "SNYK-JS-CLEANCSS-1234",
            "SNYK-JS-ERRORHANDLER-5678",
            "CVE-2024-NOTFOUND",
        ] {
            let candidate = VulnerabilityCandidate {
                id: Some(id.to_owned()),
                source: VulnSource::ProxyA,
                ..valid_candidate()
            };
            let record = candidate.into_record();
            assert!(record.is_some(), "{id} should survive");
        }

        // 구분자로 나뉜 조각 전체가 일치하면 표식
        let candidate = VulnerabilityCandidate {
            id: Some("SNYK-JS-CLEAN".to_owned()),
            source: VulnSource::ProxyA,
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_none());
    }

    #[test]
    fn into_record_rejects_bad_package_and_version() {
        for package in [None, Some(""), Some("unknown")] {
            let candidate = VulnerabilityCandidate {
                package_name: package.map(str::to_owned),
                ..valid_candidate()
            };
            assert!(candidate.into_record().is_none());
        }
        for version in [None, Some(""), Some("0"), Some("unknown")] {
            let candidate = VulnerabilityCandidate {
                version: version.map(str::to_owned),
                ..valid_candidate()
            };
            assert!(candidate.into_record().is_none());
        }
    }

    #[test]
    fn into_record_rejects_unknown_title_case_insensitive() {
        let candidate = VulnerabilityCandidate {
            title: Some("unknown VULNERABILITY".to_owned()),
            ..valid_candidate()
        };
        assert!(candidate.into_record().is_none());
    }

    #[test]
    fn record_roundtrips_through_candidate() {
        let record = valid_candidate().into_record().unwrap();
        let again = VulnerabilityCandidate::from(&record).into_record().unwrap();
        assert_eq!(record, again);
    }
}
