//! 버전 범위 매칭
//!
//! `semver` 크레이트로 `introduced <= version < fixed`를 판정합니다.
//! 잠금 파일에는 `v1.2.3`, `1.2` 같은 느슨한 표기도 있으므로 파싱 전에 정리하고,
//! 그래도 SemVer가 아니면 문자열 비교로 대신합니다.

use semver::Version;

use super::db::VersionRange;

/// 주어진 버전이 범위 중 하나에라도 포함되는지 확인합니다.
///
/// - `introduced`가 없으면 하한 없음
/// - `fixed`가 없으면 아직 수정되지 않음
/// - 범위 목록이 비어 있으면 어떤 버전도 영향받지 않음
pub fn is_affected(version: &str, ranges: &[VersionRange]) -> bool {
    matching_range(version, ranges).is_some()
}

/// 버전이 속한 첫 번째 범위를 반환합니다.
pub fn matching_range<'a>(version: &str, ranges: &'a [VersionRange]) -> Option<&'a VersionRange> {
    ranges.iter().find(|range| is_in_range(version, range))
}

/// `v` 접두사를 떼고 부족한 자리를 0으로 채워 SemVer로 파싱합니다.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V', '=']);
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // "1" / "1.2" (프리릴리스나 빌드 메타데이터가 없을 때만)
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let mut parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    parts.resize(3, "0");
    Version::parse(&parts.join(".")).ok()
}

fn is_in_range(version: &str, range: &VersionRange) -> bool {
    match parse_lenient(version) {
        Some(parsed) => is_in_range_semver(&parsed, range),
        None => is_in_range_string(version, range),
    }
}

fn is_in_range_semver(version: &Version, range: &VersionRange) -> bool {
    if let Some(introduced) = range.introduced.as_deref()
        && let Some(intro) = parse_lenient(introduced)
        && *version < intro
    {
        return false;
    }

    if let Some(fixed) = range.fixed.as_deref()
        && let Some(fix) = parse_lenient(fixed)
        && *version >= fix
    {
        return false;
    }

    true
}

fn is_in_range_string(version: &str, range: &VersionRange) -> bool {
    if let Some(introduced) = range.introduced.as_deref()
        && version < introduced
    {
        return false;
    }

    if let Some(fixed) = range.fixed.as_deref()
        && version >= fixed
    {
        return false;
    }

    true
}
