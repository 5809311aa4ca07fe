//! 도메인 타입: 크레이트 간 공유되는 공통 타입

use std::fmt;

use serde::{Deserialize, Serialize};

/// 취약점 심각도
///
/// 정규화된 취약점 레코드는 네 단계 중 하나만 가집니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적: 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 높은 심각도부터 나열한 전체 목록
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 스캐너마다 다른 표기(`moderate`, `info` 등)를
    /// 네 단계 중 하나로 접습니다. 알 수 없는 값은 `None`입니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "info" | "informational" | "negligible" | "minor" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" | "important" | "major" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 소문자 표기를 반환합니다 (메트릭 레이블, 직렬화 표기와 동일).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
