//! 스캔 한 건의 진행률 추적
//!
//! [`ProgressTracker`]는 실행마다 새로 만들어지는 진행률 컨텍스트입니다.
//! 단계 진입 시 퍼센트는 고정 순서에서 앞선 모든 단계 가중치의 합이며,
//! 건너뛴 단계도 합에 포함됩니다. 따라서 같은 단계는 항상 같은 값을 갖고
//! 값은 감소하지 않습니다.

use crate::types::{ScanProgress, ScanStage};

/// 실행 단위 진행률 컨텍스트
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    current: ScanProgress,
}

impl ProgressTracker {
    /// `queued` 상태로 시작합니다.
    pub fn new() -> Self {
        Self {
            current: ScanProgress::default(),
        }
    }

    /// 단계 진입 시점의 퍼센트 (앞선 파이프라인 단계 가중치 합)
    pub fn percentage_at(stage: ScanStage) -> u8 {
        match stage {
            ScanStage::Queued => 0,
            ScanStage::Complete => 100,
            _ => ScanStage::PIPELINE
                .iter()
                .take_while(|s| **s != stage)
                .map(|s| s.weight())
                .sum(),
        }
    }

    /// 단계에 진입하고 새 진행률 스냅샷을 반환합니다.
    pub fn enter(&mut self, stage: ScanStage, current_task: Option<&str>) -> ScanProgress {
        let percentage = Self::percentage_at(stage).max(self.current.percentage);
        self.current = ScanProgress {
            stage,
            percentage,
            message: stage.message().to_owned(),
            current_task: current_task.map(str::to_owned),
        };
        self.current.clone()
    }

    /// 완료 스냅샷 (100%)
    pub fn finish(&mut self) -> ScanProgress {
        self.enter(ScanStage::Complete, None)
    }

    /// 마지막으로 기록한 스냅샷
    pub fn current(&self) -> &ScanProgress {
        &self.current
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
