//! 심각도 정렬 및 집계
//!
//! 표시와 저장 순서를 결정하는 고정 우선순위:
//! `CRITICAL(0) < HIGH(1) < MEDIUM(2) < LOW(3) < UNKNOWN(4) < 인식 불가(999)`

use serde::Serialize;

use stowage_core::types::Severity;

use crate::report::{Finding, ScanResult};

/// 인식할 수 없는 심각도 레이블의 순위
pub const UNRECOGNIZED_RANK: u16 = 999;

/// 원시 심각도 레이블의 순위 (대소문자 구분 없음)
pub fn severity_rank(label: &str) -> u16 {
    Severity::parse(label).map_or(UNRECOGNIZED_RANK, |s| s.rank())
}

/// 취약점을 심각도 순으로 안정 정렬합니다.
///
/// 같은 심각도끼리는 입력 순서를 유지하며, 입력은 변경하지 않습니다.
pub fn rank_findings(findings: &[Finding]) -> Vec<&Finding> {
    let mut ranked: Vec<&Finding> = findings.iter().collect();
    ranked.sort_by_key(|f| f.severity.rank());
    ranked
}

/// 심각도별 취약점 수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.add(finding.severity);
        }
        counts
    }

    /// 결과의 모든 대상에 걸친 집계
    pub fn from_result(result: &ScanResult) -> Self {
        Self::from_findings(result.findings())
    }

    pub fn add(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }

    /// 두 집계를 합칩니다.
    pub fn merge(&mut self, other: &Self) {
        for severity in Severity::ALL {
            *self.slot(severity) += other.get(severity);
        }
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
            Severity::Unknown => &mut self.unknown,
        }
    }
}
