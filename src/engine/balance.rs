// ==========================================
// 分班选课系统 - 均衡校验
// ==========================================
// 规则: 变更后 (max - min) ≤ 变更前 (max - min), 且变更后 max ≤ CAP
// 口径: 在完整的人数表上计算, 不只看被改动的配对
// 红线: 只读一次人数快照, 不修改名册
// ==========================================

use crate::domain::{SectionEnrollment, Student};
use crate::engine::roster::OccupancyMap;

// ==========================================
// BalanceCheck - 单次校验结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub accepted: bool,
    pub spread_before: i64,
    pub spread_after: i64,
    pub max_after: i64,
}

// ==========================================
// BalanceValidator
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct BalanceValidator {
    cap: i64,
}

impl BalanceValidator {
    pub fn new(cap: u32) -> Self {
        Self { cap: i64::from(cap) }
    }

    pub fn cap(&self) -> i64 {
        self.cap
    }

    /// 加入配对
    ///
    /// 学生已持有完全相同的配对时直接通过 (撤销退课时会出现)
    pub fn check_add(
        &self,
        student: &Student,
        pairing: &SectionEnrollment,
        occupancy: &OccupancyMap,
    ) -> BalanceCheck {
        if student.holds(pairing) {
            let (min, max) = bounds(occupancy, &[]);
            return BalanceCheck {
                accepted: true,
                spread_before: max - min,
                spread_after: max - min,
                max_after: max,
            };
        }
        self.evaluate(occupancy, &[(pairing, 1)])
    }

    /// 退出配对 (调用方保证学生持有该配对)
    pub fn check_remove(&self, pairing: &SectionEnrollment, occupancy: &OccupancyMap) -> BalanceCheck {
        self.evaluate(occupancy, &[(pairing, -1)])
    }

    /// 换班: 源配对 -1, 目标配对 +1, 对比同一份快照
    pub fn check_switch(
        &self,
        from: &SectionEnrollment,
        to: &SectionEnrollment,
        occupancy: &OccupancyMap,
    ) -> BalanceCheck {
        self.evaluate(occupancy, &[(from, -1), (to, 1)])
    }

    fn evaluate(&self, occupancy: &OccupancyMap, deltas: &[(&SectionEnrollment, i64)]) -> BalanceCheck {
        let (min_before, max_before) = bounds(occupancy, &[]);
        let (min_after, max_after) = bounds(occupancy, deltas);
        let spread_before = max_before - min_before;
        let spread_after = max_after - min_after;

        BalanceCheck {
            accepted: spread_after <= spread_before && max_after <= self.cap,
            spread_before,
            spread_after,
            max_after,
        }
    }
}

/// 叠加增量后的 (min, max); 增量涉及的配对即使降到 0 也计入; 空表为 (0, 0)
fn bounds(occupancy: &OccupancyMap, deltas: &[(&SectionEnrollment, i64)]) -> (i64, i64) {
    let delta_for = |key: &SectionEnrollment| -> i64 {
        deltas
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, d)| d)
            .sum()
    };

    let existing = occupancy.iter().map(|(k, v)| v + delta_for(k));
    let added = deltas
        .iter()
        .filter(|(k, _)| !occupancy.contains_key(*k))
        .map(|(k, _)| *k)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .map(|k| delta_for(k));

    existing
        .chain(added)
        .fold(None, |acc: Option<(i64, i64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0, 0))
}
