//! Point series for the three risk charts.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use shared::domain::DateCount;

use crate::model::{RiskModel, WINDOW_DAYS};

/// Group sizes on the size curve stay below this.
pub const GROUP_CURVE_MAX_SIZE: u64 = 1_000_000;
/// The size curve ends at the first point above this probability.
pub const GROUP_CURVE_STOP_PROBABILITY: f64 = 0.99;
/// Days covered by the risk history chart.
pub const HISTORY_DAYS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupRiskPoint {
    pub group_size: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    pub cumulative: i64,
    pub weekly_growth: i64,
    /// Set on every seventh point, counted back from the latest report.
    pub label: Option<NaiveDate>,
    pub side: LabelSide,
}

/// Risk for doubling group sizes, as percentages.
pub fn group_risk_curve(model: &RiskModel<'_>) -> Vec<GroupRiskPoint> {
    let mut points = Vec::new();
    let mut group_size = 1u64;
    while group_size < GROUP_CURVE_MAX_SIZE {
        let p = model.p(group_size as f64);
        points.push(GroupRiskPoint {
            group_size,
            percent: 100.0 * p,
        });
        if p > GROUP_CURVE_STOP_PROBABILITY {
            break;
        }
        group_size *= 2;
    }
    points
}

/// Daily risk for a fixed group size over the `days` ending at the latest
/// report, oldest first.
pub fn risk_history(model: &RiskModel<'_>, group_size: u32, days: u32) -> Vec<HistoryPoint> {
    let last = model.last().date();
    (0..days)
        .rev()
        .filter_map(|back| last.checked_sub_days(Days::new(u64::from(back))))
        .map(|date| HistoryPoint {
            date,
            percent: 100.0 * model.p_on(f64::from(group_size), date),
        })
        .collect()
}

/// Cumulative cases against seven-day growth. Points where either value is
/// not positive are left out since the chart uses log axes.
pub fn growth_trajectory(series: &[DateCount]) -> Vec<GrowthPoint> {
    if series.len() <= WINDOW_DAYS {
        return Vec::new();
    }
    let label_phase = (series.len() - 1) % WINDOW_DAYS;
    let midpoint = series.len() as f64 / 2.0;

    (WINDOW_DAYS..series.len())
        .filter_map(|i| {
            let cumulative = series[i].count();
            let weekly_growth = cumulative - series[i - WINDOW_DAYS].count();
            if cumulative <= 0 || weekly_growth <= 0 {
                return None;
            }
            Some(GrowthPoint {
                cumulative,
                weekly_growth,
                label: (i % WINDOW_DAYS == label_phase).then(|| series[i].date()),
                side: if (i as f64) < midpoint {
                    LabelSide::Left
                } else {
                    LabelSide::Right
                },
            })
        })
        .collect()
}
