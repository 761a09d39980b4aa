//! Figures handed to the rendering side for one selection.

use chrono::NaiveDate;
use risk_model::{
    charts::{self, GroupRiskPoint, GrowthPoint, HistoryPoint, HISTORY_DAYS},
    ModelError, RiskModel,
};
use serde::Serialize;
use shared::domain::{DateCount, SelectionPath};

use crate::orchestrator::SeriesPair;

/// Group sizes listed in the fact sheet.
pub const REPORTED_GROUP_SIZES: [u32; 4] = [1, 10, 100, 1000];

/// User-adjustable inputs to the report. The multiplier and target have no
/// canonical values; they come from configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSettings {
    /// Under-ascertainment factor applied to reported cases.
    pub multiplier: f64,
    /// Percentage at which the break-even group size is reported.
    pub target_percent: f64,
    /// Group size used for the summary line and the risk history.
    pub summary_group_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub path: SelectionPath,
    pub location: String,
    pub population: Option<u64>,
    pub cumulative: DateCount,
    pub cumulative_share_of_population: Option<f64>,
    pub last_week: LastWeek,
    pub deaths: Option<DeathSummary>,
    /// Present only when the population is known.
    pub risk: Option<RiskSection>,
    pub growth_chart: Vec<GrowthPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LastWeek {
    pub count: i64,
    pub since: Option<NaiveDate>,
    pub share_of_cases: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeathSummary {
    pub total: i64,
    pub share_of_cases: Option<f64>,
    pub per_100k: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSection {
    pub multiplier: f64,
    pub group_risks: Vec<GroupRisk>,
    /// Absent when there were no new cases in the last week.
    pub break_even: Option<BreakEven>,
    /// Absent when `p(1)` is not positive.
    pub charts: Option<RiskCharts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupRisk {
    pub group_size: u32,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakEven {
    pub target_percent: f64,
    pub group_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCharts {
    pub group_curve: Vec<GroupRiskPoint>,
    pub history: Vec<HistoryPoint>,
    pub summary: GroupSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub location: String,
    pub group_size: u32,
    pub probability: f64,
}

pub fn build_report(
    path: &SelectionPath,
    data: &SeriesPair,
    settings: &ReportSettings,
) -> Result<Report, ModelError> {
    let cases = &data.cases;
    let population = cases.known_population();
    let model = RiskModel::new(&cases.series, population.unwrap_or(0), settings.multiplier)?;
    let location = path.leaf().unwrap_or(&cases.name).to_string();

    let cumulative = model.last();
    let previous = model.previous();
    let last_week_count = model.last_week_count();

    Ok(Report {
        path: path.clone(),
        population,
        cumulative,
        cumulative_share_of_population: population
            .map(|population| cumulative.count() as f64 / population as f64),
        last_week: LastWeek {
            count: last_week_count,
            since: previous.date,
            share_of_cases: ratio(last_week_count, cumulative.count()),
        },
        deaths: data
            .deaths
            .as_ref()
            .and_then(|deaths| Some((deaths.last()?.count(), deaths.known_population())))
            .map(|(total, population)| DeathSummary {
                total,
                share_of_cases: ratio(total, cumulative.count()),
                per_100k: population.map(|p| 100_000.0 * total as f64 / p as f64),
            }),
        risk: model
            .has_population()
            .then(|| risk_section(&model, &location, settings)),
        growth_chart: charts::growth_trajectory(&cases.series),
        location,
    })
}

fn risk_section(model: &RiskModel<'_>, location: &str, settings: &ReportSettings) -> RiskSection {
    let group_risks = REPORTED_GROUP_SIZES
        .iter()
        .map(|&group_size| GroupRisk {
            group_size,
            probability: model.p(f64::from(group_size)),
        })
        .collect();

    let break_even = model
        .checked_n(settings.target_percent / 100.0)
        .ok()
        .map(|n| BreakEven {
            target_percent: settings.target_percent,
            group_size: n.round(),
        });

    let charts = (model.p(1.0) > 0.0).then(|| {
        let group_size = settings.summary_group_size;
        RiskCharts {
            group_curve: charts::group_risk_curve(model),
            history: charts::risk_history(model, group_size, HISTORY_DAYS),
            summary: GroupSummary {
                location: location.to_string(),
                group_size,
                probability: model.p(f64::from(group_size)),
            },
        }
    });

    RiskSection {
        multiplier: model.multiplier(),
        group_risks,
        break_even,
        charts,
    }
}

fn ratio(part: i64, whole: i64) -> Option<f64> {
    (whole != 0).then(|| part as f64 / whole as f64)
}
