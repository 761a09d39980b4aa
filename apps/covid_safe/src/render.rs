//! Terminal output for the selection controller.

use std::{
    fmt::{self, Write as _},
    sync::{Mutex, MutexGuard, PoisonError},
};

use clap::ValueEnum;
use client_core::{Pickers, RenderSink, Report};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Keeps the last thing the controller showed so the CLI can print once
/// after a cascade of selection events.
#[derive(Default)]
pub struct TerminalSink {
    pickers: Mutex<Option<Pickers>>,
    report: Mutex<Option<Report>>,
}

impl TerminalSink {
    pub fn pickers(&self) -> Option<Pickers> {
        lock(&self.pickers).clone()
    }

    pub fn report(&self) -> Option<Report> {
        lock(&self.report).clone()
    }
}

impl RenderSink for TerminalSink {
    fn show_pickers(&self, pickers: &Pickers) {
        *lock(&self.pickers) = Some(pickers.clone());
    }

    fn render(&self, report: &Report) {
        debug!(location = %report.location, "render: report ready");
        *lock(&self.report) = Some(report.clone());
    }

    fn clear(&self) {
        *lock(&self.report) = None;
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn pct(p: f64) -> String {
    format!("{:.2} %", 100.0 * p)
}

pub fn format_report(report: &Report, with_charts: bool) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", report.path)?;

    match report.population {
        Some(population) => fact(&mut out, "Population", population, None)?,
        None => fact(&mut out, "Population", "not available", None)?,
    }

    let cumulative = report.cumulative;
    let as_of = match report.cumulative_share_of_population {
        Some(share) => format!("{} of population; as of {}", pct(share), cumulative.date()),
        None => format!("as of {}", cumulative.date()),
    };
    fact(&mut out, "Cases, cumulative", cumulative.count(), Some(as_of))?;

    let week = report.last_week;
    let since = week
        .since
        .map(|date| date.to_string())
        .unwrap_or_else(|| "start of series".into());
    let week_note = match week.share_of_cases {
        Some(share) => format!("{} of cases; since {since}", pct(share)),
        None => format!("since {since}"),
    };
    fact(&mut out, "Cases, last week", week.count, Some(week_note))?;

    if let Some(deaths) = report.deaths {
        let mut notes = Vec::new();
        if let Some(share) = deaths.share_of_cases {
            notes.push(format!("{} of cases", pct(share)));
        }
        if let Some(per_100k) = deaths.per_100k {
            notes.push(format!("{per_100k:.2} per 100k people"));
        }
        let note = (!notes.is_empty()).then(|| notes.join("; "));
        fact(&mut out, "Deaths, cumulative", deaths.total, note)?;
    }

    let Some(risk) = &report.risk else {
        return Ok(out);
    };

    out.push('\n');
    for group in &risk.group_risks {
        fact(&mut out, &format!("P{}", group.group_size), pct(group.probability), None)?;
    }
    if let Some(break_even) = risk.break_even {
        out.push('\n');
        fact(
            &mut out,
            &format!("n when Pn < {}%", break_even.target_percent),
            break_even.group_size,
            None,
        )?;
    }

    if let Some(charts) = &risk.charts {
        let summary = &charts.summary;
        writeln!(
            out,
            "\nIn {}, a group of {} has a {} chance of including someone infectious.",
            summary.location,
            summary.group_size,
            pct(summary.probability)
        )?;

        if with_charts {
            writeln!(out, "\nGroup size vs. risk")?;
            for point in &charts.group_curve {
                writeln!(out, "  {:>8}  {:>7.2} %", point.group_size, point.percent)?;
            }
            writeln!(out, "\nRisk for a group of {} by day", summary.group_size)?;
            for point in &charts.history {
                writeln!(out, "  {}  {:>7.2} %", point.date, point.percent)?;
            }
        }
    }

    if with_charts && !report.growth_chart.is_empty() {
        writeln!(out, "\nCumulative cases vs. weekly growth")?;
        for point in &report.growth_chart {
            let label = point.label.map(|d| d.to_string()).unwrap_or_default();
            writeln!(
                out,
                "  {:>10}  {:>8}  {label}",
                point.cumulative, point.weekly_growth
            )?;
        }
    }

    Ok(out)
}

fn fact(
    out: &mut String,
    label: &str,
    value: impl fmt::Display,
    note: Option<String>,
) -> fmt::Result {
    match note {
        Some(note) => writeln!(out, "{label:<20} {value:>12}  {note}"),
        None => writeln!(out, "{label:<20} {value:>12}"),
    }
}

pub fn format_pickers(pickers: &Pickers) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let levels = [
        ("countries", Some(&pickers.countries)),
        ("provinces", pickers.provinces.as_ref()),
        ("counties", pickers.counties.as_ref()),
    ];
    for (heading, options) in levels {
        let Some(options) = options else { continue };
        writeln!(out, "{heading}:")?;
        for option in options {
            writeln!(out, "  {option}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate};
    use client_core::{build_report, ReportSettings, SeriesPair};
    use shared::{
        domain::{DateCount, SelectionPath},
        protocol::{Cases, Deaths},
    };

    use super::*;

    fn report(population: Option<u64>, deaths: Option<Deaths>) -> Report {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).expect("date");
        let series = [100, 110, 120, 130, 140, 150, 160, 170]
            .iter()
            .enumerate()
            .map(|(i, count)| DateCount::new(start + Days::new(i as u64), *count))
            .collect();
        let data = SeriesPair {
            cases: Cases {
                name: "Alpha".into(),
                population,
                series,
            },
            deaths,
        };
        let settings = ReportSettings {
            multiplier: 2.0,
            target_percent: 50.0,
            summary_group_size: 20,
        };
        build_report(&SelectionPath::new(["Alpha"]).expect("path"), &data, &settings)
            .expect("report")
    }

    #[test]
    fn pct_uses_two_decimals() {
        assert_eq!(pct(0.014), "1.40 %");
        assert_eq!(pct(0.0), "0.00 %");
    }

    #[test]
    fn text_report_lists_facts_and_risk() {
        let text = format_report(&report(Some(10_000), None), false).expect("format");
        assert!(text.contains("1.70 % of population; as of 2021-01-08"));
        assert!(text.contains("41.18 % of cases; since 2021-01-01"));
        assert!(text.contains("1.40 %"));
        assert!(text.contains("n when Pn < 50%"));
        assert!(text.contains("a group of 20"));
        assert!(!text.contains("Group size vs. risk"));
        assert!(!text.contains("Deaths"));
    }

    #[test]
    fn unknown_population_stops_after_facts() {
        let deaths = Deaths {
            name: "Alpha".into(),
            population: None,
            series: vec![DateCount::new(
                NaiveDate::from_ymd_opt(2021, 1, 8).expect("date"),
                17,
            )],
        };
        let text = format_report(&report(None, Some(deaths)), true).expect("format");
        assert!(text.contains("not available"));
        assert!(text.contains("10.00 % of cases"));
        assert!(!text.contains("per 100k"));
        assert!(!text.contains("P1 "));
    }

    #[test]
    fn death_notes_join_share_and_rate() {
        let deaths = Deaths {
            name: "Alpha".into(),
            population: Some(10_000),
            series: vec![DateCount::new(
                NaiveDate::from_ymd_opt(2021, 1, 8).expect("date"),
                17,
            )],
        };
        let text = format_report(&report(Some(10_000), Some(deaths)), false).expect("format");
        assert!(text.contains("10.00 % of cases; 170.00 per 100k people"));
    }

    #[test]
    fn charts_are_printed_on_request() {
        let text = format_report(&report(Some(10_000), None), true).expect("format");
        assert!(text.contains("Group size vs. risk"));
        assert!(text.contains("Risk for a group of 20 by day"));
        assert!(text.contains("Cumulative cases vs. weekly growth"));
    }

    #[test]
    fn sink_keeps_latest_report_until_cleared() {
        let sink = TerminalSink::default();
        sink.render(&report(None, None));
        assert_eq!(sink.report().map(|r| r.location), Some("Alpha".to_string()));
        sink.clear();
        assert!(sink.report().is_none());
    }

    #[test]
    fn pickers_hide_levels_without_options() {
        let pickers = Pickers {
            countries: vec!["Alpha".into(), "US".into()],
            provinces: Some(vec!["Ohio".into()]),
            counties: None,
        };
        let text = format_pickers(&pickers).expect("format");
        assert_eq!(text, "countries:\n  Alpha\n  US\nprovinces:\n  Ohio\n");
    }
}
