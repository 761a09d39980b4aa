use chrono::NaiveDate;
use shared::domain::DateCount;
use thiserror::Error;

/// Distance, in series entries, between the two ends of the rolling window.
pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("case series is empty")]
    EmptySeries,
    #[error("population is unknown")]
    UnknownPopulation,
    #[error("per-person probability {p1} is outside (0, 1)")]
    ProbabilityOutOfRange { p1: f64 },
    #[error("target probability {target} is outside (0, 1)")]
    TargetOutOfRange { target: f64 },
}

/// Older end of the rolling window: a series entry, or the implicit zero
/// before the first report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStart {
    pub date: Option<NaiveDate>,
    pub count: i64,
}

impl WindowStart {
    const ORIGIN: WindowStart = WindowStart {
        date: None,
        count: 0,
    };
}

/// Estimator over one case series.
///
/// `population` is 0 when unknown; the probability functions are not
/// meaningful then and callers check [`RiskModel::has_population`] first.
/// Week-over-week drops are not clamped and yield a negative `p1`.
#[derive(Debug, Clone, Copy)]
pub struct RiskModel<'a> {
    series: &'a [DateCount],
    population: u64,
    multiplier: f64,
}

impl<'a> RiskModel<'a> {
    pub fn new(
        series: &'a [DateCount],
        population: u64,
        multiplier: f64,
    ) -> Result<Self, ModelError> {
        if series.is_empty() {
            return Err(ModelError::EmptySeries);
        }
        Ok(Self {
            series,
            population,
            multiplier,
        })
    }

    pub fn series(&self) -> &'a [DateCount] {
        self.series
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn has_population(&self) -> bool {
        self.population > 0
    }

    pub fn last(&self) -> DateCount {
        self.series[self.series.len() - 1]
    }

    pub fn previous(&self) -> WindowStart {
        self.window_start(self.series.len() - 1)
    }

    pub fn last_week_count(&self) -> i64 {
        self.window_count(self.series.len() - 1)
    }

    /// Modeled probability that one person is currently infectious.
    pub fn p1(&self) -> f64 {
        self.rate(self.last_week_count())
    }

    /// Probability that at least one of `n` people is infectious.
    pub fn p(&self, n: f64) -> f64 {
        group_probability(self.p1(), n)
    }

    /// Group size at which [`RiskModel::p`] reaches `target`.
    ///
    /// Only defined for `0 < p1 < 1`; see [`RiskModel::checked_n`].
    pub fn n(&self, target: f64) -> f64 {
        (1.0 - target).ln() / (1.0 - self.p1()).ln()
    }

    pub fn checked_n(&self, target: f64) -> Result<f64, ModelError> {
        if !self.has_population() {
            return Err(ModelError::UnknownPopulation);
        }
        let p1 = self.p1();
        if !(p1 > 0.0 && p1 < 1.0) {
            return Err(ModelError::ProbabilityOutOfRange { p1 });
        }
        if !(target > 0.0 && target < 1.0) {
            return Err(ModelError::TargetOutOfRange { target });
        }
        Ok(self.n(target))
    }

    /// `p1` for the window ending at the latest report on or before `date`.
    /// Zero when `date` precedes the whole series.
    pub fn p1_on(&self, date: NaiveDate) -> f64 {
        match self.index_on(date) {
            Some(index) => self.rate(self.window_count(index)),
            None => 0.0,
        }
    }

    pub fn p_on(&self, n: f64, date: NaiveDate) -> f64 {
        group_probability(self.p1_on(date), n)
    }

    fn index_on(&self, date: NaiveDate) -> Option<usize> {
        self.series.iter().rposition(|point| point.date() <= date)
    }

    fn window_start(&self, index: usize) -> WindowStart {
        if index >= WINDOW_DAYS {
            let point = self.series[index - WINDOW_DAYS];
            WindowStart {
                date: Some(point.date()),
                count: point.count(),
            }
        } else {
            WindowStart::ORIGIN
        }
    }

    fn window_count(&self, index: usize) -> i64 {
        self.series[index].count() - self.window_start(index).count
    }

    fn rate(&self, count: i64) -> f64 {
        self.multiplier * count as f64 / self.population as f64
    }
}

fn group_probability(p1: f64, n: f64) -> f64 {
    1.0 - (1.0 - p1).powf(n)
}
