//! Daily change and buy-and-hold valuation.
//!
//! Pure functions over a [`PriceSeries`]: nothing here keeps state between
//! calls, so running the same series twice gives identical results.

use std::fmt;

use chrono::NaiveDate;

use crate::error::{ConfigError, ReturnError};
use crate::market::PriceSeries;

/// Relative tolerance for the compounded-vs-close-ratio check
pub const IDENTITY_TOLERANCE: f64 = 1e-9;

pub const DEFAULT_AMOUNT: f64 = 1000.0;

/// Principal in currency units, positive and held to cent granularity.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct InvestmentAmount(f64);

impl InvestmentAmount {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        let cents = (value * 100.0).round();
        // Huge finite inputs overflow once scaled to cents
        if !value.is_finite() || !cents.is_finite() || cents < 1.0 {
            return Err(ConfigError::InvalidAmount(value.to_string()));
        }
        Ok(Self(cents / 100.0))
    }

    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let value: f64 = input
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .map_err(|_| ConfigError::InvalidAmount(input.to_string()))?;
        Self::new(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Move by `steps` increments of 0.01, never below the minimum
    pub fn stepped(self, steps: i64) -> Self {
        let cents = ((self.0 * 100.0).round() as i64 + steps).max(1);
        Self(cents as f64 / 100.0)
    }
}

impl Default for InvestmentAmount {
    fn default() -> Self {
        Self(DEFAULT_AMOUNT)
    }
}

impl fmt::Display for InvestmentAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyChange {
    pub date: NaiveDate,
    /// Percent, e.g. 10.0 for +10%
    pub percent: f64,
}

/// Day-over-day close change, aligned with the source series.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyChangeSeries(Vec<DailyChange>);

impl DailyChangeSeries {
    pub fn changes(&self) -> &[DailyChange] {
        &self.0
    }

    pub fn percents(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|c| c.percent)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (min, max) percent, for chart bounds
    pub fn range(&self) -> Option<(f64, f64)> {
        self.percents().fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Profit,
    Loss,
    Unchanged,
}

impl Outcome {
    pub fn severity(self) -> Severity {
        match self {
            Outcome::Profit => Severity::Success,
            Outcome::Loss => Severity::Error,
            Outcome::Unchanged => Severity::Info,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Profit => "Profit",
            Outcome::Loss => "Loss",
            Outcome::Unchanged => "Unchanged",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Outcome::Profit => "You were in profit based on the previous data!",
            Outcome::Loss => "You were in loss based on the previous data!",
            Outcome::Unchanged => {
                "No profit, no loss based on the previous data. The stock price remained unchanged."
            }
        }
    }
}

/// Percentage change of each close against the previous one.
///
/// The first entry has no prior day and is recorded as 0%. A previous close of
/// exactly zero is an error rather than an infinite change.
pub fn compute_daily_change(series: &PriceSeries) -> Result<DailyChangeSeries, ReturnError> {
    let bars = series.bars();
    let first = bars.first().ok_or(ReturnError::EmptySeries)?;
    if !first.close.is_finite() {
        return Err(ReturnError::NonFiniteClose(first.date));
    }

    let mut changes = Vec::with_capacity(bars.len());
    changes.push(DailyChange {
        date: first.date,
        percent: 0.0,
    });

    for pair in bars.windows(2) {
        let (prev, today) = (&pair[0], &pair[1]);
        if !today.close.is_finite() {
            return Err(ReturnError::NonFiniteClose(today.date));
        }
        if prev.close == 0.0 {
            return Err(ReturnError::ZeroClose(today.date));
        }
        changes.push(DailyChange {
            date: today.date,
            percent: (today.close - prev.close) / prev.close * 100.0,
        });
    }

    Ok(DailyChangeSeries(changes))
}

/// `amount` grown by every daily change in turn.
pub fn compute_compounded_value(amount: InvestmentAmount, changes: &DailyChangeSeries) -> f64 {
    let growth: f64 = changes.percents().map(|p| 1.0 + p / 100.0).product();
    amount.value() * growth
}

/// Raw last close against raw first close.
pub fn classify_outcome(series: &PriceSeries) -> Result<Outcome, ReturnError> {
    let (first, last) = series
        .first()
        .zip(series.last())
        .ok_or(ReturnError::EmptySeries)?;

    Ok(if last.close > first.close {
        Outcome::Profit
    } else if last.close < first.close {
        Outcome::Loss
    } else {
        Outcome::Unchanged
    })
}

/// The change product telescopes to last/first, so the compounded value must
/// match `amount * last / first` up to rounding.
pub fn verify_telescoping(
    amount: InvestmentAmount,
    series: &PriceSeries,
    compounded: f64,
) -> Result<(), ReturnError> {
    let (first, last) = series
        .first()
        .zip(series.last())
        .ok_or(ReturnError::EmptySeries)?;
    if first.close == 0.0 {
        return Err(ReturnError::ZeroClose(first.date));
    }

    let expected = amount.value() * last.close / first.close;
    let scale = expected.abs().max(amount.value());
    if (compounded - expected).abs() > IDENTITY_TOLERANCE * scale {
        return Err(ReturnError::IdentityMismatch { compounded, expected });
    }
    Ok(())
}

/// Everything the status panel needs for one ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct Valuation {
    pub amount: InvestmentAmount,
    pub compounded_value: f64,
    pub outcome: Outcome,
}

impl Valuation {
    pub fn compute(
        amount: InvestmentAmount,
        series: &PriceSeries,
        changes: &DailyChangeSeries,
    ) -> Result<Self, ReturnError> {
        let compounded_value = compute_compounded_value(amount, changes);
        verify_telescoping(amount, series, compounded_value)?;
        let outcome = classify_outcome(series)?;
        // Equal first and last closes mean exactly the principal, not product noise
        let compounded_value = match outcome {
            Outcome::Unchanged => amount.value(),
            Outcome::Profit | Outcome::Loss => compounded_value,
        };
        Ok(Self {
            amount,
            compounded_value,
            outcome,
        })
    }

    pub fn profit_loss(&self) -> f64 {
        self.compounded_value - self.amount.value()
    }

    pub fn return_percent(&self) -> f64 {
        self.profit_loss() / self.amount.value() * 100.0
    }
}
