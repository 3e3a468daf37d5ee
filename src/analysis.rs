//! One analysis run: every selected ticker fetched and evaluated in order.
//!
//! Failures never abort the run. A ticker whose fetch fails, comes back empty
//! or cannot be evaluated is skipped with notices and the loop moves on.

use tracing::{info, warn};

use crate::market::{MarketDataProvider, PriceBar, PriceSeries};
use crate::returns::{compute_daily_change, DailyChangeSeries, InvestmentAmount, Severity, Valuation};

/// Rows shown in the "Stock Data" tail table
pub const TAIL_ROWS: usize = 5;

/// Selected tickers and the shared principal.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    tickers: Vec<String>,
    amount: InvestmentAmount,
}

impl AnalysisRequest {
    /// Symbols are trimmed and uppercased; blanks and repeats are dropped.
    pub fn new<I, S>(tickers: I, amount: InvestmentAmount) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for ticker in tickers {
            let symbol = ticker.as_ref().trim().to_uppercase();
            if !symbol.is_empty() && !normalized.contains(&symbol) {
                normalized.push(symbol);
            }
        }
        Self {
            tickers: normalized,
            amount,
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn amount(&self) -> InvestmentAmount {
        self.amount
    }
}

/// A status line produced during the run.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub symbol: String,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub(crate) fn new(symbol: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            severity,
            message: message.into(),
        }
    }
}

/// Everything shown for an analyzed ticker.
#[derive(Clone, Debug)]
pub struct TickerReport {
    pub series: PriceSeries,
    pub daily_change: DailyChangeSeries,
    pub valuation: Valuation,
}

impl TickerReport {
    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn recent_bars(&self) -> &[PriceBar] {
        self.series.tail(TAIL_ROWS)
    }
}

#[derive(Debug, Default)]
pub struct AnalysisRun {
    pub amount: InvestmentAmount,
    /// Analyzed tickers, in selection order
    pub reports: Vec<TickerReport>,
    pub notices: Vec<Notice>,
}

impl AnalysisRun {
    pub fn report(&self, symbol: &str) -> Option<&TickerReport> {
        self.reports.iter().find(|r| r.symbol() == symbol)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(|n| n.severity == Severity::Warning)
    }
}

/// Progress callback payload, fired before each fetch and for every notice.
#[derive(Debug)]
pub enum RunEvent<'a> {
    Fetching(&'a str),
    Notice(&'a Notice),
}

/// Run the calculator over every selected ticker.
///
/// `on_event` lets the caller redraw between blocking fetches.
pub fn run_analysis<P, F>(provider: &P, request: &AnalysisRequest, mut on_event: F) -> AnalysisRun
where
    P: MarketDataProvider + ?Sized,
    F: FnMut(RunEvent<'_>),
{
    let mut run = AnalysisRun {
        amount: request.amount(),
        ..Default::default()
    };

    info!(tickers = request.tickers().len(), amount = %request.amount(), "analysis run started");

    for symbol in request.tickers() {
        on_event(RunEvent::Fetching(symbol));
        notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Info, format!("Fetching data for {}...", symbol)));

        let series = match provider.daily_history(symbol) {
            Ok(series) if series.is_empty() => {
                warn!(symbol = %symbol, "no bars returned");
                notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Error, format!("{}: No data fetched.", symbol)));
                notify(&mut run, &mut on_event, skip_notice(symbol));
                continue;
            }
            Ok(series) => series,
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "fetch failed");
                notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Error, format!("{}: Error - {}", symbol, err)));
                notify(&mut run, &mut on_event, skip_notice(symbol));
                continue;
            }
        };

        notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Success, format!("{}: Data fetched successfully.", symbol)));
        notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Info, format!("Fetching data for {}... done!", symbol)));

        let evaluated = compute_daily_change(&series).and_then(|daily_change| {
            let valuation = Valuation::compute(request.amount(), &series, &daily_change)?;
            Ok((daily_change, valuation))
        });

        match evaluated {
            Ok((daily_change, valuation)) => {
                info!(
                    symbol = %symbol,
                    bars = series.len(),
                    value = valuation.compounded_value,
                    outcome = valuation.outcome.label(),
                    "ticker analyzed"
                );
                run.reports.push(TickerReport {
                    series,
                    daily_change,
                    valuation,
                });
            }
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "calculation failed");
                notify(
                    &mut run,
                    &mut on_event,
                    Notice::new(symbol, Severity::Error, format!("{}: Error calculating profit/loss: {}", symbol, err)),
                );
                notify(&mut run, &mut on_event, Notice::new(symbol, Severity::Warning, format!("Skipping {} analysis", symbol)));
            }
        }
    }

    info!(analyzed = run.reports.len(), "analysis run finished");
    run
}

fn notify<F: FnMut(RunEvent<'_>)>(run: &mut AnalysisRun, on_event: &mut F, notice: Notice) {
    on_event(RunEvent::Notice(&notice));
    run.notices.push(notice);
}

fn skip_notice(symbol: &str) -> Notice {
    Notice::new(symbol, Severity::Warning, format!("Skipping {} due to no data", symbol))
}
