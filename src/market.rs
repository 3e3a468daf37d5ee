use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::MarketDataError;

/// Chart API hosts, primary first; the second is only tried after a transient failure
pub const DEFAULT_HOSTS: [&str; 2] = [
    "https://query2.finance.yahoo.com",
    "https://query1.finance.yahoo.com",
];

/// Trailing window requested for every ticker
pub const LOOKBACK_RANGE: &str = "1y";
pub const BAR_INTERVAL: &str = "1d";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// One trading day of prices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Daily bars for one ticker, strictly ascending by date.
///
/// Fields are private so a series cannot be reordered or extended once it
/// has been fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, MarketDataError> {
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(MarketDataError::Unordered(pair[1].date));
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// The most recent `n` bars (all of them if the series is shorter)
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

/// Source of daily price history.
pub trait MarketDataProvider {
    /// Fetch the trailing one-year daily series for `symbol`.
    fn daily_history(&self, symbol: &str) -> Result<PriceSeries, MarketDataError>;
}

/// Yahoo Finance v8 chart endpoint, blocking.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    hosts: Vec<String>,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, MarketDataError> {
        Self::with_hosts(timeout, DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect())
    }

    /// Hosts are tried in order; the next one is used only on transient failures.
    pub fn with_hosts(timeout: Duration, hosts: Vec<String>) -> Result<Self, MarketDataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, hosts })
    }

    fn chart_url(host: &str, symbol: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}?interval={}&range={}",
            host.trim_end_matches('/'),
            symbol,
            BAR_INTERVAL,
            LOOKBACK_RANGE
        )
    }

    fn fetch_from(&self, url: &str, symbol: &str) -> Result<PriceSeries, MarketDataError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        match parse_chart(symbol, &body) {
            Ok(series) if status.is_success() => Ok(series),
            Ok(_) => Err(MarketDataError::Status(status.as_u16())),
            // Yahoo sends a chart.error body with 404 for unknown symbols
            Err(err @ MarketDataError::Provider { .. }) => Err(err),
            Err(_) if !status.is_success() => Err(MarketDataError::Status(status.as_u16())),
            Err(err) => Err(err),
        }
    }
}

impl MarketDataProvider for YahooProvider {
    fn daily_history(&self, symbol: &str) -> Result<PriceSeries, MarketDataError> {
        let mut last_err = None;

        for host in &self.hosts {
            let url = Self::chart_url(host, symbol);
            debug!(%url, "requesting daily history");

            match self.fetch_from(&url, symbol) {
                Ok(series) => {
                    debug!(symbol, bars = series.len(), "daily history received");
                    return Ok(series);
                }
                Err(err) if err.is_transient() => {
                    warn!(symbol, host = %host, error = %err, "chart host failed, trying next");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| MarketDataError::Malformed("no chart hosts configured".to_string())))
    }
}

impl MarketDataError {
    /// Worth trying the secondary host
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
}

/// Parse a v8 chart payload into a series.
///
/// Rows with any missing OHLC value are dropped. Timestamps are shifted by the
/// exchange offset before taking the calendar day, and when two rows land on
/// the same day (Yahoo appends the live session bar) the later one wins.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, MarketDataError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::Malformed(e.to_string()))?;

    if let Some(err) = response.chart.error {
        return Err(MarketDataError::Provider {
            code: err.code,
            description: err.description,
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| MarketDataError::Malformed("chart result missing".to_string()))?;

    let Some(timestamps) = result.timestamp else {
        // Valid symbol without trades in range
        return PriceSeries::new(symbol, Vec::new());
    };

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .ok_or_else(|| MarketDataError::Malformed("quote indicators missing".to_string()))?;

    let column = |values: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
        values.as_ref().and_then(|v| v.get(i).copied().flatten())
    };

    let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            column(&quote.open, i),
            column(&quote.high, i),
            column(&quote.low, i),
            column(&quote.close, i),
        ) else {
            continue;
        };
        by_date.insert(date, PriceBar { date, open, high, low, close });
    }

    PriceSeries::new(symbol, by_date.into_values().collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    /// Consecutive calendar days starting 2024-01-02
    pub(crate) fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start + chrono::Days::new(i as u64),
                open: c,
                high: c,
                low: c,
                close: c,
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    // 2024-03-04 and 2024-03-05 14:30 UTC, New York offset -5h
    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "AAPL", "gmtoffset": -18000},
                "timestamp": [1709562600, 1709649000, 1709735400],
                "indicators": {
                    "quote": [{
                        "open":  [176.15, 170.76, null],
                        "high":  [176.90, 172.04, 171.24],
                        "low":   [173.79, 169.62, 168.50],
                        "close": [175.10, 170.12, 169.12],
                        "volume": [81510100, 95132400, 68587700]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_drops_incomplete_rows() {
        let series = parse_chart("AAPL", CHART_BODY).unwrap();
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(series.bars()[1].close, 170.12);
    }

    #[test]
    fn test_parse_chart_same_day_keeps_later_row() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},
            "timestamp":[1709596800, 1709625600],
            "indicators":{"quote":[{"open":[1.0,2.0],"high":[1.0,2.0],"low":[1.0,2.0],"close":[1.0,2.0]}]}}],
            "error":null}}"#;
        let series = parse_chart("X", body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, 2.0);
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let series = parse_chart("NEW", body).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_chart_provider_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart("ZZZZ", body) {
            Err(MarketDataError::Provider { code, .. }) => assert_eq!(code, "Not Found"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_chart_malformed() {
        assert!(matches!(parse_chart("X", "<html>"), Err(MarketDataError::Malformed(_))));
        assert!(matches!(
            parse_chart("X", r#"{"chart":{"result":[],"error":null}}"#),
            Err(MarketDataError::Malformed(_))
        ));
    }

    #[test]
    fn test_series_rejects_unordered_and_duplicates() {
        let unordered = vec![bar("2024-01-03", 1.0), bar("2024-01-02", 1.0)];
        assert!(matches!(PriceSeries::new("X", unordered), Err(MarketDataError::Unordered(_))));

        let duplicate = vec![bar("2024-01-02", 1.0), bar("2024-01-02", 2.0)];
        assert!(PriceSeries::new("X", duplicate).is_err());
    }

    #[test]
    fn test_series_tail() {
        let series = series_from_closes("X", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let tail = series.tail(5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0].close, 3.0);
        assert_eq!(series.tail(50).len(), 7);
    }

    #[test]
    fn test_transient_errors() {
        assert!(MarketDataError::Status(503).is_transient());
        assert!(MarketDataError::Status(429).is_transient());
        assert!(!MarketDataError::Status(404).is_transient());
        assert!(!MarketDataError::Malformed("x".into()).is_transient());
    }

    #[test]
    fn test_yahoo_provider_falls_back_to_second_host() {
        let mut primary = mockito::Server::new();
        let mut secondary = mockito::Server::new();

        let down = primary
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create();
        let up = secondary
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("interval".into(), "1d".into()),
                mockito::Matcher::UrlEncoded("range".into(), "1y".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CHART_BODY)
            .create();

        let provider =
            YahooProvider::with_hosts(Duration::from_secs(5), vec![primary.url(), secondary.url()]).unwrap();
        let series = provider.daily_history("AAPL").unwrap();

        assert_eq!(series.len(), 2);
        down.assert();
        up.assert();
    }

    #[test]
    fn test_yahoo_provider_unknown_symbol_does_not_retry() {
        let mut primary = mockito::Server::new();
        let mut secondary = mockito::Server::new();

        primary
            .mock("GET", "/v8/finance/chart/ZZZZ")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
            .create();
        let untouched = secondary
            .mock("GET", "/v8/finance/chart/ZZZZ")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create();

        let provider =
            YahooProvider::with_hosts(Duration::from_secs(5), vec![primary.url(), secondary.url()]).unwrap();
        let err = provider.daily_history("ZZZZ").unwrap_err();

        assert!(matches!(err, MarketDataError::Provider { .. }));
        untouched.assert();
    }
}
