//! Plain text rendering of an analysis run, for `--plain` and piping.

use std::io::{self, Write};

use crate::analysis::{AnalysisRun, Notice, TickerReport};
use crate::returns::Severity;
use crate::ui::candlestick::CandlestickRenderer;

pub const CHART_WIDTH: u16 = 100;
pub const CHART_HEIGHT: u16 = 16;

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "OK",
        Severity::Error => "ERROR",
        Severity::Warning => "WARN",
        Severity::Info => "INFO",
    }
}

pub fn write_notice<W: Write>(out: &mut W, notice: &Notice) -> io::Result<()> {
    writeln!(out, "[{:<5}] {}", severity_tag(notice.severity), notice.message)
}

pub fn write_run<W: Write>(out: &mut W, run: &AnalysisRun) -> io::Result<()> {
    if run.reports.is_empty() {
        writeln!(out)?;
        writeln!(out, "No ticker could be analyzed.")?;
        return Ok(());
    }

    for report in &run.reports {
        writeln!(out)?;
        write_report(out, report)?;
    }
    Ok(())
}

pub fn write_report<W: Write>(out: &mut W, report: &TickerReport) -> io::Result<()> {
    let symbol = report.symbol();
    let rule = "=".repeat(60);

    writeln!(out, "{}", rule)?;
    writeln!(out, "Stock Data - {}", symbol)?;
    writeln!(out, "{:<12} {:>10} {:>10} {:>10} {:>10}", "Date", "Open", "High", "Low", "Close")?;
    for bar in report.recent_bars() {
        writeln!(
            out,
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Daily Profit/Loss - {}", symbol)?;
    // Skip the leading 0% entry of the first trading day
    let moves = report.daily_change.changes().get(1..).unwrap_or_default();
    let best = moves.iter().max_by(|a, b| a.percent.total_cmp(&b.percent));
    let worst = moves.iter().min_by(|a, b| a.percent.total_cmp(&b.percent));
    match (best, worst) {
        (Some(best), Some(worst)) => {
            let mean = moves.iter().map(|c| c.percent).sum::<f64>() / moves.len() as f64;
            writeln!(out, "  Daily moves: {}  |  Mean: {:+.2}%", moves.len(), mean)?;
            writeln!(out, "  Best day:  {} {:+.2}%", best.date.format("%Y-%m-%d"), best.percent)?;
            writeln!(out, "  Worst day: {} {:+.2}%", worst.date.format("%Y-%m-%d"), worst.percent)?;
        }
        _ => writeln!(out, "  Not enough history for a daily change")?,
    }

    writeln!(out)?;
    let renderer = CandlestickRenderer::new(report.series.bars(), CHART_WIDTH, CHART_HEIGHT);
    let suffix = if renderer.is_weekly() { " (weekly)" } else { "" };
    writeln!(out, "Candlestick Chart - {}{}", symbol, suffix)?;
    for line in renderer.render_lines() {
        let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        writeln!(out, "{}", text.trim_end())?;
    }

    let valuation = &report.valuation;
    writeln!(out)?;
    writeln!(out, "Previous Investment Status - {}", symbol)?;
    writeln!(out, "  Initial Investment Amount: {}", valuation.amount)?;
    writeln!(out, "  Previous Value: ${:.2}", valuation.compounded_value)?;
    writeln!(
        out,
        "  Profit/Loss: {:+.2} ({:+.2}%) {}",
        valuation.profit_loss(),
        valuation.return_percent(),
        valuation.outcome.label()
    )?;
    writeln!(
        out,
        "[{:<5}] {}",
        severity_tag(valuation.outcome.severity()),
        valuation.outcome.message()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run_analysis, tests::FakeProvider, AnalysisRequest};
    use crate::returns::InvestmentAmount;

    fn render(run: &AnalysisRun) -> String {
        let mut out = Vec::new();
        write_run(&mut out, run).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_sections_in_order() {
        let provider = FakeProvider::default().with("AAPL", Some(&[100.0, 104.0, 98.0, 110.0]));
        let request = AnalysisRequest::new(["AAPL"], InvestmentAmount::new(500.0).unwrap());
        let text = render(&run_analysis(&provider, &request, |_| {}));

        let positions: Vec<usize> = [
            "Stock Data - AAPL",
            "Daily Profit/Loss - AAPL",
            "Candlestick Chart - AAPL",
            "Previous Investment Status - AAPL",
        ]
        .iter()
        .map(|title| text.find(title).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert!(text.contains("Initial Investment Amount: $500.00"));
        assert!(text.contains("Previous Value: $550.00"));
        assert!(text.contains("Best day:  2024-01-05 +12.24%"));
        assert!(text.contains("Worst day: 2024-01-04 -5.77%"));
        assert!(text.contains("[OK   ] You were in profit based on the previous data!"));
    }

    #[test]
    fn test_report_tail_has_five_rows() {
        let closes: Vec<f64> = (1..=9).map(|i| i as f64 * 10.0).collect();
        let provider = FakeProvider::default().with("MSFT", Some(&closes));
        let request = AnalysisRequest::new(["MSFT"], InvestmentAmount::default());
        let text = render(&run_analysis(&provider, &request, |_| {}));

        let table_rows = text.lines().filter(|l| l.starts_with("2024-01-")).count();
        assert_eq!(table_rows, 5);
        assert!(!text.contains("2024-01-05 "));
    }

    #[test]
    fn test_single_bar_has_no_moves() {
        let provider = FakeProvider::default().with("HIMS", Some(&[20.0]));
        let request = AnalysisRequest::new(["HIMS"], InvestmentAmount::default());
        let text = render(&run_analysis(&provider, &request, |_| {}));

        assert!(text.contains("Not enough history for a daily change"));
        assert!(text.contains("Previous Value: $1000.00"));
        assert!(text.contains("Profit/Loss: +0.00 (+0.00%) Unchanged"));
        assert!(text.contains("[INFO ] No profit, no loss"));
    }

    #[test]
    fn test_round_trip_reports_unchanged_without_noise() {
        let provider = FakeProvider::default().with("BNTX", Some(&[100.0, 0.8999999999999999, 100.0]));
        let request = AnalysisRequest::new(["BNTX"], InvestmentAmount::new(500.0).unwrap());
        let text = render(&run_analysis(&provider, &request, |_| {}));

        assert!(text.contains("Previous Value: $500.00"));
        assert!(text.contains("Profit/Loss: +0.00 (+0.00%) Unchanged"));
        assert!(!text.contains("-0.00"));
    }

    #[test]
    fn test_empty_run() {
        let text = render(&AnalysisRun::default());
        assert!(text.contains("No ticker could be analyzed."));
    }

    #[test]
    fn test_notice_tags() {
        let notice = Notice::new("AMD", Severity::Warning, "Skipping AMD due to no data".to_string());
        let mut out = Vec::new();
        write_notice(&mut out, &notice).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[WARN ] Skipping AMD due to no data\n");
    }
}
