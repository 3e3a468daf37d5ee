use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, Paragraph, Row, Table, Tabs,
    },
    Frame,
};

use super::candlestick::CandlestickRenderer;
use super::{App, ClickableRegions, InputMode};
use crate::analysis::TickerReport;
use crate::returns::Severity;

const SIDEBAR_WIDTH: u16 = 30;
const NOTICE_ROWS: u16 = 8;

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Cyan,
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    // Clear clickable regions before each render
    app.clickable_regions = ClickableRegions::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(40)])
        .split(chunks[1]);

    render_sidebar(f, app, body[0]);

    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // Report tabs
            Constraint::Min(10),             // Report
            Constraint::Length(NOTICE_ROWS), // Notices
        ])
        .split(body[1]);

    render_report_tabs(f, app, content[0]);
    render_report(f, app, content[1]);
    render_notices(f, app, content[2]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " Stock Analysis Dashboard ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    if let Some((severity, message)) = &app.status {
        spans.push(Span::raw(" |  "));
        let style = Style::default().fg(severity_color(*severity));
        let style = if app.is_fetching { style.add_modifier(Modifier::BOLD) } else { style };
        spans.push(Span::styled(message.clone(), style));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn render_sidebar(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = app
        .candidates
        .iter()
        .zip(&app.selected)
        .map(|(symbol, &on)| {
            let (mark, style) = if on {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default().fg(Color::Gray))
            };
            ListItem::new(Line::from(vec![Span::styled(mark, style), Span::raw(symbol.clone())]))
        })
        .collect();

    let count = app.selected.iter().filter(|&&on| on).count();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Tickers ({} selected) ", count)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, chunks[0], &mut app.list_state);

    // Row rects follow the scroll offset the list just settled on
    let offset = app.list_state.offset();
    let inner_height = chunks[0].height.saturating_sub(2) as usize;
    let row_width = chunks[0].width.saturating_sub(2);
    for (row, idx) in (offset..app.candidates.len()).take(inner_height).enumerate() {
        let row_rect = Rect::new(chunks[0].x + 1, chunks[0].y + 1 + row as u16, row_width, 1);
        app.clickable_regions.ticker_rows.push((row_rect, idx));
    }

    render_amount(f, app, chunks[1]);
}

fn render_amount(f: &mut Frame, app: &mut App, area: Rect) {
    app.clickable_regions.amount_field = area;

    let (text, border) = match &app.input_mode {
        InputMode::EditAmount(buffer) => (
            Line::from(vec![Span::raw(" $"), Span::raw(buffer.clone()), Span::raw("_").slow_blink()]),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::Normal => (Line::from(format!(" {}", app.amount.value)), Style::default()),
    };

    let title = if app.amount.pending { " Amount (pending) " } else { " Investment Amount " };
    let paragraph = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    );
    f.render_widget(paragraph, area);
}

fn render_report_tabs(f: &mut Frame, app: &mut App, area: Rect) {
    let symbols: Vec<String> = app
        .run
        .as_ref()
        .map(|run| run.reports.iter().map(|r| r.symbol().to_string()).collect())
        .unwrap_or_default();

    let mut titles: Vec<Line> = Vec::with_capacity(symbols.len());
    let mut current_x = area.x + 1;
    for (i, symbol) in symbols.iter().enumerate() {
        let title = format!(" {} ", symbol);
        let width = title.chars().count() as u16;
        app.clickable_regions.report_tabs.push((Rect::new(current_x, area.y + 1, width, 1), i));
        current_x += width + 1; // +1 for divider "|"

        titles.push(if i == app.active_report {
            Line::from(title).cyan().bold()
        } else {
            Line::from(title).dark_gray()
        });
    }

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(" Reports "))
        .divider("|");
    f.render_widget(tabs, area);
}

fn render_report(f: &mut Frame, app: &App, area: Rect) {
    let report = app.run.as_ref().and_then(|run| run.reports.get(app.active_report));

    let Some(report) = report else {
        let hint = if app.is_fetching {
            "  Fetching..."
        } else if app.run.is_some() {
            "  No ticker could be analyzed. See notices below."
        } else {
            "  Select tickers with Space, then press Enter to analyze."
        };
        let paragraph = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Percentage(40),
            Constraint::Min(8),
        ])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[0]);

    render_price_table(f, report, top[0]);
    render_investment_status(f, report, top[1]);
    render_daily_change(f, report, chunks[1]);
    render_candlesticks(f, report, chunks[2]);
}

fn render_price_table(f: &mut Frame, report: &TickerReport, area: Rect) {
    let header = Row::new(["Date", "Open", "High", "Low", "Close"].map(|h| Cell::from(h)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = report
        .recent_bars()
        .iter()
        .map(|bar| {
            Row::new(vec![
                Cell::from(bar.date.format("%Y-%m-%d").to_string()),
                Cell::from(format!("{:.2}", bar.open)),
                Cell::from(format!("{:.2}", bar.high)),
                Cell::from(format!("{:.2}", bar.low)),
                Cell::from(format!("{:.2}", bar.close)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Stock Data - {} ", report.symbol())),
    );
    f.render_widget(table, area);
}

fn render_investment_status(f: &mut Frame, report: &TickerReport, area: Rect) {
    let valuation = &report.valuation;
    let outcome_color = severity_color(valuation.outcome.severity());

    let text = vec![
        Line::from(format!("  Initial Investment Amount: {}", valuation.amount)),
        Line::from(vec![
            Span::raw("  Previous Value: "),
            Span::styled(format!("${:.2}", valuation.compounded_value), Style::default().bold()),
        ]),
        Line::from(vec![
            Span::raw("  Profit/Loss: "),
            Span::styled(
                format!("{:+.2} ({:+.2}%)", valuation.profit_loss(), valuation.return_percent()),
                Style::default().fg(outcome_color),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", valuation.outcome.message()),
            Style::default().fg(outcome_color).add_modifier(Modifier::BOLD),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .wrap(ratatui::widgets::Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(outcome_color))
                .title(format!(" Previous Investment Status - {} ", report.symbol())),
        );
    f.render_widget(paragraph, area);
}

fn render_daily_change(f: &mut Frame, report: &TickerReport, area: Rect) {
    let title = format!(" Daily Profit/Loss - {} ", report.symbol());
    let changes = report.daily_change.changes();

    // The first day is a fixed 0% with no prior close to compare against
    let range = report.daily_change.range().filter(|_| changes.len() > 1);
    let Some((min, max)) = range else {
        let no_data = Paragraph::new("  Not enough history for a daily change")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(no_data, area);
        return;
    };

    let data: Vec<(f64, f64)> = report
        .daily_change
        .percents()
        .enumerate()
        .map(|(i, p)| (i as f64, p))
        .collect();
    let max_x = (changes.len() - 1) as f64;
    let baseline = [(0.0, 0.0), (max_x, 0.0)];

    // Keep the zero line visible and give flat series some room
    let pad = ((max - min) * 0.05).max(0.5);
    let min_y = min.min(0.0) - pad;
    let max_y = max.max(0.0) + pad;

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&baseline),
        Dataset::default()
            .name("% change")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&data),
    ];

    let first = changes[0].date.format("%Y-%m-%d").to_string();
    let middle = changes[changes.len() / 2].date.format("%Y-%m-%d").to_string();
    let last = changes[changes.len() - 1].date.format("%Y-%m-%d").to_string();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, max_x])
                .labels(vec![Span::raw(first), Span::raw(middle), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .style(Style::default().fg(Color::Gray))
                .bounds([min_y, max_y])
                .labels(vec![
                    Span::raw(format!("{:.1}", min_y)),
                    Span::raw("0.0"),
                    Span::raw(format!("{:.1}", max_y)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_candlesticks(f: &mut Frame, report: &TickerReport, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);

    let renderer = CandlestickRenderer::new(report.series.bars(), inner.width, inner.height);
    let suffix = if renderer.is_weekly() { " (weekly)" } else { "" };
    let block = block.title(format!(" Candlestick Chart - {}{} ", report.symbol(), suffix));

    let lines = renderer.render_lines();
    let paragraph = if lines.is_empty() {
        Paragraph::new("Window too small for candles")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(lines)
    };
    f.render_widget(paragraph.block(block), area);
}

fn render_notices(f: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.notices.len().saturating_sub(visible);

    let lines: Vec<Line> = app
        .notices
        .iter()
        .skip(skip)
        .map(|n| Line::from(Span::styled(format!(" {}", n.message), Style::default().fg(severity_color(n.severity)))))
        .collect();

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Notices "));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let keys = match app.input_mode {
        InputMode::EditAmount(_) => " 0-9.=Type | Backspace=Delete | Enter=Apply & Run | Esc=Cancel ",
        InputMode::Normal => {
            " ↑↓jk=Nav | Space=Toggle | c=Clear | Enter/r=Analyze | i=Amount +/-=Step | ←→hl=Report | q=Quit "
        }
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(keys, Style::default().fg(Color::Yellow))));
    f.render_widget(paragraph, area);
}
