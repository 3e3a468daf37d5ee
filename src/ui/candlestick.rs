//! Text candlestick chart drawn with box-drawing glyphs.
//!
//! Rows are rendered top to bottom. For each row a candle contributes one of
//! three zones (upper wick, body, lower wick); quarter-row thresholds pick a
//! half or full glyph so bodies and wicks end between character cells.

use chrono::Datelike;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

use crate::market::PriceBar;

const VOID: char = ' ';
const BODY: char = '┃';
const HALF_BODY_BOTTOM: char = '╻';
const HALF_BODY_TOP: char = '╹';
const WICK: char = '│';
const BODY_TO_WICK_TOP: char = '╽';
const BODY_TO_WICK_BOTTOM: char = '╿';
const UPPER_WICK: char = '╷';
const LOWER_WICK: char = '╵';

pub const BULLISH_COLOR: Color = Color::Rgb(52, 208, 88);
pub const BEARISH_COLOR: Color = Color::Rgb(234, 74, 90);

/// "  1234.56 │ "
pub const Y_AXIS_WIDTH: u16 = 12;
/// Date label row under the candles
pub const X_AXIS_HEIGHT: u16 = 1;

/// Price label every N rows
const Y_LABEL_EVERY: u16 = 4;
const LABEL_GAP: usize = 2;

/// Lays out a series of candles into a fixed text area.
pub struct CandlestickRenderer {
    candles: Vec<PriceBar>,
    weekly: bool,
    min_price: f64,
    max_price: f64,
    /// Candle rows
    height: u16,
    /// Candle columns
    width: u16,
}

impl CandlestickRenderer {
    pub fn new(bars: &[PriceBar], area_width: u16, area_height: u16) -> Self {
        let width = area_width.saturating_sub(Y_AXIS_WIDTH);
        let height = area_height.saturating_sub(X_AXIS_HEIGHT);
        let (candles, weekly) = fit_candles(bars, width as usize);
        let (min_price, max_price) = price_bounds(&candles);

        Self {
            candles,
            weekly,
            min_price,
            max_price,
            height,
            width,
        }
    }

    /// True when daily bars were folded into weekly candles to fit
    pub fn is_weekly(&self) -> bool {
        self.weekly
    }

    pub fn candle_count(&self) -> usize {
        self.candles.len()
    }

    fn price_to_height(&self, price: f64) -> f64 {
        if self.max_price == self.min_price {
            return self.height as f64 / 2.0;
        }
        (price - self.min_price) / (self.max_price - self.min_price) * self.height as f64
    }

    fn color(candle: &PriceBar) -> Color {
        if candle.close >= candle.open {
            BULLISH_COLOR
        } else {
            BEARISH_COLOR
        }
    }

    fn glyph(&self, candle: &PriceBar, row: u16) -> char {
        let y = row as f64;
        let high = self.price_to_height(candle.high);
        let low = self.price_to_height(candle.low);
        let top = self.price_to_height(candle.open.max(candle.close));
        let bottom = self.price_to_height(candle.open.min(candle.close));

        if high.ceil() >= y && y >= top.floor() {
            // Upper wick, possibly with the top of the body
            if top - y > 0.75 {
                BODY
            } else if top - y > 0.25 {
                if high - y > 0.75 {
                    BODY_TO_WICK_TOP
                } else {
                    HALF_BODY_BOTTOM
                }
            } else if high - y > 0.75 {
                WICK
            } else if high - y > 0.25 {
                UPPER_WICK
            } else {
                VOID
            }
        } else if top.floor() >= y && y >= bottom.ceil() {
            BODY
        } else if bottom.ceil() >= y && y >= low.floor() {
            // Lower wick, possibly with the bottom of the body
            if bottom - y < 0.25 {
                BODY
            } else if bottom - y < 0.75 {
                if low - y < 0.25 {
                    BODY_TO_WICK_BOTTOM
                } else {
                    HALF_BODY_TOP
                }
            } else if low - y < 0.25 {
                WICK
            } else if low - y < 0.75 {
                LOWER_WICK
            } else {
                VOID
            }
        } else {
            VOID
        }
    }

    fn y_label(&self, row: u16) -> String {
        if row % Y_LABEL_EVERY == 0 || row == self.height {
            let price = self.min_price + row as f64 * (self.max_price - self.min_price) / self.height as f64;
            format!("{:>9.2} │ ", price)
        } else {
            format!("{:>9} │ ", "")
        }
    }

    /// Column of each candle, spread evenly over the chart width
    fn columns(&self) -> Vec<usize> {
        let width = self.width as usize;
        match self.candles.len() {
            0 => Vec::new(),
            1 => vec![width / 2],
            n => {
                let spacing = width as f64 / n as f64;
                (0..n)
                    .map(|i| ((i as f64 * spacing).round() as usize).min(width.saturating_sub(1)))
                    .collect()
            }
        }
    }

    /// Candle rows followed by the date axis. Empty when there is no room.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        if self.candles.is_empty() || self.width == 0 || self.height == 0 {
            return Vec::new();
        }

        let columns = self.columns();
        let mut lines = Vec::with_capacity(self.height as usize + X_AXIS_HEIGHT as usize);

        for row in (1..=self.height).rev() {
            let mut cells: Vec<Span<'static>> = vec![Span::raw(" "); self.width as usize];
            for (candle, &column) in self.candles.iter().zip(&columns) {
                let glyph = self.glyph(candle, row);
                if glyph != VOID {
                    cells[column] = Span::styled(glyph.to_string(), Style::default().fg(Self::color(candle)));
                }
            }

            let mut spans = vec![Span::styled(self.y_label(row), Style::default().fg(Color::Gray))];
            spans.extend(cells);
            lines.push(Line::from(spans));
        }

        lines.push(self.date_axis(&columns));
        lines
    }

    fn date_axis(&self, columns: &[usize]) -> Line<'static> {
        let width = self.width as usize;
        let mut axis: Vec<char> = vec![' '; width];
        let mut next_free = 0;

        for (candle, &column) in self.candles.iter().zip(columns) {
            let label = if self.weekly || (candle.date.month() == 1 && candle.date.day() <= 7) {
                candle.date.format("%b %y").to_string()
            } else {
                candle.date.format("%b %d").to_string()
            };
            let len = label.chars().count();
            if column >= next_free && column + len <= width {
                for (offset, ch) in label.chars().enumerate() {
                    axis[column + offset] = ch;
                }
                next_free = column + len + LABEL_GAP;
            }
        }

        Line::from(vec![
            Span::raw(" ".repeat(Y_AXIS_WIDTH as usize)),
            Span::styled(axis.into_iter().collect::<String>(), Style::default().fg(Color::Gray)),
        ])
    }
}

/// Fold daily bars into ISO-week candles.
///
/// Each candle is dated by the first trading day of its week and takes that
/// day's open, the last day's close and the extreme high/low in between.
pub fn resample_to_weekly(bars: &[PriceBar]) -> Vec<PriceBar> {
    let mut weekly: Vec<PriceBar> = Vec::new();
    let mut current_week = None;

    for bar in bars {
        let week = bar.date.iso_week();
        let key = (week.year(), week.week());

        match weekly.last_mut() {
            Some(candle) if current_week == Some(key) => {
                candle.high = candle.high.max(bar.high);
                candle.low = candle.low.min(bar.low);
                candle.close = bar.close;
            }
            _ => {
                weekly.push(*bar);
                current_week = Some(key);
            }
        }
    }

    weekly
}

/// Daily candles when they fit, weekly otherwise, newest kept if still too many
fn fit_candles(bars: &[PriceBar], width: usize) -> (Vec<PriceBar>, bool) {
    if bars.len() <= width {
        return (bars.to_vec(), false);
    }

    let mut weekly = resample_to_weekly(bars);
    if weekly.len() > width {
        weekly.drain(..weekly.len() - width);
    }
    (weekly, true)
}

fn price_bounds(candles: &[PriceBar]) -> (f64, f64) {
    let max = candles.iter().fold(f64::NEG_INFINITY, |acc, c| acc.max(c.high));
    let min = candles.iter().fold(f64::INFINITY, |acc, c| acc.min(c.low));
    if !max.is_finite() || !min.is_finite() {
        return (0.0, 1.0);
    }

    let margin = if max > min { (max - min) * 0.02 } else { max.abs() * 0.01 + 0.01 };
    ((min - margin).max(0.0), max + margin)
}
