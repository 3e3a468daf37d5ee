//! Terminal stock analysis: one year of daily bars per ticker, daily change,
//! candlesticks and the buy-and-hold result of a fixed investment.

pub mod analysis;
pub mod config;
pub mod error;
pub mod market;
pub mod report;
pub mod returns;
pub mod ui;
