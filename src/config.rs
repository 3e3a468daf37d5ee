use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

use crate::error::ConfigError;
use crate::returns::{InvestmentAmount, DEFAULT_AMOUNT};

/// Tickers offered in the selection list when no file overrides them
pub const DEFAULT_CANDIDATES: [&str; 19] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "MRNA", "NVAX", "INO", "BNTX", "VXRT", "AZN", "TCS", "LBPH", "AMD", "HIMS",
    "FIZZ", "CRSP", "LPL", "PRTA", "USCA",
];

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "stock-analysis")]
#[command(about = "One-year candlesticks, daily change and buy-and-hold profit/loss per ticker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Tickers to preselect, comma separated (e.g. AAPL,MSFT)
    #[arg(short, long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Investment amount applied to every selected ticker
    #[arg(short, long, env = "STOCK_ANALYSIS_AMOUNT", default_value_t = DEFAULT_AMOUNT)]
    pub amount: f64,

    /// Request timeout for each ticker fetch, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Print a text report to stdout instead of opening the dashboard
    #[arg(long)]
    pub plain: bool,

    /// Log file used while the dashboard owns the terminal
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Candidate ticker list, one symbol per line
    #[arg(long)]
    pub candidates_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub candidates: Vec<String>,
    pub preselected: Vec<String>,
    pub amount: InvestmentAmount,
    pub timeout: Duration,
    pub plain: bool,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let amount = InvestmentAmount::new(cli.amount)?;

        let mut candidates = match &cli.candidates_file {
            Some(path) => load_candidates(path)?,
            None => {
                let path = default_candidates_file();
                if path.exists() {
                    load_candidates(&path)?
                } else {
                    DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect()
                }
            }
        };

        let preselected: Vec<String> = cli
            .tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();

        // Preselected symbols are always selectable
        for symbol in &preselected {
            if !candidates.contains(symbol) {
                candidates.push(symbol.clone());
            }
        }

        if candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }

        Ok(Self {
            candidates,
            preselected,
            amount,
            timeout: Duration::from_secs(cli.timeout.max(1)),
            plain: cli.plain,
            log_file: cli.log_file.unwrap_or_else(default_log_file),
        })
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config/stock-analysis")
}

pub fn default_candidates_file() -> PathBuf {
    config_dir().join("tickers.conf")
}

pub fn default_log_file() -> PathBuf {
    PathBuf::from("/tmp/stock-analysis").join("stock-analysis.log")
}

pub fn load_candidates(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::TickerFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_candidates(&content))
}

/// One symbol per line; `#` comments and blank lines are skipped.
pub fn parse_candidates(content: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let symbol = line.split('#').next().unwrap_or_default().trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates() {
        let content = "# Candidate tickers\n\naapl\nMSFT  # software\n  nvax \nAAPL\n";
        assert_eq!(parse_candidates(content), vec!["AAPL", "MSFT", "NVAX"]);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["stock-analysis"]).unwrap();
        assert!(cli.tickers.is_empty());
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(!cli.plain);
    }

    #[test]
    fn test_config_from_cli_with_file() {
        let path = std::env::temp_dir().join(format!("stock-analysis-test-{}.conf", std::process::id()));
        fs::write(&path, "# mine\nAMD\nHIMS\n").unwrap();

        let cli = Cli::try_parse_from([
            "stock-analysis",
            "--tickers",
            "amd,TSLA",
            "--amount",
            "250.5",
            "--candidates-file",
            path.to_str().unwrap(),
            "--plain",
        ])
        .unwrap();
        let config = AppConfig::from_cli(cli).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.candidates, vec!["AMD", "HIMS", "TSLA"]);
        assert_eq!(config.preselected, vec!["AMD", "TSLA"]);
        assert_eq!(config.amount.value(), 250.5);
        assert!(config.plain);
    }

    #[test]
    fn test_config_rejects_bad_amount() {
        let cli = Cli::try_parse_from(["stock-analysis", "--amount", "0", "--candidates-file", "/nonexistent"]).unwrap();
        assert!(matches!(AppConfig::from_cli(cli), Err(ConfigError::InvalidAmount(_))));
    }

    #[test]
    fn test_missing_candidates_file_is_error() {
        let cli = Cli::try_parse_from(["stock-analysis", "--candidates-file", "/nonexistent/tickers.conf"]).unwrap();
        assert!(matches!(AppConfig::from_cli(cli), Err(ConfigError::TickerFile { .. })));
    }
}
