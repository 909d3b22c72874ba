use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instruments the agent is allowed to trade.
///
/// Anything outside this set is rejected when the loop is configured, never
/// at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingPair {
    BtcUsdt,
    EthUsdt,
    SolUsdt,
    XrpUsdt,
    DogeUsdt,
    AdaUsdt,
    BnbUsdt,
    LtcUsdt,
}

impl TradingPair {
    pub const ALL: [TradingPair; 8] = [
        TradingPair::BtcUsdt,
        TradingPair::EthUsdt,
        TradingPair::SolUsdt,
        TradingPair::XrpUsdt,
        TradingPair::DogeUsdt,
        TradingPair::AdaUsdt,
        TradingPair::BnbUsdt,
        TradingPair::LtcUsdt,
    ];

    /// Exchange symbol (e.g. "BTCUSDT")
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::BtcUsdt => "BTCUSDT",
            TradingPair::EthUsdt => "ETHUSDT",
            TradingPair::SolUsdt => "SOLUSDT",
            TradingPair::XrpUsdt => "XRPUSDT",
            TradingPair::DogeUsdt => "DOGEUSDT",
            TradingPair::AdaUsdt => "ADAUSDT",
            TradingPair::BnbUsdt => "BNBUSDT",
            TradingPair::LtcUsdt => "LTCUSDT",
        }
    }

    /// Number of decimal places the exchange accepts for order size
    pub fn size_precision(&self) -> u32 {
        match self {
            TradingPair::BtcUsdt => 3,
            TradingPair::EthUsdt => 2,
            TradingPair::BnbUsdt | TradingPair::LtcUsdt | TradingPair::SolUsdt => 1,
            TradingPair::XrpUsdt | TradingPair::AdaUsdt | TradingPair::DogeUsdt => 0,
        }
    }

    /// Parses a list of symbols; fails on the first unsupported one.
    pub fn parse_list<S: AsRef<str>>(symbols: &[S]) -> Result<Vec<TradingPair>, ConfigError> {
        symbols.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradingPair {
    type Err = ConfigError;

    /// Accepts "BTCUSDT", "BTC/USDT", "btc-usdt" and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '/' | '-' | '_'))
            .collect::<String>()
            .to_ascii_uppercase();

        TradingPair::ALL
            .iter()
            .copied()
            .find(|pair| pair.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnsupportedSymbol {
                symbol: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_spellings() {
        assert_eq!("BTCUSDT".parse::<TradingPair>().unwrap(), TradingPair::BtcUsdt);
        assert_eq!("btc/usdt".parse::<TradingPair>().unwrap(), TradingPair::BtcUsdt);
        assert_eq!("Eth-Usdt".parse::<TradingPair>().unwrap(), TradingPair::EthUsdt);
        assert_eq!(" DOGEUSDT ".parse::<TradingPair>().unwrap(), TradingPair::DogeUsdt);
    }

    #[test]
    fn test_parse_rejects_unsupported() {
        let err = "AAPL".parse::<TradingPair>().unwrap_err();
        assert!(err.to_string().contains("AAPL"));
        assert!("BTCUSD".parse::<TradingPair>().is_err());
        assert!("".parse::<TradingPair>().is_err());
    }

    #[test]
    fn test_parse_list_fails_on_first_bad_symbol() {
        let ok = TradingPair::parse_list(&["BTCUSDT", "SOLUSDT"]).unwrap();
        assert_eq!(ok, vec![TradingPair::BtcUsdt, TradingPair::SolUsdt]);

        assert!(TradingPair::parse_list(&["BTCUSDT", "SHIBUSDT"]).is_err());
    }

    #[test]
    fn test_serde_uses_exchange_symbol() {
        let json = serde_json::to_string(&TradingPair::XrpUsdt).unwrap();
        assert_eq!(json, "\"XRPUSDT\"");
        let back: TradingPair = serde_json::from_str("\"LTCUSDT\"").unwrap();
        assert_eq!(back, TradingPair::LtcUsdt);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for pair in TradingPair::ALL {
            assert_eq!(pair.to_string().parse::<TradingPair>().unwrap(), pair);
        }
    }
}
