//! Fee schedule and expected fees

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::maker_taker::FillSplit;
use crate::error::{Result, SimulatorError};

/// Fractional maker and taker rates for one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRates {
    pub maker: f64,
    pub taker: f64,
}

impl FeeRates {
    pub fn new(maker: f64, taker: f64) -> Result<Self> {
        for (name, rate) in [("maker", maker), ("taker", taker)] {
            if !(0.0..1.0).contains(&rate) {
                return Err(SimulatorError::ConfigError(format!(
                    "{} rate {} outside [0, 1)",
                    name, rate
                )));
            }
        }
        Ok(Self { maker, taker })
    }
}

/// Fee rates keyed by (exchange, tier)
///
/// Keys are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    tiers: HashMap<(String, String), FeeRates>,
}

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// OKX spot/swap tiers used when no schedule file is configured
    pub fn builtin() -> Self {
        let mut tiers = HashMap::new();
        for (tier, maker, taker) in [
            ("VIP0", 0.0008, 0.0010),
            ("VIP1", 0.0006, 0.0008),
            ("VIP2", 0.0004, 0.0006),
        ] {
            tiers.insert(key("OKX", tier), FeeRates { maker, taker });
        }
        Self { tiers }
    }

    /// Load a schedule shaped `{exchange: {tier: {maker, taker}}}`
    ///
    /// Any format the `config` crate recognises by extension is accepted.
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let raw: HashMap<String, HashMap<String, FeeRates>> = settings.try_deserialize()?;

        let mut schedule = Self::new();
        for (exchange, tiers) in raw {
            for (tier, rates) in tiers {
                schedule.insert(&exchange, &tier, FeeRates::new(rates.maker, rates.taker)?);
            }
        }

        info!(path = %path.display(), tiers = schedule.len(), "Fee schedule loaded");
        Ok(schedule)
    }

    pub fn insert(&mut self, exchange: &str, tier: &str, rates: FeeRates) {
        self.tiers.insert(key(exchange, tier), rates);
    }

    pub fn rates(&self, exchange: &str, tier: &str) -> Result<FeeRates> {
        self.tiers
            .get(&key(exchange, tier))
            .copied()
            .ok_or_else(|| SimulatorError::UnknownFeeTier {
                exchange: exchange.to_string(),
                tier: tier.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

fn key(exchange: &str, tier: &str) -> (String, String) {
    (exchange.trim().to_uppercase(), tier.trim().to_uppercase())
}

/// Fees in quote currency for an order split between maker and taker fills
pub fn expected_fees(split: FillSplit, size_usd: f64, rates: FeeRates) -> f64 {
    split.maker * size_usd * rates.maker + split.taker * size_usd * rates.taker
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let schedule = FeeSchedule::builtin();
        let rates = schedule.rates("okx", "vip1").unwrap();
        assert_eq!(rates, FeeRates { maker: 0.0006, taker: 0.0008 });
    }

    #[test]
    fn test_unknown_tier() {
        let schedule = FeeSchedule::builtin();
        match schedule.rates("OKX", "VIP9") {
            Err(SimulatorError::UnknownFeeTier { exchange, tier }) => {
                assert_eq!(exchange, "OKX");
                assert_eq!(tier, "VIP9");
            }
            other => panic!("Expected UnknownFeeTier, got {:?}", other),
        }
        assert!(schedule.rates("Binance", "VIP0").is_err());
    }

    #[test]
    fn test_rates_validated() {
        assert!(FeeRates::new(0.001, 0.002).is_ok());
        assert!(FeeRates::new(-0.001, 0.002).is_err());
        assert!(FeeRates::new(0.001, 1.0).is_err());
    }

    #[test]
    fn test_expected_fees() {
        let rates = FeeRates { maker: 0.0008, taker: 0.0010 };
        let all_taker = expected_fees(FillSplit::ALL_TAKER, 100.0, rates);
        assert!((all_taker - 0.1).abs() < 1e-12);

        let even = expected_fees(FillSplit::EVEN, 100.0, rates);
        assert!((even - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[Bybit.VIP0]\nmaker = 0.001\ntaker = 0.0055\n\n[Bybit.VIP1]\nmaker = 0.0008\ntaker = 0.004"
        )
        .unwrap();

        let schedule = FeeSchedule::from_file(file.path()).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.rates("BYBIT", "VIP0").unwrap().taker, 0.0055);
        assert!(schedule.rates("OKX", "VIP0").is_err());
    }

    #[test]
    fn test_load_rejects_bad_rate() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"OKX": {{"VIP0": {{"maker": 1.5, "taker": 0.001}}}}}}"#).unwrap();
        assert!(matches!(
            FeeSchedule::from_file(file.path()),
            Err(SimulatorError::ConfigError(_))
        ));
    }
}
