//! Strategy identity: kind, underlying assets, status, and the parsed
//! definition used to register a strategy.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::fixed::{rate_from_hundredths_percent, ArithmeticError};
use crate::domain::primitives::{AssetId, StrategyId};

/// Which accrual model a strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Fixed-APY lending, simple interest on pooled principal.
    Lending,
    /// Pooled trading fees, accounted as an annualized fee rate.
    LiquidityPool,
    /// Per-second reward emission split pro rata across stakers.
    Staking,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Lending => write!(f, "lending"),
            StrategyKind::LiquidityPool => write!(f, "pool"),
            StrategyKind::Staking => write!(f, "staking"),
        }
    }
}

/// Lifecycle status of a strategy.
///
/// `Paused` is reversible through `set_active`; `EmergencyDrained` is
/// terminal and rejects all further mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyStatus {
    Active,
    Paused,
    EmergencyDrained,
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyStatus::Active => write!(f, "active"),
            StrategyStatus::Paused => write!(f, "paused"),
            StrategyStatus::EmergencyDrained => write!(f, "emergency_drained"),
        }
    }
}

/// One or two underlying assets.
///
/// Principal is always custodied in `base`. For a liquidity pool `quote`
/// names the paired token; for staking it names the reward token when that
/// differs from the staked one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    pub base: AssetId,
    pub quote: Option<AssetId>,
}

impl Assets {
    /// Single-asset strategy.
    pub fn single(base: AssetId) -> Self {
        Assets { base, quote: None }
    }

    /// Two-asset strategy (pool pair or stake/reward split).
    pub fn pair(base: AssetId, quote: AssetId) -> Self {
        Assets {
            base,
            quote: Some(quote),
        }
    }

    /// Asset principal deposits and withdrawals move in.
    pub fn principal_asset(&self) -> &AssetId {
        &self.base
    }

    /// Asset reward claims pay out in; falls back to `base`.
    pub fn reward_asset(&self) -> &AssetId {
        self.quote.as_ref().unwrap_or(&self.base)
    }
}

impl std::fmt::Display for Assets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.quote {
            Some(quote) => write!(f, "{}/{}", self.base, quote),
            None => write!(f, "{}", self.base),
        }
    }
}

/// A strategy definition as parsed from configuration.
///
/// `rate` is the PRECISION-scaled annual fraction for `Lending` and
/// `LiquidityPool`, and the raw reward emission in base units per second
/// for `Staking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDef {
    pub id: StrategyId,
    pub kind: StrategyKind,
    pub assets: Assets,
    pub rate: u128,
}

/// Failure to parse a strategy definition string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyParseError {
    #[error("malformed strategy definition '{0}', expected name=kind:assets@rate")]
    Malformed(String),
    #[error("unknown strategy kind '{0}'")]
    UnknownKind(String),
    #[error("invalid rate '{0}'")]
    InvalidRate(String),
    #[error("invalid assets '{0}'")]
    InvalidAssets(String),
}

impl From<ArithmeticError> for StrategyParseError {
    fn from(_: ArithmeticError) -> Self {
        StrategyParseError::InvalidRate("rate out of range".to_string())
    }
}

impl FromStr for StrategyDef {
    type Err = StrategyParseError;

    /// Parse `name=kind:assets@rate`, e.g. `compound-sim=lending:DAI@5.00`,
    /// `uniswap-sim=pool:USDC/WETH@0.30`, `synthetix-sim=staking:SNX@2`.
    ///
    /// Interest-bearing kinds take the rate as a percentage with up to two
    /// decimal places; staking takes whole reward units per second.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || StrategyParseError::Malformed(s.to_string());
        let (name, rest) = s.split_once('=').ok_or_else(malformed)?;
        let (kind_str, rest) = rest.split_once(':').ok_or_else(malformed)?;
        let (assets_str, rate_str) = rest.split_once('@').ok_or_else(malformed)?;
        if name.is_empty() {
            return Err(malformed());
        }

        let kind = match kind_str {
            "lending" => StrategyKind::Lending,
            "pool" => StrategyKind::LiquidityPool,
            "staking" => StrategyKind::Staking,
            other => return Err(StrategyParseError::UnknownKind(other.to_string())),
        };

        let assets = parse_assets(assets_str)?;
        let rate = match kind {
            StrategyKind::Lending | StrategyKind::LiquidityPool => {
                rate_from_hundredths_percent(parse_percent_hundredths(rate_str)?)?
            }
            StrategyKind::Staking => rate_str
                .parse::<u64>()
                .map_err(|_| StrategyParseError::InvalidRate(rate_str.to_string()))?
                as u128,
        };

        Ok(StrategyDef {
            id: StrategyId::new(name.to_string()),
            kind,
            assets,
            rate,
        })
    }
}

fn parse_assets(s: &str) -> Result<Assets, StrategyParseError> {
    let invalid = || StrategyParseError::InvalidAssets(s.to_string());
    let mut parts = s.split('/');
    let base = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
    let quote = match parts.next() {
        Some(q) if !q.is_empty() => Some(AssetId::new(q.to_string())),
        Some(_) => return Err(invalid()),
        None => None,
    };
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(Assets {
        base: AssetId::new(base.to_string()),
        quote,
    })
}

/// Parse a percentage with up to two decimal places into hundredths
/// ("5.00" -> 500, "0.3" -> 30).
fn parse_percent_hundredths(s: &str) -> Result<u64, StrategyParseError> {
    let invalid = || StrategyParseError::InvalidRate(s.to_string());
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || frac.len() > 2 {
        return Err(invalid());
    }
    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        // Right-pad so "3" means thirty hundredths, not three.
        let padded = format!("{frac:0<2}");
        padded.parse().map_err(|_| invalid())?
    };
    whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixed::PRECISION;

    #[test]
    fn test_parse_lending_def() {
        let def: StrategyDef = "compound-sim=lending:DAI@5.00".parse().unwrap();
        assert_eq!(def.id.as_str(), "compound-sim");
        assert_eq!(def.kind, StrategyKind::Lending);
        assert_eq!(def.assets, Assets::single(AssetId::new("DAI".to_string())));
        assert_eq!(def.rate, PRECISION / 20); // 5%
    }

    #[test]
    fn test_parse_pool_def_with_pair() {
        let def: StrategyDef = "uniswap-sim=pool:USDC/WETH@0.30".parse().unwrap();
        assert_eq!(def.kind, StrategyKind::LiquidityPool);
        assert_eq!(
            def.assets,
            Assets::pair(
                AssetId::new("USDC".to_string()),
                AssetId::new("WETH".to_string())
            )
        );
        assert_eq!(def.rate, 3 * PRECISION / 1000); // 0.30%
    }

    #[test]
    fn test_parse_staking_def_rate_is_raw_units() {
        let def: StrategyDef = "synthetix-sim=staking:SNX@2".parse().unwrap();
        assert_eq!(def.kind, StrategyKind::Staking);
        assert_eq!(def.rate, 2);
        assert_eq!(def.assets.reward_asset().as_str(), "SNX");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "nonsense".parse::<StrategyDef>(),
            Err(StrategyParseError::Malformed(_))
        ));
        assert!(matches!(
            "x=margin:DAI@5.00".parse::<StrategyDef>(),
            Err(StrategyParseError::UnknownKind(_))
        ));
        assert!(matches!(
            "x=lending:DAI@5.123".parse::<StrategyDef>(),
            Err(StrategyParseError::InvalidRate(_))
        ));
        assert!(matches!(
            "x=pool:A/B/C@0.30".parse::<StrategyDef>(),
            Err(StrategyParseError::InvalidAssets(_))
        ));
    }

    #[test]
    fn test_percent_hundredths() {
        assert_eq!(parse_percent_hundredths("5").unwrap(), 500);
        assert_eq!(parse_percent_hundredths("5.0").unwrap(), 500);
        assert_eq!(parse_percent_hundredths("0.3").unwrap(), 30);
        assert_eq!(parse_percent_hundredths("0.03").unwrap(), 3);
        assert_eq!(parse_percent_hundredths("12.34").unwrap(), 1234);
        assert!(parse_percent_hundredths("").is_err());
        assert!(parse_percent_hundredths(".5").is_err());
    }

    #[test]
    fn test_reward_asset_falls_back_to_base() {
        let single = Assets::single(AssetId::new("SNX".to_string()));
        assert_eq!(single.reward_asset().as_str(), "SNX");
        let split = Assets::pair(
            AssetId::new("LP".to_string()),
            AssetId::new("SUSHI".to_string()),
        );
        assert_eq!(split.reward_asset().as_str(), "SUSHI");
        assert_eq!(split.principal_asset().as_str(), "LP");
    }

    #[test]
    fn test_assets_display() {
        assert_eq!(
            Assets::pair(
                AssetId::new("USDC".to_string()),
                AssetId::new("WETH".to_string())
            )
            .to_string(),
            "USDC/WETH"
        );
        assert_eq!(
            Assets::single(AssetId::new("DAI".to_string())).to_string(),
            "DAI"
        );
    }
}
