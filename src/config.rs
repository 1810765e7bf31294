use std::collections::HashMap;
use thiserror::Error;

use crate::domain::strategy::StrategyDef;

#[derive(Debug, Clone)]
pub struct Config {
    pub sim_seed: u64,
    pub sim_days: u32,
    pub sim_participants: u32,
    pub sim_step_secs: u64,
    pub strategies: Vec<StrategyDef>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let sim_seed = env_map
            .get("SIM_SEED")
            .map(|s| s.as_str())
            .unwrap_or("42")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("SIM_SEED".to_string(), "must be a valid u64".to_string())
            })?;

        let sim_days = env_map
            .get("SIM_DAYS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue("SIM_DAYS".to_string(), "must be a valid u32".to_string())
            })?;

        let sim_participants = env_map
            .get("SIM_PARTICIPANTS")
            .map(|s| s.as_str())
            .unwrap_or("6")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SIM_PARTICIPANTS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        let sim_step_secs = env_map
            .get("SIM_STEP_SECS")
            .map(|s| s.as_str())
            .unwrap_or("3600")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "SIM_STEP_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;
        if sim_step_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SIM_STEP_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let strategies = parse_strategies_from_map(&env_map)?;

        Ok(Config {
            sim_seed,
            sim_days,
            sim_participants,
            sim_step_secs,
            strategies,
        })
    }
}

#[cfg_attr(not(test), allow(dead_code))]
fn parse_strategies_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<StrategyDef>, ConfigError> {
    let raw = env_map
        .get("STRATEGIES")
        .ok_or_else(|| ConfigError::MissingEnv("STRATEGIES".to_string()))?;

    let mut strategies = Vec::new();
    for segment in raw.split(';').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let def: StrategyDef = segment.parse().map_err(|e| {
            ConfigError::InvalidValue("STRATEGIES".to_string(), format!("{e}"))
        })?;
        if strategies.iter().any(|d: &StrategyDef| d.id == def.id) {
            return Err(ConfigError::InvalidValue(
                "STRATEGIES".to_string(),
                format!("duplicate strategy name '{}'", def.id),
            ));
        }
        strategies.push(def);
    }
    if strategies.is_empty() {
        return Err(ConfigError::InvalidValue(
            "STRATEGIES".to_string(),
            "must define at least one strategy".to_string(),
        ));
    }
    Ok(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::StrategyKind;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "STRATEGIES".to_string(),
            "compound-sim=lending:DAI@5.00; uniswap-sim=pool:USDC/WETH@0.30; synthetix-sim=staking:SNX@2"
                .to_string(),
        );
        map
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.sim_seed, 42);
        assert_eq!(config.sim_days, 30);
        assert_eq!(config.sim_participants, 6);
        assert_eq!(config.sim_step_secs, 3600);
        assert_eq!(config.strategies.len(), 3);
        assert_eq!(config.strategies[2].kind, StrategyKind::Staking);
    }

    #[test]
    fn test_missing_strategies() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "STRATEGIES"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_empty_strategies() {
        let mut env_map = setup_required_env();
        env_map.insert("STRATEGIES".to_string(), " ; ".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "STRATEGIES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_malformed_strategy_segment() {
        let mut env_map = setup_required_env();
        env_map.insert("STRATEGIES".to_string(), "broken".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "STRATEGIES"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_duplicate_strategy_name() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "STRATEGIES".to_string(),
            "a=lending:DAI@5.00;a=lending:DAI@4.00".to_string(),
        );
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, msg)) => {
                assert_eq!(k, "STRATEGIES");
                assert!(msg.contains("duplicate"));
            }
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_seed() {
        let mut env_map = setup_required_env();
        env_map.insert("SIM_SEED".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SIM_SEED"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("SIM_STEP_SECS".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SIM_STEP_SECS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
