//! Server configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;

use chess_duel_core::RulesConfig;
use thiserror::Error;

pub const DEFAULT_DB: &str = "chess_duel.db";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid CHESS_DUEL_ADDR '{0}'")]
    InvalidAddr(String),

    #[error("unknown draw rule '{0}' (expected fifty_move, insufficient_material, repetition or none)")]
    UnknownDrawRule(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub rules: RulesConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("CHESS_DUEL_DB").unwrap_or_else(|| DEFAULT_DB.to_string());

        let addr = lookup("CHESS_DUEL_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;

        let rules = match lookup("CHESS_DUEL_DRAW_RULES") {
            Some(list) => parse_draw_rules(&list)?,
            None => RulesConfig::default(),
        };

        Ok(Self {
            database_path: PathBuf::from(database_path),
            bind_addr,
            rules,
        })
    }
}

/// `fifty_move,repetition` enables just those two; `none` disables all.
fn parse_draw_rules(list: &str) -> Result<RulesConfig, ConfigError> {
    let mut rules = RulesConfig::strict();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match name {
            "fifty_move" => rules.fifty_move_rule = true,
            "insufficient_material" => rules.insufficient_material = true,
            "repetition" => rules.repetition = true,
            "none" => {}
            other => return Err(ConfigError::UnknownDrawRule(other.to_string())),
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("chess_duel.db"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.rules, RulesConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("CHESS_DUEL_DB", "/tmp/games.db"),
            ("CHESS_DUEL_ADDR", "0.0.0.0:8080"),
            ("CHESS_DUEL_DRAW_RULES", "fifty_move, repetition"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/games.db"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.rules.fifty_move_rule);
        assert!(config.rules.repetition);
        assert!(!config.rules.insufficient_material);
    }

    #[test]
    fn test_no_draw_rules() {
        let config = config(&[("CHESS_DUEL_DRAW_RULES", "none")]).unwrap();
        assert_eq!(config.rules, RulesConfig::strict());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            config(&[("CHESS_DUEL_ADDR", "localhost")]).unwrap_err(),
            ConfigError::InvalidAddr("localhost".to_string())
        );
        assert_eq!(
            config(&[("CHESS_DUEL_DRAW_RULES", "fifty_move,stalemate")]).unwrap_err(),
            ConfigError::UnknownDrawRule("stalemate".to_string())
        );
    }
}
