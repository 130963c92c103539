//! Serializable backtest configuration.
//!
//! ```toml
//! [backtest]
//! data = "prices.csv"
//! initial_capital = 10000.0
//! allocation_fraction = 0.10
//!
//! [costs]
//! maker_fee = 0.001
//! taker_fee = 0.002
//! slippage_fraction = 0.0005
//!
//! [strategy]
//! type = "ma_crossover"
//! fast_period = 5
//! slow_period = 20
//! ```
//!
//! Every section and field is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use tradesim_core::engine::{CostModel, EngineConfig};
use tradesim_core::strategy::{
    BuyAndHold, HoldStrategy, MovingAverageCross, RandomStrategy, Strategy, StrategyError,
};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("unknown strategy '{0}'. Valid: hold, buy_and_hold, ma_crossover, random")]
    UnknownStrategy(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub costs: CostsSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// CSV market data. A CLI `--data` flag takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    pub initial_capital: f64,
    pub allocation_fraction: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            data: None,
            initial_capital: engine.initial_capital,
            allocation_fraction: engine.allocation_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostsSection {
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub slippage_fraction: f64,
}

impl Default for CostsSection {
    fn default() -> Self {
        let costs = CostModel::default();
        Self {
            maker_fee: costs.maker_fee,
            taker_fee: costs.taker_fee,
            slippage_fraction: costs.slippage_fraction,
        }
    }
}

/// Strategy selection (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Never trades.
    Hold,

    /// One buy per symbol on its first observation.
    BuyAndHold,

    /// Fast SMA crossing slow SMA.
    MaCrossover {
        #[serde(default = "default_fast_period")]
        fast_period: usize,
        #[serde(default = "default_slow_period")]
        slow_period: usize,
    },

    /// Seeded coin-flip signals.
    Random {
        #[serde(default = "default_probability")]
        probability: f64,
        #[serde(default = "default_strength")]
        strength: f64,
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

fn default_fast_period() -> usize {
    5
}

fn default_slow_period() -> usize {
    20
}

fn default_probability() -> f64 {
    RandomStrategy::DEFAULT_PROBABILITY
}

fn default_strength() -> f64 {
    RandomStrategy::DEFAULT_STRENGTH
}

fn default_seed() -> u64 {
    42
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::Random {
            probability: default_probability(),
            strength: default_strength(),
            seed: default_seed(),
        }
    }
}

impl StrategyConfig {
    /// Default parameters for a strategy name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "hold" => Ok(Self::Hold),
            "buy_and_hold" => Ok(Self::BuyAndHold),
            "ma_crossover" => Ok(Self::MaCrossover {
                fast_period: default_fast_period(),
                slow_period: default_slow_period(),
            }),
            "random" => Ok(Self::default()),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::BuyAndHold => "buy_and_hold",
            Self::MaCrossover { .. } => "ma_crossover",
            Self::Random { .. } => "random",
        }
    }

    /// Build the configured strategy, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        let strategy: Box<dyn Strategy> = match *self {
            Self::Hold => Box::new(HoldStrategy),
            Self::BuyAndHold => Box::new(BuyAndHold::new()),
            Self::MaCrossover {
                fast_period,
                slow_period,
            } => Box::new(MovingAverageCross::new(fast_period, slow_period)?),
            Self::Random {
                probability,
                strength,
                seed,
            } => Box::new(RandomStrategy::new(probability, strength, seed)?),
        };
        Ok(strategy)
    }
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.backtest.initial_capital,
            maker_fee: self.costs.maker_fee,
            taker_fee: self.costs.taker_fee,
            slippage_fraction: self.costs.slippage_fraction,
            allocation_fraction: self.backtest.allocation_fraction,
        }
    }

    /// Check numeric ranges and strategy parameters without running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_engine_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.strategy.build()?;
        Ok(())
    }

    /// Override the random strategy's seed. No effect on other strategies.
    pub fn with_seed(mut self, new_seed: u64) -> Self {
        if let StrategyConfig::Random { seed, .. } = &mut self.strategy {
            *seed = new_seed;
        }
        self
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs over the same dataset produce
    /// identical results.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
