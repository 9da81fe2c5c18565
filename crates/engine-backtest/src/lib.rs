//! Data producer, simulated exchange, and driver loop that run the backtest core
//! end to end (§4).

#![warn(missing_debug_implementations)]

pub mod commands;
pub mod data_producer;
pub mod engine;
pub mod exchange;

pub use commands::TradingCommand;
pub use data_producer::{BacktestDataProducer, CachedDataProducer, DataProducer, DataProducerInput};
pub use engine::{BacktestEngine, NextData};
pub use exchange::{SimulatedExchange, SimulatedExchangeConfig};
