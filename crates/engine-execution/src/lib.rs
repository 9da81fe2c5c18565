//! Fill/latency/fee models, the resting-order matching core, and the per-instrument
//! order matching engine that turns market data and trading commands into order
//! events (§4.A, §4.C, §4.D). This crate has no notion of wall-clock time, a data
//! feed, or a message bus — it is driven entirely by its caller (`engine-backtest`'s
//! simulated exchange), one instrument at a time.

#![warn(missing_debug_implementations)]

pub mod matching_core;
pub mod matching_engine;
pub mod models;

pub use matching_core::OrderMatchingCore;
pub use matching_engine::{OrderMatchingEngine, OrderMatchingEngineConfig};
pub use models::{FeeModel, FeeModelAny, FillModel, FixedFeeModel, LatencyModel, MakerTakerFeeModel};
