pub mod fee;
pub mod fill;
pub mod latency;

pub use fee::{FeeModel, FeeModelAny, FixedFeeModel, MakerTakerFeeModel};
pub use fill::FillModel;
pub use latency::LatencyModel;
