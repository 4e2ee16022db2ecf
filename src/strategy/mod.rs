//! Decision engine
//!
//! Pure evaluation over a [`MarketSnapshot`] plus the controller that turns
//! decisions into gateway calls.

pub mod controller;
pub mod liquidity;
pub mod pricer;
pub mod reconciler;
pub mod snapshot;
pub mod stop_loss;

pub use controller::{CycleOutcome, StrategyController};
pub use liquidity::{walk, Fill};
pub use pricer::GridPricer;
pub use reconciler::OrderReconciler;
pub use snapshot::{MarketSnapshot, SnapshotAggregator};
pub use stop_loss::StopLossDetector;
