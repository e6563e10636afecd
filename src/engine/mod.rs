//! Trading engine: read-only balance inspection and the swap cycle loop.

pub mod controller;
pub mod inspector;

pub use controller::{CycleOutcome, SwapCycleController};
pub use inspector::{BalanceInspector, BalanceReport, PreflightError};
