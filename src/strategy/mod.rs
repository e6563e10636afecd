//! Trade math — minimum-output bounds and inter-trade pacing.
//!
//! Pure functions only; the controller owns when they are applied.

pub mod pacing;
pub mod slippage;

pub use pacing::Pacing;
pub use slippage::Slippage;
