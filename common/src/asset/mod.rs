//! Base Asset Module
//!
//! Asset kinds served by the deployment core and the per-kind parameters
//! their master implementations are initialized with.

pub mod amount;
mod kind;
mod params;

pub use kind::*;
pub use params::*;
