#![allow(clippy::too_many_arguments)]

pub mod beacon;
pub mod capability;
pub mod config;
pub mod context;
pub mod deployment;
pub mod discovery;
pub mod forge;
pub mod ledger;
pub mod logic;
pub mod policy;
pub mod registry;
pub mod scenario;
pub mod snapshot;
pub mod state;

pub use forge::Forge;
