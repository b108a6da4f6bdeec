#![allow(clippy::too_many_arguments)]

pub mod asset;
pub mod capability;
pub mod compatibility;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod event;
pub mod pagination;
pub mod time;
pub mod validation;
