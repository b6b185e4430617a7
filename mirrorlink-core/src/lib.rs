//! MirrorLink core: configuration, logging and resolver bootstrap.

pub mod bootstrap;
pub mod config;
pub mod logging;

pub use config::{Config, MirrorProfile};
