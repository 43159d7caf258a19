pub mod config;
pub mod polls;
pub mod push;
