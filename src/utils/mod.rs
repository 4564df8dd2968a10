pub mod command;
pub mod exec;
pub mod file;
pub mod metrics;
