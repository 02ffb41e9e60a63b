pub mod command;
pub mod schedule;
mod system;

pub use system::{AnySystem, System, SystemFn};
