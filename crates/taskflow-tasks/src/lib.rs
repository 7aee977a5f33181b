//! Standard task library
//!
//! Collection of built-in tasks that flow plans can refer to by name

mod aggregate;
mod debug;
mod time;

pub use aggregate::{CollectTask, MaxTask};
pub use debug::{EchoTask, FailTask};
pub use time::DelayTask;

use std::sync::Arc;
use taskflow_core::Value;
use taskflow_runtime::{spawned, TaskRegistry};

/// Register all standard tasks with a registry
pub fn register_all(registry: &mut TaskRegistry) {
    registry.register("echo", Arc::new(spawned(EchoTask)), debug::echo_metadata());
    registry.register("fail", Arc::new(spawned(FailTask)), debug::fail_metadata());
    registry.register("delay", Arc::new(spawned(DelayTask)), time::delay_metadata());
    registry.register("max", Arc::new(spawned(MaxTask)), aggregate::max_metadata());
    registry.register("collect", Arc::new(spawned(CollectTask)), aggregate::collect_metadata());
}

/// A single argument as itself, several as an array
pub(crate) fn echo_value(mut args: Vec<Value>) -> Value {
    match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    }
}
