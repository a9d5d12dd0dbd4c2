//! Child processes for `spin`.

pub mod runner;
pub mod signal;

pub use runner::{spawn, wait_exit, ChildEvent, ChildHandle, ExecutionStatus, Mode, RollingBuffer};
pub use signal::{signal_group, Signal};
