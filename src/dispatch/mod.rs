//! Tool execution - dispatcher state machine, child process handling and
//! outcomes

mod dispatcher;
mod outcome;
mod process;

pub use dispatcher::Dispatcher;
pub use outcome::{ChildExit, ExecutionOutcome};
pub use process::{LaunchSpec, SignalRelay, run_streaming};
