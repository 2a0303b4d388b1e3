//! Core type definitions using newtype patterns for type safety.
//!
//! Also home of the target and port expanders, which turn user input into
//! the ordered host and port sets the scan engine iterates over.

mod port;
mod session_id;
mod target;

pub use port::{expand_ports, Port, PortError, PortRange, PortSpec};
pub use session_id::SessionId;
pub use target::{expand_targets, TargetError, TargetSpec};
