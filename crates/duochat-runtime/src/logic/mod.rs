//! Routing logic for the duochat runtime
//!
//! `router` decides what each inbound event does; `fanout` turns those
//! decisions into sends on session handles.

pub mod fanout;
pub mod router;

pub use fanout::Fanout;
pub use router::{DispatchRouter, RouterStatistics};
