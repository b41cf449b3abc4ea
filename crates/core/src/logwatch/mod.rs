//! Background log watcher: detects build failures and unhandled tracebacks
//! in collaborator logs while a run is in flight.

mod watcher;

pub use watcher::{find_traceback, LogFailure, LogWatcher};
