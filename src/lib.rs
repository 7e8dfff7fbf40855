//! Small tracker of hours spent on named projects.
//! Totals are kept in a single json file and a running session is checkpointed into it every
//! minute, so an abrupt exit loses at most a minute of work.
//!

pub mod cli;
pub mod error;
pub mod fs;
pub mod store;
pub mod timer;
pub mod utils;
