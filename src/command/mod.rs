//! Command execution over the transport session
//!
//! This module handles:
//! - Serializing submissions so each reply pairs with its command
//! - Publishing every outcome on a result stream
//! - Running multi-step plans at a fixed pace

mod dispatcher;
mod plan;

pub use dispatcher::{CommandDispatcher, CommandReport};
pub use plan::{Plan, PlanSequencer};
