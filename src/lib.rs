//! Leave request approval for a self-service employee portal.
//!
//! Requests move through `team_leader_approval` and `confirm` before HR
//! validates them. Every read and write made on behalf of a portal user goes
//! through [`guard::Guard`], which limits it to the user's own rows and, for
//! team leaders, their team's approval queue.

pub mod actor;
pub mod allocation;
pub mod attachment;
pub mod config;
pub mod employee;
pub mod error;
pub mod guard;
pub mod leave;
pub mod outcome;
pub mod portal;
pub mod provisioning;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

pub use actor::{Actor, Role};
pub use error::LeaveError;
pub use service::LeaveService;
