//! Proposal registry module - The heart of the relay
//!
//! Tracks every proposal ever fetched, which ones have already triggered an
//! activation notification, and answers "what is active right now".

mod models;
mod registry;
mod store;

pub use models::*;
pub use registry::ProposalRegistry;
pub use store::RegistryStore;
