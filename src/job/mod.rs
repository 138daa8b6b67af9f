//! Job lifecycle management.
//!
//! Layered hexagonally: `domain` holds the aggregates and transition
//! rules, `ports` the collaborator contracts, `adapters` the in-memory
//! implementations, and `services` the orchestration that ties them to
//! the pricing and catalog modules.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod tests;
