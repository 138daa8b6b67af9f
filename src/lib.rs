//! Despatch: job dispatch and SLA-bound lifecycle engine for a
//! home-services marketplace.
//!
//! The crate accepts customer service requests against a closed task
//! catalog, matches them to providers, enforces time-bound service-level
//! guarantees, tracks every state transition from creation to completion
//! or cancellation, and computes the financial consequences (commission,
//! cancellation fees) from pricing and SLA snapshots frozen at
//! confirmation time.
//!
//! # Architecture
//!
//! Despatch follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory stores,
//!   recording fakes)
//!
//! # Modules
//!
//! - [`catalog`]: Read-only task catalog and SLA profile store
//! - [`pricing`]: Money, quotes, commission, and cancellation fees
//! - [`job`]: Job/assignment/escalation lifecycle and its services
//! - [`dispatch`]: Provider matching and the time-boxed offer protocol
//! - [`sla`]: Deadline evaluation, breach detection, and escalation

pub mod catalog;
pub mod dispatch;
pub mod job;
pub mod pricing;
pub mod sla;
