//! Port contracts for job lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by job services.

pub mod notification;
pub mod payment;
pub mod repository;

pub use notification::{LifecycleEvent, NotificationDispatcher};
pub use payment::{PaymentError, PaymentGateway, PaymentResult};
pub use repository::{
    JobChange, JobRepository, JobRepositoryError, JobRepositoryResult, JobSnapshot,
};
