//! Payment collaborator port.
//!
//! The core calls the payment collaborator at pricing confirmation and at
//! completion/refund transitions and persists only the returned reference
//! and status; card data never enters the engine.

use crate::job::domain::{JobId, PaymentRef};
use crate::pricing::Money;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for payment gateway operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Payment collaborator contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes the quoted amount against the customer's payment method.
    async fn authorize(&self, job_id: JobId, amount: Money) -> PaymentResult<PaymentRef>;

    /// Captures a previously authorized payment.
    async fn capture(&self, reference: &PaymentRef) -> PaymentResult<()>;

    /// Refunds part or all of a captured payment.
    async fn refund(&self, reference: &PaymentRef, amount: Money) -> PaymentResult<()>;
}

/// Errors returned by the payment collaborator.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// The payment method declined the operation.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The reference is unknown to the collaborator.
    #[error("unknown payment reference: {0}")]
    UnknownReference(String),

    /// Collaborator-side failure.
    #[error("payment gateway error: {0}")]
    Gateway(Arc<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Wraps a gateway-side error.
    pub fn gateway(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Gateway(Arc::new(err))
    }
}
