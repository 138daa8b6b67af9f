//! Recording payment gateway fake.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::job::domain::{JobId, PaymentRef};
use crate::job::ports::payment::{PaymentError, PaymentGateway, PaymentResult};
use crate::pricing::Money;

/// One recorded call against the fake gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCall {
    /// An authorization for a job and amount.
    Authorize(JobId, Money),
    /// A capture of an authorized reference.
    Capture(PaymentRef),
    /// A refund against a reference.
    Refund(PaymentRef, Money),
}

/// Payment gateway fake that authorizes everything and records calls.
///
/// Set `decline` to make subsequent authorizations fail, for exercising
/// the declined path.
#[derive(Debug, Clone, Default)]
pub struct RecordingPaymentGateway {
    calls: Arc<RwLock<Vec<PaymentCall>>>,
    decline: Arc<RwLock<bool>>,
}

impl RecordingPaymentGateway {
    /// Creates a gateway that approves everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PaymentCall> {
        self.calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Makes subsequent authorizations decline.
    pub fn decline_authorizations(&self) {
        if let Ok(mut decline) = self.decline.write() {
            *decline = true;
        }
    }

    fn record(&self, call: PaymentCall) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn authorize(&self, job_id: JobId, amount: Money) -> PaymentResult<PaymentRef> {
        let declined = self.decline.read().map(|d| *d).unwrap_or(false);
        if declined {
            return Err(PaymentError::Declined("card declined".to_owned()));
        }
        self.record(PaymentCall::Authorize(job_id, amount));
        Ok(PaymentRef::new(format!("auth-{job_id}")))
    }

    async fn capture(&self, reference: &PaymentRef) -> PaymentResult<()> {
        self.record(PaymentCall::Capture(reference.clone()));
        Ok(())
    }

    async fn refund(&self, reference: &PaymentRef, amount: Money) -> PaymentResult<()> {
        self.record(PaymentCall::Refund(reference.clone(), amount));
        Ok(())
    }
}
