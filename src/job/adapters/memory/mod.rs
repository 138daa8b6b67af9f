//! In-memory adapter implementations of the job ports.

mod job;
mod notifier;
mod payment;

pub use job::InMemoryJobRepository;
pub use notifier::RecordingDispatcher;
pub use payment::{PaymentCall, RecordingPaymentGateway};
