//! Orchestration services over the job domain and its ports.

mod lifecycle;
mod view;

pub use lifecycle::{JobLifecycleError, JobLifecycleService, LifecycleResult};
pub use view::{JobView, JobViewError, JobViewService, ViewResult};
