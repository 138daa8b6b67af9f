//! Test suite for the job module, plus shared fixtures used by the
//! dispatch and SLA monitor tests.

pub(crate) mod support;

mod assignment_tests;
mod lifecycle_service_tests;
