//! Test suite for the SLA sweep monitor.

mod monitor_tests;
