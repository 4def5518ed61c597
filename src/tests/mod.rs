//! Scenario tests driving the flow and the dashboard through the in-crate
//! wallet and RPC doubles.

mod dashboard_tests;
