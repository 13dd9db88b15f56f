//! Integration tests for the Beacon gateway.
//!
//! `mock_infrastructure` provides a mockito-backed fake upstream that
//! understands the witness-probe protocol; the test modules drive the
//! full gateway against fleets of those fakes.


#[cfg(test)]
mod concurrency_tests;
#[cfg(test)]
mod gateway_scenarios;
