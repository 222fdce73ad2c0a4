//! Integration tests for uspy-harvest
//!
//! These tests use wiremock to stand in for JupiterWeb and the professor
//! listing, and exercise the harvest pipeline end-to-end.

mod common;
mod fetch_tests;
mod harvest_tests;
mod offerings_tests;
