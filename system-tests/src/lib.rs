// system-tests/src/lib.rs
// ============================================================================
// Module: Books Contract System Tests Library
// Description: Shared configuration for system test binaries.
// Purpose: Provide common settings for the Books contract system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the Books contract
//! system-test binaries in `system-tests/tests`. Suites run the harness
//! against an in-process Books stub; the `live-api` feature enables a run
//! against the API named by the harness configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
