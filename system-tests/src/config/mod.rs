// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Centralized configuration for Books contract system tests.
// Purpose: Provide typed access to test environment settings and defaults.
// Dependencies: books-contract
// ============================================================================

//! ## Overview
//! Knobs shared by the system-test binaries: where artifacts go, where the
//! stub binds, and how long to wait.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
