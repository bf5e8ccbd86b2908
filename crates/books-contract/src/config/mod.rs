// crates/books-contract/src/config/mod.rs
// ============================================================================
// Module: Contract Configuration
// Description: Effective configuration resolution for Books contract runs.
// Purpose: Merge a TOML properties file with environment overrides.
// Dependencies: toml, url, tracing
// ============================================================================

//! ## Overview
//! Settings are addressed by dotted keys (`base.url`, `socket.timeout`, ...).
//! A key resolves to the environment variable named by upper-casing the key
//! and replacing `.` with `_` when that variable is set and non-empty, and to
//! the properties file value otherwise. Typed accessors fail closed on
//! malformed values instead of defaulting.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;
mod properties;
mod resolver;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::EnvSource;
pub use env::MapEnv;
pub use env::ProcessEnv;
pub use env::env_key;
pub use properties::MAX_PROPERTIES_FILE_SIZE;
pub use properties::PropertySet;
pub use properties::PropertySource;
pub use resolver::CONFIG_PATH_ENV;
pub use resolver::ConfigKey;
pub use resolver::ConfigResolver;
pub use resolver::DEFAULT_CONFIG_NAME;
pub use resolver::DEFAULT_FIRST_SCENARIO_ID;
pub use resolver::EffectiveConfig;
pub use resolver::MAX_FIRST_SCENARIO_ID;
