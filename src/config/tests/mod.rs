//! Unit tests for configuration loading and precedence.
//!
//! Tests are organised into modules by functional area:
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `field_resolution`: Token, repository and database URL resolution tests
//! - `sync_settings`: Conversion into client and sync settings
//! - `validation`: Range and pipeline validation tests

mod helpers;
