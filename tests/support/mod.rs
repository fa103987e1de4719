//! Shared test utilities.

use tempfile::TempDir;

/// Creates a temporary directory for warehouse tests.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}

/// Path of the warehouse database inside `temp_dir`.
pub fn create_database_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("warehouse.sqlite")
        .to_string_lossy()
        .into_owned()
}
