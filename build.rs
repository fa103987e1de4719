//! Build script that ensures Cargo rebuilds when migrations change.
//!
//! `embed_migrations!` reads the raw-table migrations at compile time, but
//! Cargo cannot see those files on its own.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
