//! `kgate version` — print name and version.

use anyhow::Result;

/// Run `kgate version`.
///
/// # Errors
///
/// Infallible; returns `Result` for uniformity with other handlers.
pub fn run() -> Result<()> {
    println!("kgate {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
