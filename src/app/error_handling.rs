//! Error handling utilities

use tracing::error;

use crate::error::{exit_code, Error};

/// Report a fatal error and exit with the matching status code
///
/// In verbose mode the full cause chain is printed as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    let code = error
        .downcast_ref::<Error>()
        .map_or(exit_code::GENERAL_ERROR, Error::exit_code);

    std::process::exit(code)
}
