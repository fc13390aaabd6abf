//! # media-sort CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! media-sort discover ~/Pictures
//! media-sort organize ~/Pictures --target ~/Library --format "{D.YYYY}/{D.MM}/{NAME}.{EXT}"
//! ```

mod cli;

use media_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}
