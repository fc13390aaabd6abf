//! Placement building blocks.
//!
//! Expands destination templates, resolves name collisions and transfers
//! individual files. The placement pipeline drives these per category.

mod executor;
mod planner;
mod template;
mod types;

pub use executor::{is_cross_device, Filesystem, LocalFilesystem, TransferExecutor};
pub use planner::{OrganizePlanner, PathReservations, MAX_COLLISION_RETRIES};
pub use template::{
    random_suffix, DateCode, DateSource, PathTemplate, RenderedPath, Token, EMPTY_PATH_FALLBACK,
};
pub use types::*;
