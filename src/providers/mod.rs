//! External collaborators the tracking core consumes through narrow
//! contracts.

pub mod directory;

pub use directory::{Directory, DirectoryError};
