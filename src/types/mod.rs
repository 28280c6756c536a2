//! Core value types: handles, revisions, points

mod handle;
mod vector;
mod version;

pub use handle::{sort_handles, Handle, HandleGenerator};
pub use vector::{Vector2, Vector3};
pub use version::DxfVersion;
