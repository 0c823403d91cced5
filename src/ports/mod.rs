//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the scanner core and the outside
//! world (time, filesystem, version control). Implementations live in
//! `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod git;

pub use clock::Clock;
pub use filesystem::FileSystem;
pub use git::GitRepo;
