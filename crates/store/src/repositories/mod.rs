//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&SqlitePool` as the first argument.

pub mod device_repo;
pub mod group_repo;

pub use device_repo::DeviceRepo;
pub use group_repo::GroupRepo;
