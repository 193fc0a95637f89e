//! Shared infrastructure for the plaque workspace: the 2D grid type,
//! parameter file formats and logging setup.

pub mod buffer2;
pub mod file_format;
pub mod log_setup;
pub mod serde;

pub use buffer2::{Buffer2, ShapeError};
pub use file_format::FileFormat;
