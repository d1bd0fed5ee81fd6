//! Filesystem module.
//!
//! Provides:
//! - Filename generation for the supported styles
//! - Collision-free path allocation
//! - Output directory checks and cleanup of interrupted downloads

pub mod naming;
pub mod paths;

pub use naming::{format_filename, numbered_filename, sanitize_filename, sanitize_title};
pub use paths::{
    ensure_output_dir, part_path, remove_partial_downloads, Allocation, PathAllocator,
    PART_SUFFIX, SCRATCH_DIR_PREFIX,
};
