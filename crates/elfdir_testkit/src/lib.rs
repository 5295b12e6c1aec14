//! # elfdir testkit
//!
//! Test utilities for elfdir.
//!
//! This crate provides:
//! - [`ElfImage`], a builder for small ELF files with chosen sections at
//!   chosen offsets, so tests do not depend on a system `objcopy`
//! - Temporary binary fixtures and directory helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use elfdir_testkit::prelude::*;
//! use elfdir_storage::{Directory, ItemKind};
//!
//! let image = ElfImage::new().item("idx1", ItemKind::Segment, 10, b"ten");
//! with_elf_directory(&image, "idx1", |dir| {
//!     assert_eq!(dir.list(ItemKind::Segment).unwrap(), vec![10]);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod image;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::image::*;
}

pub use fixtures::*;
pub use generators::*;
pub use image::*;
