// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! User-space loader for PE32 dynamic-link libraries
//!
//! This crate parses a PE/DLL image from disk, materialises it into an
//! in-process byte buffer, applies base relocations against the buffer's
//! actual address, and binds each import to a host-provided stub. Exported
//! symbols are indexed by name and ordinal for later lookup.
//!
//! The loaded image is treated as data only: nothing in this crate executes
//! code from the buffer, changes page protections, or registers the image
//! with an unwinder.

pub mod loader;

use thiserror::Error;

/// Errors that can occur while parsing or materialising a PE image
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid PE image: {0}")]
    InvalidImage(String),

    #[error("Unsupported PE feature: {0}")]
    Unsupported(String),

    #[error("Unsupported base relocation type {0}")]
    UnsupportedRelocation(u8),

    #[error("Failed to allocate {0} bytes for the image buffer")]
    Allocation(usize),
}

pub type Result<T> = core::result::Result<T, LoaderError>;
