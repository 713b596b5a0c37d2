// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! PE (Portable Executable) DLL loader
//!
//! Data flows strictly forward: a [`file::FileReader`] feeds the
//! [`pe::ImageDescriptor`] parser, whose output is consumed by
//! [`module::LoadedModule`]. The descriptor is immutable once built.

pub mod file;
pub mod module;
pub mod pe;

pub use file::FileReader;
pub use module::{LoadedModule, StubResolver};
pub use pe::{
    ExportRecord, ExportTarget, ImageDescriptor, ImportRecord, ImportSelector, Relocation,
    RelocationKind, Section,
};
