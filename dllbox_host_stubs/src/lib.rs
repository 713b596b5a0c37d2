// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Host stub implementations for imports of loaded PE modules
//!
//! This crate backs the import binding phase of `dllbox_loader`: it
//! implements the small set of symbols the host recognises (`LocalAlloc`,
//! `malloc`, ...) and a [`HostStubResolver`] that maps every import of a
//! loaded module to one of them. Unrecognised names and all imports by
//! ordinal resolve to a harmless no-op stub.

pub mod kernel32;
pub mod msvcrt;
pub mod stub_table;

use dllbox_loader::loader::{ImportSelector, StubResolver};

use crate::stub_table::stub_table;

/// Fallback stub: returns immediately, discarding any arguments
///
/// # Safety
/// Safe to call with any argument list under the platform's default
/// external calling convention.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn noop_stub() {}

/// Stub for symbols the host knows it cannot implement
///
/// Reports the call so a developer can see that the module reached an
/// unresolved import, then returns.
///
/// # Safety
/// Safe to call with any argument list under the platform's default
/// external calling convention.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unresolved_stub() {
    eprintln!("call into an unresolved import stub");
}

/// Default stub resolver over the host stub table
///
/// Matches imports by symbol name against [`stub_table`]. Imports by
/// ordinal carry no name to match, so they resolve to the no-op stub.
#[derive(Debug, Default)]
pub struct HostStubResolver;

impl HostStubResolver {
    /// Create the default resolver
    pub fn new() -> Self {
        Self
    }
}

impl StubResolver for HostStubResolver {
    #[cfg_attr(not(debug_assertions), allow(unused_variables))]
    fn resolve(&self, dll_name: &str, selector: &ImportSelector) -> usize {
        match selector {
            ImportSelector::Name(name) => {
                if let Some(entry) = stub_table().iter().find(|entry| entry.name == name) {
                    entry.address
                } else {
                    #[cfg(debug_assertions)]
                    eprintln!("no host stub for {dll_name}!{name}, binding the no-op stub");
                    noop_stub as *const () as usize
                }
            }
            ImportSelector::Ordinal(_) => noop_stub as *const () as usize,
        }
    }
}
