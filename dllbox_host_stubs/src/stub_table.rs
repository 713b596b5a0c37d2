// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Table of host stub implementations
//!
//! Maps the import names the loader recognises to the addresses of their
//! host implementations. Symbols absent from this table resolve to the
//! no-op stub.

use crate::{kernel32, msvcrt, unresolved_stub};

/// One host stub implementation entry
pub struct StubEntry {
    /// Imported symbol name (e.g., "LocalAlloc")
    pub name: &'static str,
    /// DLL the symbol conventionally lives in (diagnostics only; matching
    /// is by symbol name)
    pub dll_name: &'static str,
    /// Implementation function address
    pub address: usize,
}

/// The table of all host stub implementations
pub fn stub_table() -> Vec<StubEntry> {
    vec![
        StubEntry {
            name: "LocalAlloc",
            dll_name: "KERNEL32.dll",
            address: kernel32::kernel32_LocalAlloc as *const () as usize,
        },
        StubEntry {
            name: "LocalFree",
            dll_name: "KERNEL32.dll",
            address: kernel32::kernel32_LocalFree as *const () as usize,
        },
        StubEntry {
            name: "SetLastError",
            dll_name: "KERNEL32.dll",
            address: kernel32::kernel32_SetLastError as *const () as usize,
        },
        StubEntry {
            name: "DisableThreadLibraryCalls",
            dll_name: "KERNEL32.dll",
            address: kernel32::kernel32_DisableThreadLibraryCalls as *const () as usize,
        },
        StubEntry {
            name: "malloc",
            dll_name: "MSVCRT.dll",
            address: msvcrt::msvcrt_malloc as *const () as usize,
        },
        StubEntry {
            name: "free",
            dll_name: "MSVCRT.dll",
            address: msvcrt::msvcrt_free as *const () as usize,
        },
        StubEntry {
            name: "_adjust_fdiv",
            dll_name: "MSVCRT.dll",
            address: unresolved_stub as *const () as usize,
        },
    ]
}
