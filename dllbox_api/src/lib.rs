// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! LoadLibrary-style entry points over the dllbox PE loader
//!
//! Three synchronous operations front the loader: [`load_library`] returns
//! an opaque handle (null on failure), [`get_proc_address`] resolves an
//! exported symbol to its address in the materialised image, and
//! [`free_library`] tears the module down. Failures are reported through a
//! process-wide last-error slot holding Win32-compatible error codes.

use std::ffi::CStr;
use std::panic;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use dllbox_host_stubs::HostStubResolver;
use dllbox_loader::loader::{LoadedModule, StubResolver};

/// No error recorded
pub const ERROR_SUCCESS: u32 = 0;
/// A null or invalid module handle was passed to an entry point
pub const ERROR_INVALID_HANDLE: u32 = 6;
/// Module teardown failed
pub const ERROR_GEN_FAILURE: u32 = 31;
/// The module could not be loaded
pub const ERROR_MOD_NOT_FOUND: u32 = 126;
/// The requested symbol is not exported by the module
pub const ERROR_PROC_NOT_FOUND: u32 = 127;

/// Raw selector values below this limit are ordinals, per the Win32
/// GetProcAddress contract
const ORDINAL_SELECTOR_LIMIT: usize = 0x1000;

static LAST_ERROR: AtomicU32 = AtomicU32::new(ERROR_SUCCESS);

/// Read the process-wide last-error slot
pub fn get_last_error() -> u32 {
    LAST_ERROR.load(Ordering::Relaxed)
}

/// Overwrite the process-wide last-error slot
pub fn set_last_error(code: u32) {
    LAST_ERROR.store(code, Ordering::Relaxed);
}

/// Opaque handle to a loaded module
///
/// A handle is either null (load failed) or points at a live module until
/// [`free_library`] destroys it. Copying the handle does not extend the
/// module's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct ModuleHandle(*mut LoadedModule);

impl ModuleHandle {
    /// The null handle
    pub const fn null() -> Self {
        Self(ptr::null_mut())
    }

    /// Whether this is the null handle
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Selects an exported symbol by name or ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcSelector<'a> {
    /// Look up by exported name
    Name(&'a str),
    /// Look up by ordinal
    Ordinal(u32),
}

/// Load a DLL with the default host stub resolver
///
/// Returns the null handle with the last error set to
/// [`ERROR_MOD_NOT_FOUND`] on any failure.
pub fn load_library<P: AsRef<Path>>(path: P) -> ModuleHandle {
    load_library_with(path, &HostStubResolver::new())
}

/// Load a DLL, binding its imports through the given resolver
///
/// Injecting a different resolver is how a host extends the set of symbols
/// its modules may import.
pub fn load_library_with<P: AsRef<Path>>(path: P, resolver: &dyn StubResolver) -> ModuleHandle {
    match LoadedModule::load(&path, resolver) {
        Ok(module) => ModuleHandle(Box::into_raw(Box::new(module))),
        Err(err) => {
            eprintln!("failed to load {}: {err}", path.as_ref().display());
            set_last_error(ERROR_MOD_NOT_FOUND);
            ModuleHandle::null()
        }
    }
}

/// Resolve an exported symbol to its address inside the loaded image
///
/// Returns a null pointer with the last error set to
/// [`ERROR_INVALID_HANDLE`] for a null handle, or [`ERROR_PROC_NOT_FOUND`]
/// when the module does not export the requested symbol.
///
/// # Safety
/// `handle` must be null or a handle returned by [`load_library`] /
/// [`load_library_with`] that has not been passed to [`free_library`].
pub unsafe fn get_proc_address(handle: ModuleHandle, selector: ProcSelector<'_>) -> *const u8 {
    // SAFETY: caller guarantees the handle is null or live
    let Some(module) = (unsafe { handle.0.as_ref() }) else {
        set_last_error(ERROR_INVALID_HANDLE);
        return ptr::null();
    };

    let found = match selector {
        ProcSelector::Name(name) => module.proc_by_name(name),
        ProcSelector::Ordinal(ordinal) => module.proc_by_ordinal(ordinal),
    };
    match found {
        Some(address) => address,
        None => {
            set_last_error(ERROR_PROC_NOT_FOUND);
            ptr::null()
        }
    }
}

/// Resolve a symbol from a raw selector word, Win32-style
///
/// Values below 0x1000 select by ordinal; anything else is interpreted as
/// a pointer to a NUL-terminated symbol name.
///
/// # Safety
/// `handle` must satisfy the [`get_proc_address`] contract, and a selector
/// value of 0x1000 or above must point to a valid NUL-terminated string.
pub unsafe fn get_proc_address_raw(handle: ModuleHandle, selector: usize) -> *const u8 {
    if selector < ORDINAL_SELECTOR_LIMIT {
        // SAFETY: forwarded handle contract
        unsafe { get_proc_address(handle, ProcSelector::Ordinal(selector as u32)) }
    } else {
        // SAFETY: caller guarantees the selector is a valid C string pointer
        let name = unsafe { CStr::from_ptr(selector as *const core::ffi::c_char) };
        match name.to_str() {
            // SAFETY: forwarded handle contract
            Ok(name) => unsafe { get_proc_address(handle, ProcSelector::Name(name)) },
            Err(_) => {
                set_last_error(ERROR_PROC_NOT_FOUND);
                ptr::null()
            }
        }
    }
}

/// Destroy a loaded module, releasing its image buffer
///
/// Returns false with the last error set to [`ERROR_INVALID_HANDLE`] for a
/// null handle, or [`ERROR_GEN_FAILURE`] if teardown itself fails.
///
/// # Safety
/// `handle` must be null or a handle returned by [`load_library`] /
/// [`load_library_with`] that has not already been freed; every copy of it
/// is dangling after this call.
pub unsafe fn free_library(handle: ModuleHandle) -> bool {
    if handle.0.is_null() {
        set_last_error(ERROR_INVALID_HANDLE);
        return false;
    }

    // A panicking destructor is reported through the error slot instead of
    // unwinding into the caller.
    let result = panic::catch_unwind(|| {
        // SAFETY: caller guarantees the handle is live and not yet freed
        drop(unsafe { Box::from_raw(handle.0) });
    });
    match result {
        Ok(()) => true,
        Err(_) => {
            set_last_error(ERROR_GEN_FAILURE);
            false
        }
    }
}
