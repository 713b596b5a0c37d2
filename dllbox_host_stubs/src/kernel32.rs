// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! KERNEL32 stubs for loaded modules
//!
//! Minimal implementations of the Win32 entry points the loader recognises.
//! Allocation entry points forward to the C runtime stubs so every heap
//! block is tracked in one place.

#![allow(unsafe_op_in_unsafe_fn)]

use std::ptr;

use crate::msvcrt::{msvcrt_free, msvcrt_malloc};

/// LocalAlloc - allocate a heap block of `size` bytes
///
/// The flags argument is accepted and ignored; callers get a plain heap
/// allocation either way.
///
/// # Safety
/// The returned pointer must be released with `kernel32_LocalFree`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kernel32_LocalAlloc(_flags: u32, size: usize) -> *mut u8 {
    unsafe { msvcrt_malloc(size) }
}

/// LocalFree - release a heap block and return NULL
///
/// # Safety
/// The pointer must have come from `kernel32_LocalAlloc` (or be NULL) and
/// must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kernel32_LocalFree(mem: *mut u8) -> *mut u8 {
    unsafe { msvcrt_free(mem) };
    ptr::null_mut()
}

/// SetLastError - accepted and discarded
///
/// The host keeps its own last-error channel; code inside a loaded module
/// cannot reach it through this stub.
///
/// # Safety
/// Safe to call; marked unsafe as part of the FFI stub surface.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kernel32_SetLastError(_error_code: u32) {}

/// DisableThreadLibraryCalls - always reports success
///
/// # Safety
/// Safe to call; marked unsafe as part of the FFI stub surface.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kernel32_DisableThreadLibraryCalls(
    _module: *mut core::ffi::c_void,
) -> i32 {
    1
}
