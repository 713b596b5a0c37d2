// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! C runtime allocation stubs
//!
//! `malloc` and `free` forward to the host allocator. A mutex-guarded
//! tracker records the layout of every live allocation so that `free` can
//! reconstruct it at deallocation time.

#![allow(unsafe_op_in_unsafe_fn)]

use std::alloc::{Layout, alloc, dealloc};
use std::collections::HashMap;
use std::ptr;
use std::sync::Mutex;

/// Map of pointer address -> allocation layout, protected by a mutex
static ALLOCATIONS: Mutex<Option<HashMap<usize, Layout>>> = Mutex::new(None);

fn track_allocation(ptr: *mut u8, layout: Layout) {
    let mut allocations = ALLOCATIONS.lock().unwrap();
    allocations
        .get_or_insert_with(HashMap::new)
        .insert(ptr as usize, layout);
}

fn remove_allocation(ptr: *mut u8) -> Option<Layout> {
    let mut allocations = ALLOCATIONS.lock().unwrap();
    allocations.as_mut()?.remove(&(ptr as usize))
}

/// Allocate memory (malloc)
///
/// # Safety
/// This function deals with raw memory allocation. The caller must ensure
/// the returned pointer is freed with `msvcrt_free`.
///
/// # Panics
/// Panics if the allocation tracker mutex is poisoned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn msvcrt_malloc(size: usize) -> *mut u8 {
    if size == 0 {
        return ptr::null_mut();
    }

    let Ok(layout) = Layout::from_size_align(size, std::mem::align_of::<usize>()) else {
        return ptr::null_mut();
    };
    // SAFETY: Layout is valid and non-zero-sized
    let ptr = unsafe { alloc(layout) };
    if !ptr.is_null() {
        track_allocation(ptr, layout);
    }
    ptr
}

/// Free memory (free)
///
/// Freeing NULL is a no-op. A pointer that was not handed out by
/// `msvcrt_malloc` (or was already freed) is ignored rather than passed to
/// the allocator with a guessed layout.
///
/// # Safety
/// The pointer must not be used after this call.
///
/// # Panics
/// Panics if the allocation tracker mutex is poisoned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn msvcrt_free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }

    let Some(layout) = remove_allocation(ptr) else {
        return;
    };
    // SAFETY: ptr was allocated by msvcrt_malloc with exactly this layout
    unsafe { dealloc(ptr, layout) };
}
