// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Positioned byte reader over an on-disk PE file
//!
//! The reader owns the file handle for the duration of image construction
//! and releases it on drop, on every exit path.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use zerocopy::FromBytes;

use crate::{LoaderError, Result};

/// Random-access reader over a PE file
#[derive(Debug)]
pub struct FileReader {
    file: File,
}

impl FileReader {
    /// Open a file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    /// Position the cursor relative to the start, current position, or end
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file.seek(pos)?)
    }

    /// Read exactly `buf.len()` bytes; a short read is an error
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Read up to `buf.len()` bytes, returning the count actually read
    ///
    /// Fewer bytes than requested only means the file ended; hard I/O
    /// errors are still reported.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(LoaderError::Io(e)),
            }
        }
        Ok(filled)
    }

    /// Read one fixed-layout header struct at the current position
    pub fn read_pod<T: FromBytes>(&mut self) -> Result<T> {
        let mut buf = vec![0u8; core::mem::size_of::<T>()];
        self.read_exact(&mut buf)?;
        T::read_from_bytes(&buf)
            .map_err(|_| LoaderError::InvalidImage("header read size mismatch".to_string()))
    }
}
