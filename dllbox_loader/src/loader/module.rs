// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Materialised PE module
//!
//! A [`LoadedModule`] owns a byte buffer covering the image's full virtual
//! extent, with sections copied in, base relocations applied against the
//! buffer's actual address, and import slots bound to host stubs. After
//! construction the module is immutable; name and ordinal lookups are safe
//! to call from multiple threads concurrently.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::Path;

use crate::loader::file::FileReader;
use crate::loader::pe::{ExportTarget, ImageDescriptor, ImportSelector, RelocationKind};
use crate::{LoaderError, Result};

/// Host-provided mapping from an imported symbol to a callable address
///
/// The loader writes whatever address the resolver returns into the
/// import's address-table slot. Implementations are expected to hand out a
/// harmless fallback stub for symbols they do not recognise.
pub trait StubResolver {
    /// Resolve one imported symbol to a stub address
    fn resolve(&self, dll_name: &str, selector: &ImportSelector) -> usize;
}

/// A PE image materialised into process memory
pub struct LoadedModule {
    image: Box<[u8]>,
    base_vaddr: u32,
    by_name: HashMap<String, usize>,
    by_ordinal: HashMap<u32, usize>,
}

impl LoadedModule {
    /// Load a DLL from disk
    ///
    /// Opens the file, parses it, and materialises the image. The file
    /// handle is held only for the duration of this call.
    pub fn load<P: AsRef<Path>>(path: P, resolver: &dyn StubResolver) -> Result<Self> {
        let mut reader = FileReader::open(path)?;
        let descriptor = ImageDescriptor::parse(&mut reader)?;
        Self::materialize(&mut reader, &descriptor, resolver)
    }

    /// Materialise a parsed image into a fresh buffer
    pub fn materialize(
        reader: &mut FileReader,
        descriptor: &ImageDescriptor,
        resolver: &dyn StubResolver,
    ) -> Result<Self> {
        let base_vaddr = descriptor.min_virtual_addr();
        let extent = descriptor
            .max_virtual_addr()
            .checked_sub(base_vaddr)
            .ok_or_else(|| {
                LoaderError::InvalidImage("section layout wraps virtual space".to_string())
            })? as usize;

        // Phase 1: one zeroed buffer covering the whole virtual extent.
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(extent)
            .map_err(|_| LoaderError::Allocation(extent))?;
        buffer.resize(extent, 0u8);

        // Phase 2: copy each section's file bytes to its virtual offset;
        // the tail up to the virtual size stays zero.
        for section in descriptor.sections() {
            let offset = (section.virtual_address - base_vaddr) as usize;
            let end = offset + section.file_size as usize;
            let slice = buffer.get_mut(offset..end).ok_or_else(|| {
                LoaderError::InvalidImage(format!(
                    "section {} does not fit the image extent",
                    section.name
                ))
            })?;
            reader.seek(SeekFrom::Start(section.file_offset))?;
            reader.read_exact(slice)?;
        }

        let mut image = buffer.into_boxed_slice();

        // Phase 3: patch address-typed words by the load delta. PE32
        // addresses are 32-bit, so the delta wraps at 2^32.
        let delta = (image.as_ptr() as usize as u32).wrapping_sub(base_vaddr);
        #[cfg(debug_assertions)]
        eprintln!(
            "loading image: extent 0x{:X}..0x{:X}, delta 0x{delta:08X}, {} relocations, {} imports",
            base_vaddr,
            descriptor.max_virtual_addr(),
            descriptor.relocations().len(),
            descriptor.imports().len()
        );
        for reloc in descriptor.relocations() {
            let offset = buffer_offset(reloc.virtual_address, base_vaddr, extent)?;
            match reloc.kind {
                RelocationKind::Absolute => {}
                RelocationKind::High => patch16(&mut image, offset, (delta >> 16) as u16)?,
                RelocationKind::Low => patch16(&mut image, offset, (delta & 0xFFFF) as u16)?,
                RelocationKind::HighLow => patch32(&mut image, offset, delta)?,
                RelocationKind::HighAdj | RelocationKind::Unknown(_) => {
                    return Err(LoaderError::UnsupportedRelocation(reloc.kind.code()));
                }
            }
        }

        // Phase 4: write the resolved stub address into each import slot.
        // Slots are 32-bit words in a PE32 image.
        for import in descriptor.imports() {
            let offset = buffer_offset(import.virtual_address, base_vaddr, extent)?;
            let stub = resolver.resolve(&import.dll_name, &import.selector);
            let slot = image.get_mut(offset..offset + 4).ok_or_else(|| {
                LoaderError::InvalidImage(format!(
                    "import slot at VA 0x{:X} does not fit the image extent",
                    import.virtual_address
                ))
            })?;
            slot.copy_from_slice(&(stub as u32).to_le_bytes());
        }

        // Index exports. Every resolved export is reachable by ordinal;
        // named ones additionally by name. Forwarders and records whose
        // address falls outside the buffer stay unreachable.
        let mut by_name = HashMap::new();
        let mut by_ordinal = HashMap::new();
        for export in descriptor.exports() {
            let ExportTarget::Address(va) = export.target else {
                continue;
            };
            let Some(offset) = va.checked_sub(base_vaddr).map(|o| o as usize) else {
                continue;
            };
            if offset >= extent {
                continue;
            }
            if let Some(name) = &export.name {
                by_name.insert(name.clone(), offset);
            }
            by_ordinal.insert(export.ordinal, offset);
        }

        Ok(Self {
            image,
            base_vaddr,
            by_name,
            by_ordinal,
        })
    }

    /// Look up an exported symbol by name
    pub fn proc_by_name(&self, name: &str) -> Option<*const u8> {
        let &offset = self.by_name.get(name)?;
        Some(self.image[offset..].as_ptr())
    }

    /// Look up an exported symbol by ordinal
    pub fn proc_by_ordinal(&self, ordinal: u32) -> Option<*const u8> {
        let &offset = self.by_ordinal.get(&ordinal)?;
        Some(self.image[offset..].as_ptr())
    }

    /// Address of the start of the materialised image
    pub fn base_ptr(&self) -> *const u8 {
        self.image.as_ptr()
    }

    /// Lowest virtual address of the image; buffer offset 0 corresponds to
    /// this address
    pub fn base_vaddr(&self) -> u32 {
        self.base_vaddr
    }

    /// The materialised image bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.image
    }
}

fn buffer_offset(virtual_address: u32, base_vaddr: u32, extent: usize) -> Result<usize> {
    virtual_address
        .checked_sub(base_vaddr)
        .map(|o| o as usize)
        .filter(|&o| o < extent)
        .ok_or_else(|| {
            LoaderError::InvalidImage(format!(
                "VA 0x{virtual_address:X} outside the image extent"
            ))
        })
}

fn patch16(image: &mut [u8], offset: usize, addend: u16) -> Result<()> {
    let bytes = image
        .get_mut(offset..offset + 2)
        .ok_or_else(|| LoaderError::InvalidImage(format!("relocation target at 0x{offset:X}")))?;
    let patched = u16::from_le_bytes([bytes[0], bytes[1]]).wrapping_add(addend);
    bytes.copy_from_slice(&patched.to_le_bytes());
    Ok(())
}

fn patch32(image: &mut [u8], offset: usize, addend: u32) -> Result<()> {
    let bytes = image
        .get_mut(offset..offset + 4)
        .ok_or_else(|| LoaderError::InvalidImage(format!("relocation target at 0x{offset:X}")))?;
    let patched =
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).wrapping_add(addend);
    bytes.copy_from_slice(&patched.to_le_bytes());
    Ok(())
}
