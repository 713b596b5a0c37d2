// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! CLI entry point for inspecting and loading PE32 DLLs.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use dllbox_host_stubs::HostStubResolver;
use dllbox_loader::loader::{FileReader, ImageDescriptor, ImportSelector, LoadedModule};

#[derive(Parser, Debug)]
#[command(name = "dllbox")]
#[command(about = "Load a PE32 DLL into a user-space buffer and inspect it", long_about = None)]
struct Args {
    /// Path to the DLL to load
    #[arg(value_name = "DLL")]
    dll: PathBuf,

    /// Symbols to resolve after loading; numeric values below 0x1000 are
    /// treated as ordinals
    #[arg(short = 'r', long = "resolve", value_name = "SYMBOL")]
    resolve: Vec<String>,

    /// Print the full export, import and relocation tables
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut reader = FileReader::open(&args.dll)
        .with_context(|| format!("opening {}", args.dll.display()))?;
    let image = ImageDescriptor::parse(&mut reader)
        .with_context(|| format!("parsing {}", args.dll.display()))?;

    println!("Parsed PE image: {}", args.dll.display());
    println!("  Preferred base: 0x{:08X}", image.preferred_base());
    println!(
        "  Virtual extent: 0x{:08X} - 0x{:08X}",
        image.min_virtual_addr(),
        image.max_virtual_addr()
    );

    println!("\nSections:");
    for section in image.sections() {
        println!(
            "  {:<8} VA 0x{:08X}, vsize 0x{:X}, fsize 0x{:X}, flags 0x{:08X}",
            section.name,
            section.virtual_address,
            section.virtual_size,
            section.file_size,
            section.characteristics
        );
    }

    if args.verbose {
        println!("\nExports ({}):", image.exports().len());
        for export in image.exports() {
            println!(
                "  ord {:4} {:<32} {:?}",
                export.ordinal,
                export.name.as_deref().unwrap_or("-"),
                export.target
            );
        }

        println!("\nImports ({}):", image.imports().len());
        for import in image.imports() {
            match &import.selector {
                ImportSelector::Name(name) => {
                    println!("  slot 0x{:08X} {} !{name}", import.virtual_address, import.dll_name);
                }
                ImportSelector::Ordinal(ordinal) => {
                    println!(
                        "  slot 0x{:08X} {} #ord {ordinal}",
                        import.virtual_address, import.dll_name
                    );
                }
            }
        }

        println!("\nRelocations: {}", image.relocations().len());
    }

    let resolver = HostStubResolver::new();
    let module = LoadedModule::materialize(&mut reader, &image, &resolver)
        .with_context(|| format!("materialising {}", args.dll.display()))?;

    println!(
        "\nMaterialised {} bytes at {:p}",
        module.as_bytes().len(),
        module.base_ptr()
    );

    for symbol in &args.resolve {
        let address = match symbol.parse::<u32>() {
            Ok(ordinal) if (ordinal as usize) < 0x1000 => module.proc_by_ordinal(ordinal),
            _ => module.proc_by_name(symbol),
        };
        match address {
            Some(address) => println!("  {symbol} -> {address:p}"),
            None => println!("  {symbol} -> not found"),
        }
    }

    Ok(())
}
