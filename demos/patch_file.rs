//! Replace or add one file inside a ROM2 container.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example patch_file -- game.rom voice/27/bea_03700_.nxa new.nxa patched.rom
//! ```

use std::env;
use std::fs::File;

use rompack::{Archive, ReaderSupplier, Result, Writer};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 5 {
        eprintln!("Usage: {} <archive.rom> <path/in/archive> <payload> <output.rom>", args[0]);
        eprintln!();
        eprintln!("Writes a new container with the given file replaced or added.");
        eprintln!("Missing folders along the path are created.");
        std::process::exit(1);
    }

    let [_, source, inner_path, payload, output] = &args[..] else {
        unreachable!()
    };

    let mut archive = Archive::open(File::open(source)?)?;
    let components: Vec<&str> = inner_path.split('/').collect();
    let token = archive.apply_patch(
        &components,
        Box::new(ReaderSupplier::new(File::open(payload)?)),
    )?;
    println!("patched {token}");

    let summary = Writer::new(archive).write(File::open(source)?, File::create(output)?)?;
    println!(
        "{output}: {} bytes ({} copied, {} replaced, {} added)",
        summary.total_bytes, summary.files_copied, summary.files_replaced, summary.files_added
    );
    Ok(())
}
