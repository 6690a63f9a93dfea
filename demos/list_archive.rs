//! List the folder tree of a ROM2 container.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example list_archive -- game.rom
//! ```

use std::env;
use std::fs::File;

use rompack::{Archive, Folder, Node, Result};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <archive.rom>", args[0]);
        eprintln!();
        eprintln!("Prints the folder tree and file sizes of a ROM2 container.");
        std::process::exit(1);
    }

    let archive = Archive::open(File::open(&args[1])?)?;
    println!(
        "{}: {} folders, data region at {:#x}",
        args[1],
        archive.folder_count(),
        archive.data_offset()
    );

    print_folder(&archive, archive.root()?, 0);
    Ok(())
}

fn print_folder(archive: &Archive, folder: &Folder, depth: usize) {
    for node in folder.tail() {
        let indent = "  ".repeat(depth + 1);
        match node {
            Node::Folder(d) => {
                println!("{indent}{}/", d.name);
                if let Some(child) = archive.folder(d.key) {
                    print_folder(archive, child, depth + 1);
                }
            }
            Node::File(f) => {
                println!("{indent}{} ({} bytes)", f.name, f.length.unwrap_or(0));
            }
        }
    }
}
