/// Round-trip diagnostic: load a DXF file, report what was found, save it
/// and load the result again.
///
/// Usage: diag_roundtrip <file.dxf> [--strict] [--binary] [--out <path>]
///
/// Set RUST_LOG=dxfcore=debug to trace the load stages.

use anyhow::{bail, Context};
use dxfcore::io::dxf::DxfReaderConfiguration;
use dxfcore::tables::{LayerFlags, TableEntryFlags};
use dxfcore::{CadDocument, DxfReader, DxfWriter, TableKind};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    input: PathBuf,
    output: Option<PathBuf>,
    strict: bool,
    binary: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut input = None;
    let mut output = None;
    let mut strict = false;
    let mut binary = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--strict" => strict = true,
            "--binary" => binary = true,
            "--out" => output = Some(PathBuf::from(args.next().context("--out needs a path")?)),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument '{}'", arg),
        }
    }
    let Some(input) = input else {
        bail!("usage: diag_roundtrip <file.dxf> [--strict] [--binary] [--out <path>]");
    };
    Ok(Args {
        input,
        output,
        strict,
        binary,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = parse_args()?;

    let config = DxfReaderConfiguration {
        failsafe: !args.strict,
        ..Default::default()
    };
    let doc = DxfReader::from_file(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?
        .with_configuration(config.clone())
        .read()
        .with_context(|| format!("cannot load {}", args.input.display()))?;

    println!("═══════════════════ {} ═══════════════════", args.input.display());
    report(&doc)?;

    let bytes = if args.binary {
        DxfWriter::new_binary(&doc).write_to_vec()?
    } else {
        DxfWriter::new(&doc).write_to_vec()?
    };
    println!("\nSaved: {} bytes", bytes.len());
    if let Some(path) = &args.output {
        std::fs::write(path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
        println!("   Written to {}", path.display());
    }

    let readback = DxfReader::from_bytes(bytes)
        .with_configuration(config)
        .read()
        .context("cannot reload the saved document")?;
    println!("\nReloaded:");
    let before = entity_counts(&doc)?;
    let after = entity_counts(&readback)?;
    let mut mismatches = 0;
    for dxftype in before.keys().chain(after.keys().filter(|k| !before.contains_key(*k))) {
        let (a, b) = (
            before.get(dxftype).copied().unwrap_or(0),
            after.get(dxftype).copied().unwrap_or(0),
        );
        if a != b {
            mismatches += 1;
            println!("   {:<16} {} -> {}", dxftype, a, b);
        }
    }
    if mismatches == 0 {
        println!("   all entity counts match");
    }
    if readback.notifications.len() > doc.notifications.len() {
        println!(
            "   reload added {} findings",
            readback.notifications.len() - doc.notifications.len()
        );
    }
    Ok(())
}

fn report(doc: &CadDocument) -> anyhow::Result<()> {
    println!("Version: {} ({})", doc.version, doc.encoding.name());
    println!("Handles: {} registered, seed {}", doc.db().handle_count(), doc.db().seed());

    println!("Tables:");
    for kind in TableKind::ALL {
        let table = doc.tables.get(kind);
        let xref = table
            .names()
            .filter(|n| table.flags(doc.db(), n).contains(TableEntryFlags::XREF_DEPENDENT))
            .count();
        if xref > 0 {
            println!("   {:<12} {} ({} xref dependent)", kind.dxf_name(), table.len(), xref);
        } else {
            println!("   {:<12} {}", kind.dxf_name(), table.len());
        }
    }
    let layers = doc.tables.get(TableKind::Layer);
    let frozen: Vec<&str> = layers
        .names()
        .filter(|n| layers.layer_flags(doc.db(), n).contains(LayerFlags::FROZEN))
        .collect();
    if !frozen.is_empty() {
        println!("Frozen layers: {}", frozen.join(", "));
    }
    println!("Blocks: {}", doc.blocks.len());
    println!("Layouts: {}", doc.layout_names().join(", "));
    for (dxftype, count) in entity_counts(doc)? {
        println!("   {:<16} {}", dxftype, count);
    }
    for section in &doc.unknown_sections {
        println!("Kept section {} ({} tags)", section.name, section.tags.len());
    }

    let unreferenced = doc.find_unreferenced_blocks();
    if !unreferenced.is_empty() {
        println!("Unreferenced blocks:");
        for name in unreferenced {
            println!("   {}", name);
        }
    }
    for dangling in doc.dangling_block_references() {
        println!("Dangling block reference: {:?}", dangling);
    }

    if doc.notifications.is_empty() {
        println!("No findings");
    } else {
        println!("Findings: {}", doc.notifications.len());
        for notification in doc.notifications.iter() {
            println!("   {}", notification);
        }
    }
    Ok(())
}

/// Live entities of ENTITIES and BLOCKS by type
fn entity_counts(doc: &CadDocument) -> anyhow::Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for section in ["ENTITIES", "BLOCKS"] {
        for entity in doc.iterate_section(section)? {
            *counts.entry(entity.dxftype().to_string()).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
