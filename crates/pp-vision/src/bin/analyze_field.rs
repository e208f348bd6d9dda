//! CLI tool to run a saved document crop through the recognizer.
//! Usage: cargo run -p pp-vision --features cli --bin analyze_field -- <data_dir> <document.png> [variant] [output_dir]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use pp_vision::{
    diff, find_first_content, inspect_seal, read_field, changed_region, FieldModel, ReadSettings,
    Registry,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <data_dir> <document.png> [variant] [output_dir]", args[0]);
        std::process::exit(1);
    }

    let data_dir = PathBuf::from(&args[1]);
    let input_path = PathBuf::from(&args[2]);
    let output_dir = PathBuf::from(args.get(4).map(String::as_str).unwrap_or("./debug_output"));
    let _ = std::fs::create_dir_all(&output_dir);

    let registry = Registry::load(&data_dir)?;

    println!("Loading image: {}", input_path.display());
    let document = image::open(&input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?
        .to_rgb8();
    println!("Image size: {}x{}", document.width(), document.height());

    println!("\n=== Identification ===");
    let layout = match args.get(3) {
        Some(variant) => match registry.layout(variant) {
            Some(l) => l,
            None => bail!("unknown document variant {variant:?}"),
        },
        None => match registry.identify(&document) {
            Some(l) => l,
            None => bail!("document matches none of {} layouts", registry.layouts().len()),
        },
    };
    println!("Variant: {}", layout.variant());

    let model = FieldModel::new(layout, document);

    println!("\n=== Fields ===");
    for name in layout.field_names() {
        let rect = layout.field_rect(name)?;
        let crop = match model.crop(name) {
            Ok(c) => c,
            Err(e) => {
                println!("  {name}: {e}");
                continue;
            }
        };
        let background = model.background(name)?;
        let changed = changed_region(&crop, background)?;
        let start = find_first_content(&crop, background)?;
        println!(
            "  {name}: rect=[{}, {}, {}, {}] changed={:?} first_content={}",
            rect.left, rect.top, rect.right, rect.bottom, changed, start
        );

        let _ = crop.save(output_dir.join(format!("{name}.png")));
        let _ = diff(&crop, background)?.save(output_dir.join(format!("{name}_diff.png")));
    }

    println!("\n=== Reads ===");
    let settings = ReadSettings::default();
    for (name, _) in layout.reads() {
        match read_field(&registry, &model, name, settings) {
            Ok(value) => println!("  {name}: {value}"),
            Err(e) => println!("  {name}: ERROR {e}"),
        }
    }

    if let Some(check) = inspect_seal(&registry, &model)? {
        println!("\n=== Seal ===");
        println!("Forged: {}", check.forged);
        println!("Position: {:?}", check.position);
    }

    println!("\nDebug images saved to: {}", output_dir.display());
    Ok(())
}
