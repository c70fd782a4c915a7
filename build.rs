//! Stages `assets/` (models, textures) in `OUT_DIR` for bundling the web build.
//! Native builds read them straight from `./assets`.

use std::{env, path::PathBuf};

use anyhow::Context;
use fs_extra::dir::{CopyOptions, copy};

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.is_dir() {
        // every prop has a procedural fallback
        println!("cargo:warning=no assets/ directory, the scene will use fallback props");
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = CopyOptions::new().overwrite(true);
    copy(&assets, &out_dir, &options)
        .with_context(|| format!("copying {} to {}", assets.display(), out_dir.display()))?;
    Ok(())
}
