use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

// Wood textures the scene loads at startup, relative to `assets/`.
const TEXTURES: [&str; 5] = [
    "textures/2K-anigre_basecolor.png",
    "textures/2K-anigre_normal.png",
    "textures/2K-anigre_roughness.png",
    "textures/2K-anigre_metallic.png",
    "textures/2K-anigre_ao.png",
];

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!(
            "cargo:warning=no assets/ directory, the tower renders with solid stand-in textures (see assets/README.md)"
        );
        return Ok(());
    }

    for texture in TEXTURES {
        if !assets_src.join(texture).exists() {
            println!(
                "cargo:warning=missing assets/{texture}, a solid stand-in is used (see assets/README.md)"
            );
        }
    }

    // Keep a copy next to the build output for packaging the web build.
    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], out_dir, &copy_options)?;

    Ok(())
}
