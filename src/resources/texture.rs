use anyhow::Context as _;

use crate::data_structures::texture;

fn map_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

/// Layout of a [`crate::data_structures::model::Material`]: five maps
/// (colour, normal, roughness, metalness, ambient occlusion), one sampler and
/// the scalar factors.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            map_entry(0),
            map_entry(1),
            map_entry(2),
            map_entry(3),
            map_entry(4),
            wgpu::BindGroupLayoutEntry {
                binding: 5,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 6,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(asset_root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no window available")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

/// Read an asset relative to `asset_root`: from disk natively, over HTTP on the web.
pub async fn load_binary(asset_root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(asset_root, file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let candidates = asset_candidates(asset_root, file_name);
        let mut found = None;
        for path in &candidates {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                found = Some(path);
                break;
            }
        }
        // Report the first candidate when nothing exists
        let path = found.unwrap_or(&candidates[0]);
        tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

/// Where a native build looks for an asset, in order.
///
/// A relative `asset_root` is tried against the working directory first and
/// then against the crate directory, so `cargo run` finds `assets/` from
/// anywhere inside the checkout.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_candidates(asset_root: &str, file_name: &str) -> Vec<std::path::PathBuf> {
    let relative = std::path::Path::new(asset_root).join(file_name);
    if relative.is_absolute() {
        return vec![relative];
    }
    let in_crate = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(&relative);
    vec![relative, in_crate]
}

pub async fn load_texture(
    asset_root: &str,
    file_name: &str,
    is_linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(asset_root, file_name).await?;
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str());
    texture::Texture::from_bytes(device, queue, &data, file_name, extension, is_linear)
        .with_context(|| format!("could not decode {file_name}"))
}

/// Like [`load_texture`], but a missing or broken file is logged and replaced
/// by a 1x1 texture of `fallback` so the scene still renders.
pub async fn load_texture_or(
    asset_root: &str,
    file_name: &str,
    is_linear: bool,
    fallback: [u8; 4],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> texture::Texture {
    match load_texture(asset_root, file_name, is_linear, device, queue).await {
        Ok(texture) => {
            log::debug!("Loaded texture {file_name}");
            texture
        }
        Err(e) => {
            log::warn!("Using a solid stand-in for texture {file_name}: {e:#}");
            texture::Texture::solid(device, queue, fallback, file_name, is_linear)
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_assets_are_errors() {
        let err = load_binary("assets", "textures/does-not-exist.png")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("does-not-exist.png"));
    }

    #[tokio::test]
    async fn reads_files_relative_to_the_asset_root() {
        let dir = std::env::temp_dir().join("jenga-ngin-load-binary");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("blob.bin"), [1u8, 2, 3]).unwrap();

        let data = load_binary(dir.to_str().unwrap(), "blob.bin").await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[test]
    fn relative_roots_fall_back_to_the_crate_directory() {
        let candidates = asset_candidates("assets", "textures/wood.png");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], std::path::Path::new("assets/textures/wood.png"));
        assert!(candidates[1].is_absolute());
        assert!(candidates[1].ends_with("assets/textures/wood.png"));
        assert!(candidates[1].starts_with(env!("CARGO_MANIFEST_DIR")));
    }

    #[test]
    fn absolute_roots_are_used_as_they_are() {
        let root = std::env::temp_dir();
        let candidates = asset_candidates(root.to_str().unwrap(), "a.png");
        assert_eq!(candidates, vec![root.join("a.png")]);
    }

    #[tokio::test]
    async fn finds_crate_files_from_a_relative_root() {
        let data = load_binary("src", "lib.rs").await.unwrap();
        assert!(String::from_utf8_lossy(&data).contains("pub mod layout;"));
    }
}
