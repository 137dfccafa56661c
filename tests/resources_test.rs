use std::io::Cursor;

use approx::assert_relative_eq;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use terrain_walker::{
    data_structures::heightmap::HeightGrid,
    resources::{
        load_clip_gltf, load_config, loadable::Loadable, texture::decode_heightmap,
        texture::load_heightmap,
    },
};

fn encoded_png(width: u32, height: u32, red: impl Fn(u32, u32) -> u8) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([red(x, y), 7, 9, 255]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

#[test]
fn png_red_channel_becomes_heights() {
    let bytes = encoded_png(3, 2, |x, y| if (x, y) == (2, 1) { 255 } else { 0 });
    let grid = decode_heightmap(&bytes).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (2, 3));
    assert_eq!(grid.get(0, 0), Some(-1.0));
    assert_eq!(grid.get(1, 2), Some(1.0));
    assert_eq!(grid.get(2, 0), None);
}

#[test]
fn pixel_values_map_linearly() {
    assert_eq!(HeightGrid::height_from_pixel(0), -1.0);
    assert_eq!(HeightGrid::height_from_pixel(255), 1.0);
    assert_relative_eq!(HeightGrid::height_from_pixel(51), -0.6, epsilon = 1e-6);
}

#[test]
fn garbage_is_not_a_height_texture() {
    assert!(decode_heightmap(b"definitely not an image").is_err());
}

#[test]
fn missing_files_fail_to_load() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let heightmap = runtime.block_on(load_heightmap("does/not/exist.png"));
    assert!(heightmap.is_err());
    let clip = runtime.block_on(load_clip_gltf("does/not/exist.glb"));
    assert!(clip.is_err());
    let config = runtime.block_on(load_config("does/not/exist.toml"));
    assert!(config.is_err());
}

#[test]
fn settings_file_overrides_defaults() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config = runtime.block_on(load_config("settings.toml")).unwrap();
    assert_relative_eq!(config.physics.gravity, -9.81);
    assert_relative_eq!(config.character.run_speed, 12.0);
    // untouched keys keep their defaults
    assert_relative_eq!(config.character.walk_speed, 3.25);
}

#[test]
fn loadable_settles_once() {
    let mut value: Loadable<u32> = Loadable::default();
    assert!(value.is_pending());
    assert!(value.resolve(Ok(3)));
    assert!(!value.resolve(Ok(4)));
    assert_eq!(value.ready(), Some(&3));

    let mut failed: Loadable<u32> = Loadable::Pending;
    assert!(failed.resolve(Err(anyhow::anyhow!("offline"))));
    assert!(!failed.is_ready());
    assert!(!failed.is_pending());
    assert!(!failed.resolve(Ok(1)));
    assert!(matches!(failed, Loadable::Failed(_)));
}
