use std::path::{Path, PathBuf};

use image::Rgba;

use super::*;
use crate::foundation::core::{Anchor, Placement};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "layergen_compositor_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn solid(dir: &Path, name: &str, w: u32, h: u32, px: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(w, h, Rgba(px)).save(&path).unwrap();
    path
}

fn layer(category: &str, path: PathBuf, natural: (u32, u32), placement: Placement) -> LayerRef {
    LayerRef {
        category: category.to_string(),
        file: path.file_name().unwrap().to_string_lossy().into_owned(),
        path,
        natural,
        placement,
    }
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn layers_draw_in_order_with_anchors() {
    let dir = temp_dir("order");
    let red = solid(&dir, "red.png", 2, 2, RED);
    let blue = solid(&dir, "blue.png", 1, 1, BLUE);
    let canvas = Canvas { width: 4, height: 4 };

    let layers = vec![
        layer(
            "background",
            red,
            (2, 2),
            Placement {
                anchor: Anchor::Fill,
                ..Default::default()
            },
        ),
        layer("dot", blue, (1, 1), Placement::default()),
    ];
    let out = ImageCompositor::default().render(&layers, canvas).unwrap();

    assert!(out.skipped.is_empty());
    assert_eq!(out.image.dimensions(), (4, 4));
    assert_eq!(out.image.get_pixel(0, 0).0, RED);
    assert_eq!(out.image.get_pixel(3, 3).0, RED);
    assert_eq!(out.image.get_pixel(1, 1).0, BLUE);
    assert_eq!(out.image.get_pixel(2, 2).0, RED);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn explicit_size_resizes_layer() {
    let dir = temp_dir("resize");
    let blue = solid(&dir, "blue.png", 1, 1, BLUE);
    let canvas = Canvas { width: 4, height: 4 };
    let layers = vec![layer(
        "dot",
        blue,
        (1, 1),
        Placement {
            width: Some(2),
            height: Some(2),
            anchor: Anchor::TopLeft,
        },
    )];

    let out = ImageCompositor::new(FilterType::Nearest)
        .render(&layers, canvas)
        .unwrap();
    assert_eq!(out.image.get_pixel(0, 0).0, BLUE);
    assert_eq!(out.image.get_pixel(1, 1).0, BLUE);
    assert_eq!(out.image.get_pixel(2, 2).0, [0, 0, 0, 0]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn undecodable_layer_is_skipped() {
    let dir = temp_dir("skip");
    let red = solid(&dir, "red.png", 4, 4, RED);
    let broken = dir.join("broken.png");
    std::fs::write(&broken, b"garbage").unwrap();

    let layers = vec![
        layer("background", red, (4, 4), Placement::default()),
        layer("glasses", broken.clone(), (4, 4), Placement::default()),
    ];
    let out = ImageCompositor::default()
        .render(&layers, Canvas { width: 4, height: 4 })
        .unwrap();

    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].category, "glasses");
    assert_eq!(out.skipped[0].path, broken);
    assert_eq!(out.image.get_pixel(2, 2).0, RED);
    let _ = std::fs::remove_dir_all(&dir);
}
