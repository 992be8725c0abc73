use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::*;
use crate::config::model::GeneratorDef;
use crate::render::compositor::Composite;

#[derive(Default)]
struct MapAssets {
    dirs: HashMap<String, Vec<String>>,
}

impl MapAssets {
    fn with(mut self, dir: &str, files: &[&str]) -> Self {
        self.dirs
            .insert(dir.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }
}

impl AssetSource for MapAssets {
    fn list(&self, dir: &str) -> LayergenResult<Vec<String>> {
        self.dirs
            .get(dir)
            .cloned()
            .ok_or_else(|| LayergenError::config(format!("no dir {dir}")))
    }

    fn locate(&self, dir: &str, file: &str) -> PathBuf {
        Path::new(dir).join(file)
    }

    fn probe(&self, _path: &Path) -> LayergenResult<(u32, u32)> {
        Ok((1, 1))
    }
}

struct BlankCompositor;

impl Compositor for BlankCompositor {
    fn render(&self, _layers: &[LayerRef], canvas: Canvas) -> LayergenResult<Composite> {
        Ok(Composite {
            image: RgbaImage::new(canvas.width, canvas.height),
            skipped: Vec::new(),
        })
    }
}

/// Fails to decode every layer of one category.
struct RejectingCompositor(&'static str);

impl Compositor for RejectingCompositor {
    fn render(&self, layers: &[LayerRef], canvas: Canvas) -> LayergenResult<Composite> {
        Ok(Composite {
            image: RgbaImage::new(canvas.width, canvas.height),
            skipped: layers
                .iter()
                .filter(|l| l.category == self.0)
                .map(|l| SkippedLayer {
                    category: l.category.clone(),
                    path: l.path.clone(),
                    reason: "corrupt pixel data".to_string(),
                })
                .collect(),
        })
    }
}

fn tree() -> CategoryTree {
    let def: GeneratorDef = serde_json::from_value(json!({
        "canvas": { "width": 4, "height": 4 },
        "layers": {
            "background": { "path": "bg" },
            "shape": { "path": "shape" }
        },
        "layerConfigurations": [
            { "layersOrder": ["background", "shape"], "growEditionSizeTo": 2,
              "namePrefix": "first", "description": "one" },
            { "layersOrder": ["shape"], "growEditionSizeTo": 3,
              "namePrefix": "second", "startNumber": 10,
              "canvas": { "width": 2, "height": 2 } }
        ]
    }))
    .unwrap();
    CategoryTree::from_def(def).unwrap()
}

fn assets() -> MapAssets {
    MapAssets::default()
        .with("bg", &["red#80.png", "blue#20.png"])
        .with("shape", &["circle.png"])
}

#[test]
fn tickets_follow_configuration_then_sequence_order() {
    let t = tree();
    let a = assets();
    let driver = EditionDriver::new(&t, &a, &BlankCompositor, 1);
    let tickets = driver.tickets().collect::<Vec<_>>();

    assert_eq!(driver.total(), 5);
    assert_eq!(tickets.len(), 5);
    let ids = tickets
        .iter()
        .map(|t| (t.ordinal, t.config_index, t.number))
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![(0, 0, 0), (1, 0, 1), (2, 1, 10), (3, 1, 11), (4, 1, 12)]
    );
}

#[test]
fn produce_builds_metadata_and_canvas() {
    let t = tree();
    let a = assets();
    let driver = EditionDriver::new(&t, &a, &BlankCompositor, 7);
    let tickets = driver.tickets().collect::<Vec<_>>();

    let (first, img) = driver.produce(tickets[0]).unwrap();
    assert_eq!(first.stem, "first-0");
    assert_eq!(first.metadata.description, "one");
    assert_eq!(img.dimensions(), (4, 4));
    let keys = first.metadata.traits.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(keys, vec!["Background", "Shape"]);
    assert!(["Red", "Blue"].contains(&first.metadata.traits["Background"].as_str()));
    assert_eq!(first.metadata.traits["Shape"], "Circle");
    assert_eq!(first.layers.len(), 2);

    let (later, img) = driver.produce(tickets[4]).unwrap();
    assert_eq!(later.metadata.filename, "second-12.png");
    assert_eq!(later.canvas, Canvas { width: 2, height: 2 });
    assert_eq!(img.dimensions(), (2, 2));
}

#[test]
fn items_are_reproducible_and_independent_of_order() {
    let t = tree();
    let a = assets();
    let driver = EditionDriver::new(&t, &a, &BlankCompositor, 42);
    let tickets = driver.tickets().collect::<Vec<_>>();

    let forward = tickets
        .iter()
        .map(|&tk| driver.resolve(tk).unwrap().metadata)
        .collect::<Vec<_>>();
    let mut backward = tickets
        .iter()
        .rev()
        .map(|&tk| driver.resolve(tk).unwrap().metadata)
        .collect::<Vec<_>>();
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn item_seeds_differ_per_identity() {
    let a = item_seed(1, 0, 0);
    assert_eq!(a, item_seed(1, 0, 0));
    assert_ne!(a, item_seed(1, 0, 1));
    assert_ne!(a, item_seed(1, 1, 0));
    assert_ne!(a, item_seed(2, 0, 0));
}

#[test]
fn preflight_rejects_empty_and_zero_weight_directories() {
    let t = tree();
    let ok = assets();
    EditionDriver::new(&t, &ok, &BlankCompositor, 0)
        .preflight()
        .unwrap();

    let empty = MapAssets::default().with("bg", &["red.png"]).with("shape", &[]);
    let err = EditionDriver::new(&t, &empty, &BlankCompositor, 0)
        .preflight()
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("no candidate assets in 'shape'"));

    let zero = MapAssets::default()
        .with("bg", &["red#0.png", "blue#0.png"])
        .with("shape", &["circle.png"]);
    let err = EditionDriver::new(&t, &zero, &BlankCompositor, 0)
        .preflight()
        .unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("assets of 'background' in 'bg'"));
}

#[test]
fn undecodable_layer_loses_its_trait() {
    let t = tree();
    let a = assets();
    let driver = EditionDriver::new(&t, &a, &RejectingCompositor("background"), 3);
    let ticket = driver.tickets().next().unwrap();

    let resolved = driver.resolve(ticket).unwrap();
    assert!(resolved.metadata.traits.contains_key("Background"));

    let (item, _) = driver.produce(ticket).unwrap();
    let keys = item.metadata.traits.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(keys, vec!["Shape"]);
    assert_eq!(item.layers.len(), 1);
    assert_eq!(item.layers[0].category, "shape");
    assert_eq!(item.skipped.len(), 1);
    assert_eq!(item.skipped[0].reason, "corrupt pixel data");
}
