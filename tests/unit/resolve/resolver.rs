use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use super::*;
use crate::config::model::GeneratorDef;

#[derive(Default)]
struct MapAssets {
    dirs: HashMap<String, Vec<String>>,
    missing: HashSet<PathBuf>,
}

impl MapAssets {
    fn with(mut self, dir: &str, files: &[&str]) -> Self {
        self.dirs
            .insert(dir.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    fn missing(mut self, dir: &str, file: &str) -> Self {
        self.missing.insert(Path::new(dir).join(file));
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

    fn probe(&self, path: &Path) -> LayergenResult<(u32, u32)> {
        if self.missing.contains(path) {
            return Err(LayergenError::asset(format!(
                "path not found: '{}'",
                path.display()
            )));
        }
        Ok((10, 10))
    }
}

fn tree(doc: serde_json::Value) -> CategoryTree {
    let def: GeneratorDef = serde_json::from_value(doc).unwrap();
    CategoryTree::from_def(def).unwrap()
}

fn resolve_first(tree: &CategoryTree, assets: &MapAssets, seed: u64) -> LayergenResult<Resolution> {
    let resolver = Resolver::new(tree, assets);
    let mut rng = StdRng::seed_from_u64(seed);
    resolver.resolve_item(&tree.editions()[0].layers_order, &mut rng)
}

fn categories(res: &Resolution) -> Vec<&str> {
    res.layers.iter().map(|l| l.category.as_str()).collect()
}

fn edition(order: serde_json::Value) -> serde_json::Value {
    json!([{ "layersOrder": order, "growEditionSizeTo": 1, "namePrefix": "t" }])
}

#[test]
fn duplicate_traits_collapse_to_first_occurrence() {
    let t = tree(json!({
        "layers": {
            "background": { "path": "bg" },
            "shape": { "path": "shape" },
            "backdrop": { "layers": ["background"] }
        },
        "layerConfigurations": edition(json!(["background", "shape", "backdrop"]))
    }));
    let assets = MapAssets::default()
        .with("bg", &["red.png"])
        .with("shape", &["circle.png"]);

    let res = resolve_first(&t, &assets, 1).unwrap();
    assert_eq!(res.layers.len(), 3, "render layers are never deduplicated");
    assert_eq!(
        res.unique_traits(),
        vec![
            TraitRecord::new("Background", "Red"),
            TraitRecord::new("Shape", "Circle"),
        ]
    );
}

#[test]
fn deferred_child_renders_after_its_siblings() {
    let t = tree(json!({
        "layers": {
            "body": {
                "deferred": "eyes",
                "subcategories": {
                    "only": {
                        "probability": 1.0,
                        "layers": [
                            { "name": "skin", "path": "skin" },
                            { "name": "eyes", "path": "eyes" },
                            { "name": "hat", "path": "hat" }
                        ]
                    }
                }
            }
        },
        "layerConfigurations": edition(json!(["body"]))
    }));
    let assets = MapAssets::default()
        .with("skin", &["pale.png"])
        .with("eyes", &["blue.png"])
        .with("hat", &["cap.png"]);

    for seed in 0..20 {
        let res = resolve_first(&t, &assets, seed).unwrap();
        assert_eq!(categories(&res), vec!["skin", "hat", "eyes"]);
    }
}

#[test]
fn branch_variant_shadows_global_definition() {
    let t = tree(json!({
        "layers": {
            "eyes": { "path": "eyes/global" },
            "body": {
                "subcategories": {
                    "robot": {
                        "probability": 1.0,
                        "layers": ["eyes"],
                        "overrides": {
                            "eyes": {
                                "subcategories": {
                                    "visor": {
                                        "probability": 1.0,
                                        "layers": [{ "name": "visor", "path": "eyes/robot" }]
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
        "layerConfigurations": edition(json!(["body", "eyes"]))
    }));
    let assets = MapAssets::default()
        .with("eyes/global", &["brown.png"])
        .with("eyes/robot", &["red-led.png"]);

    let res = resolve_first(&t, &assets, 3).unwrap();
    let paths = res
        .layers
        .iter()
        .map(|l| l.path.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            Path::new("eyes/robot").join("red-led.png"),
            Path::new("eyes/global").join("brown.png"),
        ]
    );
    assert_eq!(
        res.unique_traits(),
        vec![
            TraitRecord::new("Body", "Robot"),
            TraitRecord::new("Eyes", "Visor"),
            TraitRecord::new("Visor", "Red Led"),
            TraitRecord::new("Eyes", "Brown"),
        ]
    );
}

#[test]
fn inline_sibling_definition_acts_as_variant() {
    let t = tree(json!({
        "layers": {
            "mouth": { "path": "mouth/global" },
            "gender": {
                "humanize": false,
                "subcategories": {
                    "female": {
                        "probability": 1.0,
                        "layers": [
                            { "name": "mouth", "path": "mouth/female" },
                            { "name": "face", "layers": ["mouth"] }
                        ]
                    }
                }
            }
        },
        "layerConfigurations": edition(json!(["gender"]))
    }));
    let assets = MapAssets::default()
        .with("mouth/global", &["grin.png"])
        .with("mouth/female", &["smile.png"]);

    let res = resolve_first(&t, &assets, 9).unwrap();
    assert_eq!(res.traits[0].record, TraitRecord::new("Gender", "female"));
    assert!(res.layers.iter().all(|l| l.path.starts_with("mouth/female")));
}

#[test]
fn missing_asset_drops_layer_and_trait_only() {
    let t = tree(json!({
        "layers": {
            "background": { "path": "bg" },
            "shape": { "path": "shape" }
        },
        "layerConfigurations": edition(json!(["background", "shape"]))
    }));
    let assets = MapAssets::default()
        .with("bg", &["ghost.png"])
        .with("shape", &["circle.png"])
        .missing("bg", "ghost.png");

    let res = resolve_first(&t, &assets, 5).unwrap();
    assert_eq!(categories(&res), vec!["shape"]);
    assert_eq!(res.unique_traits(), vec![TraitRecord::new("Shape", "Circle")]);
    assert_eq!(res.skipped.len(), 1);
    assert_eq!(res.skipped[0].category, "background");
}

#[test]
fn empty_directory_is_fatal() {
    let t = tree(json!({
        "layers": { "background": { "path": "bg" } },
        "layerConfigurations": edition(json!(["background"]))
    }));
    let assets = MapAssets::default().with("bg", &[]);
    let err = resolve_first(&t, &assets, 0).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("no candidate assets"));
}

#[test]
fn trigger_appends_bonus_layers_once() {
    let t = tree(json!({
        "layers": {
            "eyes": { "path": "eyes" },
            "glow": { "path": "glow", "anchor": "fill" }
        },
        "triggers": [
            { "trait_type": "eyes", "value": "laser", "layers": ["glow"] }
        ],
        "layerConfigurations": edition(json!(["eyes", "eyes"]))
    }));
    let assets = MapAssets::default()
        .with("eyes", &["laser#100.png"])
        .with("glow", &["red-haze.png"]);

    let res = resolve_first(&t, &assets, 11).unwrap();
    assert_eq!(categories(&res), vec!["eyes", "eyes", "glow"]);
    assert_eq!(
        res.layers[2].placement.anchor,
        crate::foundation::core::Anchor::Fill
    );
    assert_eq!(
        res.unique_traits(),
        vec![
            TraitRecord::new("Eyes", "Laser"),
            TraitRecord::new("Glow", "Red Haze"),
        ]
    );
}

#[test]
fn single_pick_group_records_choice() {
    let t = tree(json!({
        "layers": {
            "hatOrHair": {
                "pick": "one",
                "layers": [
                    { "name": "hat", "path": "hat", "weight": 0.0 },
                    { "name": "hair", "path": "hair" }
                ]
            }
        },
        "layerConfigurations": edition(json!(["hatOrHair"]))
    }));
    let assets = MapAssets::default()
        .with("hat", &["cap.png"])
        .with("hair", &["mohawk.png"]);

    for seed in 0..10 {
        let res = resolve_first(&t, &assets, seed).unwrap();
        assert_eq!(
            res.unique_traits(),
            vec![
                TraitRecord::new("HatOrHair", "Hair"),
                TraitRecord::new("Hair", "Mohawk"),
            ]
        );
    }
}

#[test]
fn reference_placement_overrides_definition() {
    let t = tree(json!({
        "layers": { "logo": { "path": "logo", "width": 50 } },
        "layerConfigurations": edition(json!([{ "name": "logo", "height": 20 }]))
    }));
    let assets = MapAssets::default().with("logo", &["mark.png"]);
    let res = resolve_first(&t, &assets, 0).unwrap();
    assert_eq!(res.layers[0].placement.width, Some(50));
    assert_eq!(res.layers[0].placement.height, Some(20));
    assert_eq!(res.layers[0].natural, (10, 10));
}

#[test]
fn same_seed_same_resolution() {
    let t = tree(json!({
        "layers": {
            "background": { "path": "bg" },
            "kind": {
                "subcategories": {
                    "a": { "probability": 0.3, "layers": [{ "name": "x", "path": "x" }] },
                    "b": { "probability": 0.7, "layers": [{ "name": "y", "path": "y" }] }
                }
            }
        },
        "layerConfigurations": edition(json!(["background", "kind"]))
    }));
    let assets = MapAssets::default()
        .with("bg", &["red#80.png", "blue#20.png"])
        .with("x", &["one.png", "two.png"])
        .with("y", &["three.png", "four.png"]);

    for seed in 0..16 {
        let a = resolve_first(&t, &assets, seed).unwrap();
        let b = resolve_first(&t, &assets, seed).unwrap();
        assert_eq!(a, b);
    }
}
