use std::fmt;

use indexmap::IndexMap;

use crate::config::model::{
    CategoryDef, CategoryShape, GeneratorDef, LayerRefDef, Pick, total_edition_size,
};
use crate::config::tree::{BranchContext, DefSource, LeafSite, lookup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaPathElem {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaError {
    pub(crate) path: Vec<SchemaPathElem>,
    pub(crate) message: String,
}

impl SchemaError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaErrors {
    pub(crate) errors: Vec<SchemaError>,
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// Validate a generator document and collect every reachable leaf directory.
pub(crate) fn validate_generator(def: &GeneratorDef) -> Result<Vec<LeafSite>, SchemaErrors> {
    let mut v = Validator {
        globals: &def.layers,
        errors: Vec::new(),
        leaves: Vec::new(),
        expanding: Vec::new(),
    };
    let mut path = Vec::new();

    if def.canvas.width == 0 || def.canvas.height == 0 {
        v.error(&[field("canvas")], "canvas width and height must be > 0");
    }

    if def.layer_configurations.is_empty() {
        v.error(
            &[field("layerConfigurations")],
            "at least one edition configuration is required",
        );
    }

    path.push(field("layerConfigurations"));
    for (i, edition) in def.layer_configurations.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        if edition.name_prefix.trim().is_empty() {
            v.error(&with(&path, field("namePrefix")), "namePrefix must be non-empty");
        }
        if let Some(c) = edition.canvas
            && (c.width == 0 || c.height == 0)
        {
            v.error(&with(&path, field("canvas")), "canvas width and height must be > 0");
        }
        if edition.layers_order.is_empty() {
            v.error(
                &with(&path, field("layersOrder")),
                "layersOrder must list at least one category",
            );
        }
        if edition
            .start_number
            .checked_add(edition.grow_edition_size_to)
            .is_none()
        {
            v.error(
                &with(&path, field("growEditionSizeTo")),
                "startNumber + growEditionSizeTo overflows",
            );
        }
        path.push(field("layersOrder"));
        let ctx = BranchContext::root();
        for (j, r) in edition.layers_order.iter().enumerate() {
            path.push(SchemaPathElem::Index(j));
            v.walk_ref(r, &ctx, &mut path);
            path.pop();
        }
        path.pop();
        path.pop();
    }
    if total_edition_size(&def.layer_configurations).is_none() {
        v.error(&path, "total growEditionSizeTo across configurations overflows");
    }
    path.pop();

    path.push(field("triggers"));
    for (i, t) in def.triggers.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        if t.trait_type.is_empty() || t.value.is_empty() {
            v.error(&path, "trigger trait_type and value must be non-empty");
        }
        if t.layers.is_empty() {
            v.error(&with(&path, field("layers")), "trigger must list at least one layer");
        }
        for (j, name) in t.layers.iter().enumerate() {
            let here = with(&with(&path, field("layers")), SchemaPathElem::Index(j));
            match def.layers.get(name).map(|d| d.shape()) {
                None => v.error(&here, format!("unknown category '{name}'")),
                Some(Some(CategoryShape::Leaf(dir))) => v.record_leaf(name, dir),
                Some(_) => v.error(&here, format!("trigger layer '{name}' must be a leaf category")),
            }
        }
        path.pop();
    }
    path.pop();

    if v.errors.is_empty() {
        Ok(v.leaves)
    } else {
        Err(SchemaErrors { errors: v.errors })
    }
}

fn field(name: &str) -> SchemaPathElem {
    SchemaPathElem::Field(name.to_string())
}

fn with(path: &[SchemaPathElem], elem: SchemaPathElem) -> Vec<SchemaPathElem> {
    let mut p = path.to_vec();
    p.push(elem);
    p
}

struct Validator<'t> {
    globals: &'t IndexMap<String, CategoryDef>,
    errors: Vec<SchemaError>,
    leaves: Vec<LeafSite>,
    /// Definitions currently being expanded, compared by identity.
    expanding: Vec<&'t CategoryDef>,
}

impl<'t> Validator<'t> {
    fn error(&mut self, path: &[SchemaPathElem], message: impl Into<String>) {
        self.errors.push(SchemaError::at(path, message));
    }

    fn record_leaf(&mut self, category: &str, dir: &str) {
        if !self.leaves.iter().any(|l| l.dir == dir) {
            self.leaves.push(LeafSite {
                category: category.to_string(),
                dir: dir.to_string(),
            });
        }
    }

    fn walk_ref(
        &mut self,
        r: &'t LayerRefDef,
        ctx: &BranchContext<'t>,
        path: &mut Vec<SchemaPathElem>,
    ) {
        if r.name.trim().is_empty() {
            self.error(path, "layer reference name must be non-empty");
            return;
        }
        if let Some(w) = r.weight
            && (!w.is_finite() || w < 0.0)
        {
            self.error(&with(path, field("weight")), "weight must be finite and >= 0");
        }
        self.check_placement(&r.def, path);

        let Some((def, source)) = lookup(self.globals, &r.name, &r.def, ctx) else {
            self.error(path, format!("unknown category '{}'", r.name));
            return;
        };

        if source != DefSource::Inline && self.expanding.iter().any(|d| std::ptr::eq(*d, def)) {
            self.error(path, format!("cyclic reference to category '{}'", r.name));
            return;
        }
        self.expanding.push(def);
        self.walk_category(&r.name, def, ctx, path);
        self.expanding.pop();
    }

    fn walk_category(
        &mut self,
        name: &'t str,
        def: &'t CategoryDef,
        ctx: &BranchContext<'t>,
        path: &mut Vec<SchemaPathElem>,
    ) {
        self.check_placement(def, path);
        let Some(shape) = def.shape() else {
            self.error(
                path,
                format!(
                    "category '{name}' must set exactly one of 'path', 'subcategories' or 'layers'"
                ),
            );
            return;
        };
        self.check_deferred(name, def, path);

        match shape {
            CategoryShape::Leaf(dir) => {
                if dir.trim().is_empty() {
                    self.error(&with(path, field("path")), "leaf path must be non-empty");
                } else {
                    self.record_leaf(name, dir);
                }
            }
            CategoryShape::Branch(subs) => {
                path.push(field("subcategories"));
                if subs.is_empty() {
                    self.error(path, format!("branch '{name}' has no subcategories"));
                }
                let mut total = 0.0;
                for (sub_name, sub) in subs {
                    path.push(SchemaPathElem::Field(sub_name.clone()));
                    if !sub.probability.is_finite() || sub.probability < 0.0 {
                        self.error(
                            &with(path, field("probability")),
                            "probability must be finite and >= 0",
                        );
                    } else {
                        total += sub.probability;
                    }
                    for (o_name, o_def) in &sub.overrides {
                        if o_def.shape().is_none() {
                            self.error(
                                &with(&with(path, field("overrides")), field(o_name)),
                                format!("override '{o_name}' must set exactly one of 'path', 'subcategories' or 'layers'"),
                            );
                        }
                    }
                    let inner = ctx.enter(sub_name, sub);
                    path.push(field("layers"));
                    for (i, child) in sub.layers.iter().enumerate() {
                        path.push(SchemaPathElem::Index(i));
                        self.walk_ref(child, &inner, path);
                        path.pop();
                    }
                    path.pop();
                    path.pop();
                }
                if !subs.is_empty() && total <= 0.0 {
                    self.error(
                        path,
                        format!("subcategory probabilities of '{name}' must sum to > 0"),
                    );
                }
                path.pop();
            }
            CategoryShape::Group(children, pick) => {
                path.push(field("layers"));
                if children.is_empty() {
                    self.error(path, format!("group '{name}' has no layers"));
                }
                if pick == Pick::One
                    && !children.is_empty()
                    && children.iter().map(|c| c.weight.unwrap_or(1.0)).sum::<f64>() <= 0.0
                {
                    self.error(path, format!("layer weights of group '{name}' must sum to > 0"));
                }
                for (i, child) in children.iter().enumerate() {
                    path.push(SchemaPathElem::Index(i));
                    self.walk_ref(child, ctx, path);
                    path.pop();
                }
                path.pop();
            }
        }
    }

    fn check_deferred(
        &mut self,
        name: &str,
        def: &CategoryDef,
        path: &[SchemaPathElem],
    ) {
        let Some(d) = &def.deferred else {
            return;
        };
        if d.trim().is_empty() {
            self.error(
                &with(path, field("deferred")),
                format!("deferred child name of '{name}' must be non-empty"),
            );
        } else if def.path.is_some() {
            self.error(
                &with(path, field("deferred")),
                format!("leaf '{name}' has no children to defer"),
            );
        }
    }

    fn check_placement(&mut self, def: &CategoryDef, path: &[SchemaPathElem]) {
        if def.width == Some(0) || def.height == Some(0) {
            self.error(path, "layer width and height must be > 0 when set");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/validate.rs"]
mod tests;
