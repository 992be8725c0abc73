use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value;

use crate::edition::metadata::IDENTITY_FIELDS;
use crate::foundation::error::{LayergenError, LayergenResult};

/// One metadata document, keys in file order.
pub type MetadataRecord = IndexMap<String, Value>;

static ITEM_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)\.png").expect("item number pattern is valid"));

/// Sequence number embedded in a `<prefix>-<n>.png` file name, or 0.
pub fn number_from_filename(filename: &str) -> u64 {
    ITEM_NUMBER
        .captures(filename)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Read every `*.json` metadata file in `dir`, in file-name order.
pub fn load_metadata_dir(dir: &Path) -> LayergenResult<Vec<MetadataRecord>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read metadata dir '{}'", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list metadata dir '{}'", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read metadata '{}'", path.display()))?;
        let record: MetadataRecord = serde_json::from_str(&text).map_err(|e| {
            LayergenError::serde(format!("parse metadata '{}': {e}", path.display()))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write `records` as one CSV table.
///
/// Rows are sorted by the number in each record's `filename`. Columns are the identity fields
/// followed by every other key in first-seen order. Values are quoted; missing cells stay empty.
pub fn export_csv<W: Write>(records: &[MetadataRecord], mut out: W) -> LayergenResult<()> {
    let mut rows = records.iter().collect::<Vec<_>>();
    rows.sort_by_key(|r| {
        r.get("filename")
            .and_then(Value::as_str)
            .map(number_from_filename)
            .unwrap_or(0)
    });

    let mut columns = IDENTITY_FIELDS
        .iter()
        .map(|f| f.to_string())
        .collect::<IndexSet<_>>();
    for r in &rows {
        for key in r.keys() {
            if !columns.contains(key) {
                columns.insert(key.clone());
            }
        }
    }

    let header = columns.iter().map(|c| quote(c)).collect::<Vec<_>>();
    writeln!(out, "{}", header.join(",")).context("write csv header")?;
    for r in rows {
        let cells = columns
            .iter()
            .map(|c| r.get(c).map(cell).unwrap_or_default())
            .collect::<Vec<_>>();
        writeln!(out, "{}", cells.join(",")).context("write csv row")?;
    }
    out.flush().context("flush csv")?;
    Ok(())
}

/// Export every metadata file of `dir` into the CSV file `out_path`.
pub fn write_csv_file(dir: &Path, out_path: &Path) -> LayergenResult<usize> {
    let records = load_metadata_dir(dir)?;
    let file = std::fs::File::create(out_path)
        .map_err(|e| LayergenError::output(format!("create csv '{}': {e}", out_path.display())))?;
    export_csv(&records, std::io::BufWriter::new(file))?;
    tracing::info!(rows = records.len(), out = %out_path.display(), "wrote csv");
    Ok(records.len())
}

fn cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => quote(s),
        Value::Bool(_) | Value::Number(_) => v.to_string(),
        other => quote(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
#[path = "../../tests/unit/export/csv.rs"]
mod tests;
