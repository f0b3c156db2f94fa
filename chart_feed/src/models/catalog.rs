//! Symbol → bar-size catalog: normalization of the `/metadata` payload.
//!
//! The metadata endpoint is an untrusted contract and arrives in one of two
//! shapes:
//! - an object mapping symbol → `{ "bar_sizes": [..] }` (or directly an array)
//! - an array of records, each mapping symbol → array or `{ "bar_sizes": [..] }`
//!   (what a records-oriented dump of the same object produces)
//!
//! Key behaviors:
//! - Both shapes with the same content normalize to the same [`Catalog`].
//! - Symbols and labels are trimmed; empty ones are dropped.
//! - Labels are de-duplicated per symbol, preserving the first occurrence.
//! - A symbol seen twice keeps its first entry.
//! - A symbol whose label list ends up empty is left out entirely.
//!
//! Normalization never fails. Everything it had to drop is counted in the
//! returned [`NormalizationReport`].

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Normalized symbol → ordered bar-size labels.
///
/// Every label list is non-empty and every symbol is unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    symbols: IndexMap<String, Vec<String>>,
}

impl Catalog {
    /// Bar sizes offered for `symbol`, empty when the symbol is unknown.
    pub fn bar_sizes(&self, symbol: &str) -> &[String] {
        self.symbols.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Symbols in catalog order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.symbols
            .iter()
            .map(|(symbol, sizes)| (symbol.as_str(), sizes.as_slice()))
    }
}

/// Summary of what normalization dropped or merged.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Top-level value was neither an object nor an array.
    pub unrecognized_shape: bool,
    /// Array items that were not objects.
    pub records_dropped: usize,
    /// Symbol entries dropped (blank symbol, no usable labels, wrong value type).
    pub entries_dropped: usize,
    /// Later entries for a symbol already in the catalog.
    pub duplicate_symbols: usize,
    /// Labels removed as duplicates within one symbol.
    pub labels_deduped: usize,
    /// Labels that were not strings or were blank.
    pub labels_dropped: usize,
}

impl NormalizationReport {
    /// `true` when the payload normalized without dropping anything.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Normalizes a raw `/metadata` payload into a [`Catalog`].
pub fn normalize_metadata(raw: &Value) -> (Catalog, NormalizationReport) {
    let mut catalog = Catalog::default();
    let mut report = NormalizationReport::default();

    match raw {
        Value::Object(entries) => push_entries(&mut catalog, &mut report, entries),
        Value::Array(records) => {
            for record in records {
                match record {
                    Value::Object(entries) => push_entries(&mut catalog, &mut report, entries),
                    _ => report.records_dropped += 1,
                }
            }
        }
        // An absent catalog is served as `{}` or `null`; both mean "no symbols".
        Value::Null => {}
        _ => report.unrecognized_shape = true,
    }

    (catalog, report)
}

fn push_entries(catalog: &mut Catalog, report: &mut NormalizationReport, entries: &Map<String, Value>) {
    for (raw_symbol, value) in entries {
        let symbol = raw_symbol.trim();
        if symbol.is_empty() {
            report.entries_dropped += 1;
            continue;
        }

        let Some(raw_labels) = bar_size_values(value) else {
            report.entries_dropped += 1;
            continue;
        };

        let labels = normalize_labels(raw_labels, report);
        if labels.is_empty() {
            report.entries_dropped += 1;
            continue;
        }

        if catalog.symbols.contains_key(symbol) {
            report.duplicate_symbols += 1;
            continue;
        }
        catalog.symbols.insert(symbol.to_string(), labels);
    }
}

/// The label list of one entry: the value itself, or its `bar_sizes` field.
fn bar_size_values(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(fields) => fields.get("bar_sizes").and_then(Value::as_array),
        _ => None,
    }
}

fn normalize_labels(raw: &[Value], report: &mut NormalizationReport) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(raw.len());

    for item in raw {
        let Some(label) = item.as_str().map(str::trim).filter(|l| !l.is_empty()) else {
            report.labels_dropped += 1;
            continue;
        };
        if seen.insert(label) {
            labels.push(label.to_string());
        } else {
            report.labels_deduped += 1;
        }
    }
    labels
}
