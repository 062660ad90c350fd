//! Feature table — one row of named features plus a forward-looking target per bar.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of diagnostic log-return columns kept out of the model feature set.
const LOG_RETURN_PREFIX: &str = "logret_";

/// Named feature values for a single bar. `None` marks an undefined feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    values: BTreeMap<String, Option<f64>>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.insert(name.into(), value);
    }

    /// Defined value of `name`. Missing and undefined features both read as `None`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True when every feature in `names` is present and defined.
    pub fn is_complete(&self, names: &[String]) -> bool {
        names.iter().all(|n| self.get(n).is_some())
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (S, Option<f64>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Column-oriented feature matrix aligned with the input bar series.
///
/// Columns keep insertion order. Targets and forward returns are `None` for
/// the final `horizon` rows, where the future bar does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Vec<Option<f64>>>,
    timestamps: Vec<DateTime<Utc>>,
    closes: Vec<f64>,
    forward_returns: Vec<Option<f64>>,
    targets: Vec<Option<u8>>,
}

impl FeatureTable {
    pub(crate) fn new(timestamps: Vec<DateTime<Utc>>, closes: Vec<f64>) -> Self {
        let n = timestamps.len();
        Self {
            names: Vec::new(),
            index: HashMap::new(),
            columns: Vec::new(),
            timestamps,
            closes,
            forward_returns: vec![None; n],
            targets: vec![None; n],
        }
    }

    /// Append a NaN-encoded column. Non-finite values become `None`.
    pub(crate) fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.timestamps.len());
        let name = name.into();
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.columns
            .push(values.into_iter().map(|v| v.is_finite().then_some(v)).collect());
    }

    pub(crate) fn set_forward_returns(&mut self, forward_returns: Vec<f64>) {
        self.targets = forward_returns
            .iter()
            .map(|r| r.is_finite().then(|| u8::from(*r > 0.0)))
            .collect();
        self.forward_returns = forward_returns
            .into_iter()
            .map(|r| r.is_finite().then_some(r))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// All column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Columns eligible as model inputs: everything except the diagnostic
    /// `logret_*` columns.
    pub fn model_feature_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|n| !n.starts_with(LOG_RETURN_PREFIX))
            .cloned()
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        self.column_index(name).and_then(|i| self.columns[i][row])
    }

    pub fn timestamp(&self, row: usize) -> DateTime<Utc> {
        self.timestamps[row]
    }

    pub fn close(&self, row: usize) -> f64 {
        self.closes[row]
    }

    pub fn target(&self, row: usize) -> Option<u8> {
        self.targets[row]
    }

    pub fn forward_return(&self, row: usize) -> Option<f64> {
        self.forward_returns[row]
    }

    pub fn targets(&self) -> &[Option<u8>] {
        &self.targets
    }

    /// Full named row, including undefined features.
    pub fn row(&self, row: usize) -> FeatureRow {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, col)| (name.clone(), col[row]))
            .collect()
    }

    /// Row restricted to `names`.
    pub fn row_subset(&self, row: usize, names: &[String]) -> FeatureRow {
        names
            .iter()
            .map(|name| (name.clone(), self.value(row, name)))
            .collect()
    }

    /// Dense feature vector in `names` order, or `None` if any is undefined.
    pub fn feature_vector(&self, row: usize, names: &[String]) -> Option<Vec<f64>> {
        names.iter().map(|name| self.value(row, name)).collect()
    }

    /// A clean row has every feature in `names` defined and a defined target.
    pub fn is_clean(&self, row: usize, names: &[String]) -> bool {
        self.targets[row].is_some() && names.iter().all(|n| self.value(row, n).is_some())
    }

    /// Indices of clean rows within `range`.
    pub fn clean_rows(&self, range: std::ops::Range<usize>, names: &[String]) -> Vec<usize> {
        range
            .filter(|&i| i < self.len() && self.is_clean(i, names))
            .collect()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}
