//! Input datasets: nested category trees and flat keyed tables.
//!
//! Shape detection happens once, here. Downstream code matches on
//! [`DatasetNode`] instead of probing JSON objects.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use super::DatasetShape;

/// Name of the synthetic node every route starts from.
pub const ROOT_NAME: &str = "root";

/// One entry of a nested dataset, classified at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetNode {
    /// Category with nested children, in input order.
    Internal(Vec<(String, DatasetNode)>),
    /// Terminal category with per-group counts, in input order.
    Terminal(Vec<(String, f64)>),
}

/// A parsed dataset of either supported shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Children of the synthetic root.
    Nested { children: Vec<(String, DatasetNode)> },
    /// Category counts plus a global binary group split.
    Flat {
        /// `(category, count)` pairs in input order.
        categories: Vec<(String, f64)>,
        /// `(group, count)` pairs in shape order.
        groups: Vec<(String, f64)>,
        /// Category every link starts from.
        source: String,
    },
}

impl Dataset {
    /// Parse a dataset from a JSON string.
    pub fn from_json_str(
        json: &str,
        shape: &DatasetShape,
        max_depth: usize,
    ) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value, shape, max_depth)
    }

    /// Load and parse a dataset file.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        shape: &DatasetShape,
        max_depth: usize,
    ) -> Result<Self, DatasetError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json, shape, max_depth)
    }

    /// Classify a JSON value according to `shape`.
    pub fn from_value(
        value: &Value,
        shape: &DatasetShape,
        max_depth: usize,
    ) -> Result<Self, DatasetError> {
        let object = value
            .as_object()
            .ok_or_else(|| DatasetError::malformed("/", "dataset must be a JSON object"))?;

        match shape {
            DatasetShape::Nested { group_keys } => parse_nested(object, group_keys, max_depth),
            DatasetShape::Flat {
                category_prefix,
                group_keys,
                source_index,
            } => parse_flat(object, category_prefix, group_keys, *source_index),
        }
    }

    /// Sum of every count that becomes a route.
    pub fn total_count(&self) -> f64 {
        match self {
            Dataset::Nested { children } => children.iter().map(|(_, n)| n.total_count()).sum(),
            Dataset::Flat { categories, .. } => categories.iter().map(|(_, c)| c).sum(),
        }
    }
}

impl DatasetNode {
    /// Sum of all group counts below this node.
    pub fn total_count(&self) -> f64 {
        match self {
            DatasetNode::Internal(children) => children.iter().map(|(_, n)| n.total_count()).sum(),
            DatasetNode::Terminal(groups) => groups.iter().map(|(_, c)| c).sum(),
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DatasetNode::Terminal(_))
    }
}

fn parse_nested(
    object: &Map<String, Value>,
    group_keys: &[String],
    max_depth: usize,
) -> Result<Dataset, DatasetError> {
    let root_path = format!("/{ROOT_NAME}");

    // `{"root": {...}}` names the synthetic root explicitly.
    let object = match object.get(ROOT_NAME) {
        Some(Value::Object(inner)) if object.len() == 1 => inner,
        _ => object,
    };

    if object.keys().any(|k| group_keys.contains(k)) {
        return Err(DatasetError::malformed(
            &root_path,
            "root cannot carry group counts",
        ));
    }

    let children = parse_children(object, &root_path, group_keys, 1, max_depth)?;
    Ok(Dataset::Nested { children })
}

fn parse_children(
    object: &Map<String, Value>,
    path: &str,
    group_keys: &[String],
    depth: usize,
    max_depth: usize,
) -> Result<Vec<(String, DatasetNode)>, DatasetError> {
    if depth > max_depth {
        return Err(DatasetError::malformed(
            path,
            format!("nesting exceeds max depth {max_depth}"),
        ));
    }

    let mut children = Vec::with_capacity(object.len());
    for (name, value) in object {
        let child_path = format!("{path}/{name}");
        if name.is_empty() || name.contains('/') {
            return Err(DatasetError::malformed(
                &child_path,
                "category names must be non-empty and free of '/'",
            ));
        }
        let child = parse_node(value, &child_path, group_keys, depth, max_depth)?;
        children.push((name.clone(), child));
    }
    Ok(children)
}

fn parse_node(
    value: &Value,
    path: &str,
    group_keys: &[String],
    depth: usize,
    max_depth: usize,
) -> Result<DatasetNode, DatasetError> {
    let Value::Object(object) = value else {
        return Err(DatasetError::malformed(
            path,
            "entry is neither a group breakdown nor a mapping of children",
        ));
    };

    let is_terminal = object.keys().any(|k| group_keys.contains(k));
    if !is_terminal {
        return parse_children(object, path, group_keys, depth + 1, max_depth)
            .map(DatasetNode::Internal);
    }

    let mut groups = Vec::with_capacity(object.len());
    for (key, count) in object {
        if !group_keys.contains(key) {
            return Err(DatasetError::malformed(
                path,
                format!("terminal entry mixes group counts with unrecognized key '{key}'"),
            ));
        }
        groups.push((key.clone(), parse_count(count, &format!("{path}/{key}"))?));
    }
    Ok(DatasetNode::Terminal(groups))
}

fn parse_flat(
    object: &Map<String, Value>,
    category_prefix: &str,
    group_keys: &[String],
    source_index: usize,
) -> Result<Dataset, DatasetError> {
    let categories = object
        .iter()
        .filter(|(key, _)| key.starts_with(category_prefix))
        .map(|(key, value)| parse_count(value, key).map(|c| (key.clone(), c)))
        .collect::<Result<Vec<_>, _>>()?;

    let groups = group_keys
        .iter()
        .map(|key| {
            let value = object
                .get(key)
                .ok_or_else(|| DatasetError::malformed(key, "missing group aggregate"))?;
            parse_count(value, key).map(|c| (key.clone(), c))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let source = categories
        .get(source_index)
        .map(|(name, _)| name.clone())
        .ok_or_else(|| {
            DatasetError::malformed(
                "/",
                format!(
                    "source index {source_index} out of range for {} categories",
                    categories.len()
                ),
            )
        })?;

    Ok(Dataset::Flat {
        categories,
        groups,
        source,
    })
}

fn parse_count(value: &Value, path: &str) -> Result<f64, DatasetError> {
    match value.as_f64() {
        Some(c) if c.is_finite() && c >= 0.0 => Ok(c),
        _ => Err(DatasetError::malformed(
            path,
            format!("count must be a non-negative number, got {value}"),
        )),
    }
}

/// Dataset loading and classification errors.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Malformed dataset at {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
}

impl DatasetError {
    fn malformed(path: &str, reason: impl Into<String>) -> Self {
        DatasetError::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
