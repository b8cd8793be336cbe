//! Built-in layout collaborators.
//!
//! The engine consumes layout as a black box: node boxes for labels and one
//! curve per geometry key. These layouts are simple stand-ins
//! for a full flow-diagram layout and can be replaced by anything that
//! implements [`Layout`].

use std::collections::HashMap;

use serde::Serialize;

use super::{Hierarchy, HierarchyKind, PathBuilder, PathCurve, RouteTable};
use crate::schema::LayoutConfig;

/// Screen box of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBox {
    pub path: String,
    pub name: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Output of a layout pass.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub width: f64,
    pub height: f64,
    /// Half thickness of a route band; lateral offsets are measured from the band center.
    pub band_half_height: f64,
    pub boxes: Vec<NodeBox>,
    /// One curve per geometry key, in route order.
    pub curves: Vec<(String, PathCurve)>,
}

/// Layout capability consumed by the engine.
pub trait Layout {
    fn layout(&self, hierarchy: &Hierarchy, routes: &RouteTable) -> LayoutResult;
}

/// Choose the built-in layout for a hierarchy shape.
pub fn default_layout(kind: HierarchyKind, config: LayoutConfig) -> Box<dyn Layout> {
    match kind {
        HierarchyKind::Nested => Box::new(ColumnLayout::new(config)),
        HierarchyKind::Flat => Box::new(BandLayout::new(config)),
    }
}

/// Depth columns for nested hierarchies; terminals justified to the last column.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    config: LayoutConfig,
}

impl ColumnLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn column_of(&self, hierarchy: &Hierarchy, path: &str, depth: usize) -> usize {
        match hierarchy.node(path) {
            Some(node) if node.is_terminal() => hierarchy.height(),
            _ => depth,
        }
    }
}

impl Layout for ColumnLayout {
    fn layout(&self, hierarchy: &Hierarchy, routes: &RouteTable) -> LayoutResult {
        let cfg = &self.config;
        let columns = hierarchy.height() + 1;
        let inner_width = cfg.inner_width();
        let node_width = inner_width / columns as f64 * cfg.curve;
        let column_step = if columns > 1 {
            (inner_width - node_width) / (columns - 1) as f64
        } else {
            0.0
        };

        // One row per terminal path, top to bottom in route order; parents
        // center over their leaves.
        let mut leaf_rows: Vec<&str> = Vec::new();
        for route in routes.routes() {
            let terminal = route.terminal_path();
            if !leaf_rows.contains(&terminal) {
                leaf_rows.push(terminal);
            }
        }
        let row_y =
            |row: usize| cfg.padding / 2.0 + row as f64 * (cfg.band_height + cfg.padding / 2.0);

        let mut rows_below: HashMap<&str, Vec<usize>> = HashMap::new();
        for route in routes.routes() {
            let Some(row) = leaf_rows.iter().position(|p| *p == route.terminal_path()) else {
                continue;
            };
            for node in &route.nodes {
                let rows = rows_below.entry(node.as_str()).or_default();
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }

        let boxes: Vec<NodeBox> = hierarchy
            .nodes
            .iter()
            .filter_map(|node| {
                let rows = rows_below.get(node.path.as_str())?;
                let y0 = rows.iter().map(|&r| row_y(r)).sum::<f64>() / rows.len() as f64;
                let x0 = self.column_of(hierarchy, &node.path, node.depth) as f64 * column_step;
                Some(NodeBox {
                    path: node.path.clone(),
                    name: node.name.clone(),
                    x0,
                    y0,
                    x1: x0 + node_width,
                    y1: y0 + cfg.band_height,
                })
            })
            .collect();

        let curves = routes
            .geometry_keys()
            .into_iter()
            .filter_map(|key| {
                let route = routes.routes().iter().find(|r| r.geometry_key == key)?;
                let along: Vec<&NodeBox> = route
                    .nodes
                    .iter()
                    .filter_map(|p| boxes.iter().find(|b| &b.path == p))
                    .collect();
                route_path(&along, cfg.band_height).map(|c| (key.to_string(), c))
            })
            .collect();

        LayoutResult {
            width: cfg.width,
            height: cfg.nested_height(leaf_rows.len()),
            band_half_height: cfg.band_height / 2.0,
            boxes,
            curves,
        }
    }
}

/// Path through a chain of node boxes: a straight run across each box, then a
/// horizontal-tangent cubic into the next.
pub fn route_path(nodes: &[&NodeBox], band_height: f64) -> Option<PathCurve> {
    let first = nodes.first()?;
    let h = band_height / 2.0;
    let mut path = PathBuilder::move_to(first.x0, first.y0 + h);
    for (i, n) in nodes.iter().enumerate() {
        path = path.line_to(n.x1, n.y0 + h);
        if let Some(next) = nodes.get(i + 1) {
            let w = next.x0 - n.x1;
            path = path.cubic_to(
                (n.x1 + w / 2.0, n.y0 + h),
                (n.x1 + w / 2.0, next.y0 + h),
                (next.x0, next.y0 + h),
            );
        }
    }
    Some(path.build())
}

/// Band scale for flat datasets: one horizontal band per route target.
#[derive(Debug, Clone)]
pub struct BandLayout {
    config: LayoutConfig,
}

impl BandLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// `(band_start, bandwidth)` for `count` bands over `[height, 0]`,
    /// first band at the bottom.
    pub fn band_scale(&self, count: usize) -> (Vec<f64>, f64) {
        let n = count.max(1) as f64;
        let p = self.config.band_padding;
        let step = self.config.height / (n - p).max(1.0);
        let bandwidth = step * (1.0 - p);
        let starts = (0..count)
            .map(|i| step * (count - 1 - i) as f64)
            .collect();
        (starts, bandwidth)
    }
}

impl Layout for BandLayout {
    fn layout(&self, hierarchy: &Hierarchy, routes: &RouteTable) -> LayoutResult {
        let cfg = &self.config;
        let targets = routes.destinations();
        let (starts, bandwidth) = self.band_scale(targets.len());
        let band_of = |name: &str| {
            targets
                .iter()
                .position(|t| t == name)
                .map(|i| starts[i])
                .unwrap_or(0.0)
        };
        let half = bandwidth / 2.0;
        let source = &hierarchy.root().name;
        let y_source = band_of(source);

        let boxes = targets
            .iter()
            .map(|name| {
                let y0 = band_of(name);
                NodeBox {
                    path: format!("{}/{name}", Hierarchy::root_path()),
                    name: name.clone(),
                    x0: cfg.width * (1.0 - cfg.curve),
                    y0,
                    x1: cfg.width,
                    y1: y0 + bandwidth,
                }
            })
            .collect();

        let curves = routes
            .geometry_keys()
            .into_iter()
            .filter_map(|key| {
                let route = routes.routes().iter().find(|r| r.geometry_key == key)?;
                let y_target = band_of(&route.destination);
                Some((
                    key.to_string(),
                    flat_link_path(cfg.width, y_source + half, y_target + half, cfg.curve),
                ))
            })
            .collect();

        LayoutResult {
            width: cfg.width,
            height: cfg.height,
            band_half_height: half,
            boxes,
            curves,
        }
    }
}

/// Link from the source band to a target band across the full canvas width.
pub fn flat_link_path(width: f64, y_source: f64, y_target: f64, curve: f64) -> PathCurve {
    PathBuilder::move_to(0.0, y_source)
        .line_to(width * curve, y_source)
        .cubic_to(
            (width / 2.0, y_source),
            (width / 2.0, y_target),
            (width * (1.0 - curve), y_target),
        )
        .line_to(width, y_target)
        .build()
}
