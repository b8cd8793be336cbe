//! Route enumeration and weighted route sampling.

use std::collections::HashMap;

use log::info;

use super::{EngineError, Hierarchy, HierarchyKind, Outcome};

/// Cumulative-sum threshold array for inverse-CDF discrete sampling.
///
/// A uniform draw `u` in [0, 1) maps to the first entry whose cumulative
/// threshold exceeds `u`.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    thresholds: Vec<f64>,
    /// Last entry with positive weight; absorbs draws lost to rounding.
    last_positive: usize,
}

impl ThresholdTable {
    /// Build from weights in sampling order. Weights should sum to 1.
    pub fn from_weights<I: IntoIterator<Item = f64>>(weights: I) -> Self {
        let mut thresholds = Vec::new();
        let mut last_positive = 0;
        let mut sum = 0.0;
        for (i, w) in weights.into_iter().enumerate() {
            sum += w;
            thresholds.push(sum);
            if w > 0.0 {
                last_positive = i;
            }
        }
        Self {
            thresholds,
            last_positive,
        }
    }

    /// Cumulative thresholds, one per entry.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Entry index for a uniform draw in [0, 1).
    #[inline]
    pub fn index_for(&self, u: f64) -> usize {
        let i = self.thresholds.partition_point(|&t| t <= u);
        i.min(self.last_positive)
    }
}

/// One root-to-terminal route paired with one outcome group.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Node paths from the root to the terminal, inclusive.
    pub nodes: Vec<String>,
    /// Terminal node name.
    pub destination: String,
    /// Index into [`RouteTable::destinations`].
    pub destination_index: usize,
    /// Index into [`RouteTable::groups`]; `None` when drawn from the global split.
    pub group: Option<usize>,
    /// Absolute count behind this route.
    pub count: f64,
    /// `count / total`, summing to 1 across the table.
    pub weight: f64,
    /// Geometry cache key. Routes to the same terminal share geometry.
    pub geometry_key: String,
}

impl Route {
    /// Path of the terminal node.
    pub fn terminal_path(&self) -> &str {
        self.nodes.last().map(String::as_str).unwrap_or_default()
    }
}

/// Every weighted route of a hierarchy plus the sampling structures over them.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    thresholds: ThresholdTable,
    groups: Vec<String>,
    destinations: Vec<String>,
    group_thresholds: Option<ThresholdTable>,
    total_count: f64,
}

impl RouteTable {
    /// Enumerate every root-to-terminal route in depth-first, left-to-right order.
    pub fn enumerate(hierarchy: &Hierarchy) -> Result<Self, EngineError> {
        let paths = root_to_terminal_paths(hierarchy);

        let mut groups: Vec<String> = Vec::new();
        let mut destinations: Vec<String> = Vec::new();
        let mut routes = Vec::new();

        let flat_source = &hierarchy.root().name;
        for nodes in paths {
            let Some(terminal) = nodes.last().and_then(|p| hierarchy.node(p)) else {
                continue;
            };
            let destination_index = intern(&mut destinations, &terminal.name);
            let geometry_key = match hierarchy.kind {
                HierarchyKind::Nested => terminal.path.clone(),
                HierarchyKind::Flat => format!("{flat_source}_{}", terminal.name),
            };

            match &terminal.outcome {
                Some(Outcome::Groups(breakdown)) => {
                    for (key, count) in breakdown {
                        routes.push(Route {
                            nodes: nodes.clone(),
                            destination: terminal.name.clone(),
                            destination_index,
                            group: Some(intern(&mut groups, key)),
                            count: *count,
                            weight: 0.0,
                            geometry_key: geometry_key.clone(),
                        });
                    }
                }
                Some(Outcome::Count(count)) => routes.push(Route {
                    nodes: nodes.clone(),
                    destination: terminal.name.clone(),
                    destination_index,
                    group: None,
                    count: *count,
                    weight: 0.0,
                    geometry_key,
                }),
                None => {}
            }
        }

        let total_count: f64 = routes.iter().map(|r| r.count).sum();
        if routes.is_empty() || total_count <= 0.0 {
            return Err(EngineError::EmptyGraph);
        }
        for route in &mut routes {
            route.weight = route.count / total_count;
        }
        let thresholds = ThresholdTable::from_weights(routes.iter().map(|r| r.weight));

        let group_thresholds = match &hierarchy.group_split {
            Some(split) => {
                let split_total: f64 = split.iter().map(|(_, c)| c).sum();
                if split_total <= 0.0 {
                    return Err(EngineError::EmptyGraph);
                }
                for (key, _) in split {
                    intern(&mut groups, key);
                }
                Some(ThresholdTable::from_weights(
                    split.iter().map(|(_, c)| c / split_total),
                ))
            }
            None => None,
        };

        info!(
            "Enumerated {} routes to {} destinations ({} groups, total count {})",
            routes.len(),
            destinations.len(),
            groups.len(),
            total_count
        );

        Ok(Self {
            routes,
            thresholds,
            groups,
            destinations,
            group_thresholds,
            total_count,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Threshold structure over route weights.
    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Threshold structure over the global group split (flat datasets).
    pub fn group_thresholds(&self) -> Option<&ThresholdTable> {
        self.group_thresholds.as_ref()
    }

    /// Group keys in first-appearance order.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Distinct destination names in first-appearance order.
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Sum of all counts across routes.
    pub fn total_count(&self) -> f64 {
        self.total_count
    }

    /// Distinct geometry keys in route order.
    pub fn geometry_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for route in &self.routes {
            if !keys.contains(&route.geometry_key.as_str()) {
                keys.push(&route.geometry_key);
            }
        }
        keys
    }

    /// Route index for a uniform draw in [0, 1).
    #[inline]
    pub fn sample(&self, u: f64) -> usize {
        self.thresholds.index_for(u)
    }

    /// Group for a particle on `route`. Uses `u` only when the route has no fixed group.
    #[inline]
    pub fn resolve_group(&self, route: &Route, u: f64) -> usize {
        match (route.group, &self.group_thresholds) {
            (Some(group), _) => group,
            (None, Some(table)) => table.index_for(u),
            (None, None) => 0,
        }
    }

    /// Flat index for a (destination, group) pair.
    #[inline]
    pub fn tally_slot(&self, destination: usize, group: usize) -> usize {
        destination * self.groups.len() + group
    }
}

fn intern(list: &mut Vec<String>, value: &str) -> usize {
    match list.iter().position(|v| v == value) {
        Some(i) => i,
        None => {
            list.push(value.to_string());
            list.len() - 1
        }
    }
}

/// Depth-first, left-to-right walk collecting every path that ends at a terminal.
fn root_to_terminal_paths(hierarchy: &Hierarchy) -> Vec<Vec<String>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &hierarchy.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut paths = Vec::new();
    let mut current = Vec::new();
    // Each path visits a node at most once, so its length is bounded by the node count.
    let max_len = hierarchy.nodes.len();
    walk(
        &adjacency,
        &hierarchy.root().path,
        &mut current,
        &mut paths,
        max_len,
    );
    paths
        .into_iter()
        .filter(|p: &Vec<String>| {
            p.last()
                .and_then(|t| hierarchy.node(t))
                .is_some_and(|n| n.is_terminal())
        })
        .collect()
}

fn walk<'a>(
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    node: &'a str,
    current: &mut Vec<&'a str>,
    paths: &mut Vec<Vec<String>>,
    max_len: usize,
) {
    if current.len() >= max_len || current.contains(&node) {
        return;
    }
    current.push(node);
    match adjacency.get(node) {
        Some(children) if !children.is_empty() => {
            for child in children {
                walk(adjacency, child, current, paths, max_len);
            }
        }
        _ => paths.push(current.iter().map(|s| s.to_string()).collect()),
    }
    current.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Dataset, DatasetShape};

    fn table(json: &str, shape: &DatasetShape) -> Result<RouteTable, EngineError> {
        let dataset = Dataset::from_json_str(json, shape, 64).unwrap();
        RouteTable::enumerate(&Hierarchy::flatten(&dataset))
    }

    #[test]
    fn test_single_chain_routes() {
        let t = table(
            r#"{"root": {"A": {"B": {"males": 3, "females": 1}}}}"#,
            &DatasetShape::default(),
        )
        .unwrap();
        assert_eq!(t.len(), 2);
        let males = &t.routes()[0];
        assert_eq!(males.nodes, ["/root", "/root/A", "/root/A/B"]);
        assert_eq!(t.groups()[males.group.unwrap()], "males");
        assert!((males.weight - 0.75).abs() < 1e-12);
        let females = &t.routes()[1];
        assert_eq!(t.groups()[females.group.unwrap()], "females");
        assert!((females.weight - 0.25).abs() < 1e-12);
        assert_eq!(males.geometry_key, "/root/A/B");
        assert_eq!(t.geometry_keys(), ["/root/A/B"]);
    }

    #[test]
    fn test_depth_first_order() {
        let t = table(
            r#"{"a": {"x": {"males": 1}, "y": {"males": 1}}, "b": {"males": 2}}"#,
            &DatasetShape::default(),
        )
        .unwrap();
        let terminals: Vec<_> = t.routes().iter().map(|r| r.terminal_path()).collect();
        assert_eq!(terminals, ["/root/a/x", "/root/a/y", "/root/b"]);
    }

    #[test]
    fn test_dead_end_skipped() {
        let t = table(
            r#"{"empty": {}, "b": {"males": 2}}"#,
            &DatasetShape::default(),
        )
        .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.destinations(), ["b"]);
    }

    #[test]
    fn test_empty_graph() {
        let err = table(r#"{"a": {}}"#, &DatasetShape::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGraph));

        let err = table(r#"{"a": {"males": 0}}"#, &DatasetShape::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyGraph));
    }

    #[test]
    fn test_flat_routes() {
        let t = table(
            r#"{"bit0":10,"bit1":20,"bit2":30,"bit3":25,"bit4":15,"males":60,"females":40}"#,
            &DatasetShape::flat(),
        )
        .unwrap();
        assert_eq!(t.len(), 5);
        let sum: f64 = t.routes().iter().map(|r| r.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(t.routes()[0].geometry_key, "bit3_bit0");
        assert!(t.routes().iter().all(|r| r.group.is_none()));

        let colors = t.group_thresholds().unwrap();
        assert!((colors.thresholds()[0] - 0.4).abs() < 1e-12);
        assert_eq!(t.groups()[t.resolve_group(&t.routes()[0], 0.39)], "females");
        assert_eq!(t.groups()[t.resolve_group(&t.routes()[0], 0.4)], "males");
    }

    #[test]
    fn test_threshold_lookup() {
        let table = ThresholdTable::from_weights([0.5, 0.0, 0.3, 0.2]);
        assert_eq!(table.index_for(0.0), 0);
        assert_eq!(table.index_for(0.499), 0);
        // Zero-weight entries are never selected.
        assert_eq!(table.index_for(0.5), 2);
        assert_eq!(table.index_for(0.79), 2);
        assert_eq!(table.index_for(0.8), 3);
        assert_eq!(table.index_for(0.999_999), 3);
    }

    #[test]
    fn test_threshold_rounding_tail() {
        // Cumulative sum falls short of 1; draws past it go to the last positive entry.
        let table = ThresholdTable::from_weights([0.3, 0.3, 0.3, 0.0]);
        assert_eq!(table.index_for(0.95), 2);
    }
}
