//! Geometry cache - unit-arclength sampling of every route curve.
//!
//! Sampling once per layout turns a particle's arclength position directly
//! into an index: sample `i` is the curve point at arclength `i`.

use std::collections::HashMap;

use log::{info, warn};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::{Curve, Point};

/// Cached samples for one geometry key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGeometry {
    points: Vec<Point>,
}

impl RouteGeometry {
    /// Sample `floor(L)` points at arclengths `0, 1, ..., floor(L) - 1`.
    pub fn sample<C: Curve + ?Sized>(curve: &C) -> Self {
        let length = curve.total_length();
        let count = if length.is_finite() && length > 0.0 {
            length.floor() as usize
        } else {
            0
        };
        let points = (0..count)
            .map(|s| curve.point_at_length(s as f64))
            .collect();
        Self { points }
    }

    /// Route length in engine units (the number of cached points).
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Immutable-once-built lookup from geometry key to sampled route.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    entries: HashMap<String, RouteGeometry>,
}

impl GeometryCache {
    /// Empty cache; spawning against it fails with `CacheNotReady`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample every curve. Distinct keys are sampled in parallel on native targets.
    pub fn build<C: Curve>(curves: &[(String, C)]) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let entries: HashMap<String, RouteGeometry> = curves
            .par_iter()
            .map(|(key, curve)| (key.clone(), RouteGeometry::sample(curve)))
            .collect();

        #[cfg(target_arch = "wasm32")]
        let entries: HashMap<String, RouteGeometry> = curves
            .iter()
            .map(|(key, curve)| (key.clone(), RouteGeometry::sample(curve)))
            .collect();

        if entries.len() != curves.len() {
            warn!(
                "Geometry cache received {} curves for {} distinct keys; duplicates collapsed",
                curves.len(),
                entries.len()
            );
        }
        info!(
            "Built geometry cache: {} routes, {} points",
            entries.len(),
            entries.values().map(RouteGeometry::len).sum::<usize>()
        );

        Self { entries }
    }

    /// Replace every entry at once, e.g. after a resize.
    pub fn replace(&mut self, other: GeometryCache) {
        *self = other;
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&RouteGeometry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{PathBuilder, PathCurve};

    #[test]
    fn test_hundred_unit_line() {
        let curve = PathBuilder::move_to(0.0, 0.0).line_to(100.0, 0.0).build();
        let geometry = RouteGeometry::sample(&curve);
        assert_eq!(geometry.len(), 100);
        assert_eq!(geometry.get(0), Some(Point::new(0.0, 0.0)));
        assert!((geometry.get(99).unwrap().x - 99.0).abs() < 1e-9);
        assert_eq!(geometry.get(100), None);
    }

    #[test]
    fn test_fractional_length_floors() {
        let curve = PathBuilder::move_to(0.0, 0.0).line_to(3.0, 4.5).build();
        let length = curve.total_length();
        let geometry = RouteGeometry::sample(&curve);
        assert_eq!(geometry.len(), length.floor() as usize);
    }

    #[test]
    fn test_samples_lie_on_curve() {
        let curve = PathBuilder::move_to(0.0, 50.0)
            .line_to(80.0, 50.0)
            .cubic_to((150.0, 50.0), (150.0, 200.0), (220.0, 200.0))
            .line_to(300.0, 200.0)
            .build();
        let geometry = RouteGeometry::sample(&curve);
        assert_eq!(geometry.len(), curve.total_length().floor() as usize);
        for (s, p) in geometry.points().iter().enumerate() {
            let expected = curve.point_at_length(s as f64);
            assert!(p.distance(expected) < 1e-9);
        }
        // Consecutive samples are one arclength unit apart (chords may be shorter on bends).
        for pair in geometry.points().windows(2) {
            assert!(pair[0].distance(pair[1]) <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_build_and_replace() {
        let curves: Vec<(String, PathCurve)> = vec![
            (
                "a".into(),
                PathBuilder::move_to(0.0, 0.0).line_to(10.0, 0.0).build(),
            ),
            (
                "b".into(),
                PathBuilder::move_to(0.0, 0.0).line_to(0.0, 25.5).build(),
            ),
        ];
        let mut cache = GeometryCache::build(&curves);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").unwrap().len(), 10);
        assert_eq!(cache.get("b").unwrap().len(), 25);
        assert!(cache.get("c").is_none());

        let wider = vec![(
            "a".to_string(),
            PathBuilder::move_to(0.0, 0.0).line_to(20.0, 0.0).build(),
        )];
        cache.replace(GeometryCache::build(&wider));
        assert_eq!(cache.get("a").unwrap().len(), 20);
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_degenerate_curve() {
        let curve = PathCurve::from_points(vec![Point::new(1.0, 1.0)]);
        assert!(RouteGeometry::sample(&curve).is_empty());
    }
}
