//! Statistical check that route draws follow route weights.

use particle_flow::{
    compute::{FlowRng, Hierarchy, RouteTable},
    schema::{Dataset, DatasetShape},
};

const DRAWS: usize = 100_000;

/// Chi-squared critical values at p = 0.001 by degrees of freedom.
fn critical_value(df: usize) -> f64 {
    match df {
        1 => 10.83,
        2 => 13.82,
        3 => 16.27,
        4 => 18.47,
        5 => 20.52,
        _ => panic!("no critical value for {df} degrees of freedom"),
    }
}

fn chi_squared(counts: &[usize], weights: &[f64], draws: usize) -> f64 {
    counts
        .iter()
        .zip(weights)
        .map(|(&observed, &w)| {
            let expected = w * draws as f64;
            (observed as f64 - expected).powi(2) / expected
        })
        .sum()
}

fn table(json: &str, shape: &DatasetShape) -> RouteTable {
    let dataset = Dataset::from_json_str(json, shape, 64).unwrap();
    RouteTable::enumerate(&Hierarchy::flatten(&dataset)).unwrap()
}

#[test]
fn test_route_draws_converge_to_weights() {
    let routes = table(
        r#"{"a": {"x": {"males": 12, "females": 8}, "y": {"males": 30}}, "b": {"males": 25, "females": 25}}"#,
        &DatasetShape::default(),
    );
    let weights: Vec<f64> = routes.routes().iter().map(|r| r.weight).collect();
    let mut counts = vec![0usize; routes.len()];
    let mut rng = FlowRng::new(2024);
    for _ in 0..DRAWS {
        counts[routes.sample(rng.unit())] += 1;
    }

    let statistic = chi_squared(&counts, &weights, DRAWS);
    assert!(
        statistic < critical_value(routes.len() - 1),
        "chi-squared {statistic} for counts {counts:?}"
    );
}

#[test]
fn test_flat_group_split_converges() {
    let routes = table(
        r#"{"bit0":10,"bit1":20,"bit2":30,"bit3":25,"bit4":15,"males":60,"females":40}"#,
        &DatasetShape::flat(),
    );
    let route = routes.get(0).unwrap();
    let weights: Vec<f64> = routes
        .groups()
        .iter()
        .map(|g| if g == "females" { 0.4 } else { 0.6 })
        .collect();
    let mut counts = vec![0usize; routes.groups().len()];
    let mut rng = FlowRng::new(7);
    for _ in 0..DRAWS {
        counts[routes.resolve_group(route, rng.unit())] += 1;
    }

    let statistic = chi_squared(&counts, &weights, DRAWS);
    assert!(statistic < critical_value(1), "chi-squared {statistic}");
}
