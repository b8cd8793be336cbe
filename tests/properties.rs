//! Property tests for route weights and particle motion.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use particle_flow::{
    compute::{
        GeometryCache, Hierarchy, PathBuilder, PathCurve, Particle, ParticleId, RouteTable,
        SimulationState, StepOptions, step_particles,
    },
    schema::{Dataset, DatasetShape},
};

/// Two-level dataset: parents hold terminals with (males, females) counts.
fn dataset_strategy() -> impl Strategy<Value = Vec<Vec<(u32, u32)>>> {
    prop::collection::vec(
        prop::collection::vec((1u32..10_000, 0u32..10_000), 1..5),
        1..6,
    )
}

fn dataset_json(parents: &[Vec<(u32, u32)>]) -> Value {
    let mut root = Map::new();
    for (p, leaves) in parents.iter().enumerate() {
        let mut children = Map::new();
        for (l, (males, females)) in leaves.iter().enumerate() {
            children.insert(
                format!("leaf{l}"),
                json!({"males": males, "females": females}),
            );
        }
        root.insert(format!("parent{p}"), Value::Object(children));
    }
    Value::Object(root)
}

fn line_state(routes: &RouteTable, length: f64) -> SimulationState {
    let curves: Vec<(String, PathCurve)> = routes
        .geometry_keys()
        .into_iter()
        .map(|k| (k.to_string(), PathBuilder::move_to(0.0, 0.0).line_to(length, 0.0).build()))
        .collect();
    let mut state = SimulationState::new(routes);
    state.cache = GeometryCache::build(&curves);
    state
}

fn particle(speed: f64, created_at: u64, route_length: usize) -> Particle {
    Particle {
        id: ParticleId {
            tick: created_at,
            index: 0,
        },
        route: 0,
        group: 0,
        speed,
        lateral_offset: 0.0,
        created_at,
        current_pos: 0.0,
        route_length,
    }
}

const OPTIONS: StepOptions = StepOptions {
    particle_size: 7.0,
    squeeze_on_arrival: true,
    retain_arrived: true,
};

fn single_route() -> RouteTable {
    let dataset =
        Dataset::from_json_str(r#"{"A": {"males": 1}}"#, &DatasetShape::default(), 64).unwrap();
    RouteTable::enumerate(&Hierarchy::flatten(&dataset)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn weights_sum_to_one(parents in dataset_strategy()) {
        let value = dataset_json(&parents);
        let dataset = Dataset::from_value(&value, &DatasetShape::default(), 64).unwrap();
        let routes = RouteTable::enumerate(&Hierarchy::flatten(&dataset)).unwrap();

        let expected: usize = parents.iter().map(Vec::len).sum::<usize>() * 2;
        prop_assert_eq!(routes.len(), expected);
        let sum: f64 = routes.routes().iter().map(|r| r.weight).sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
        prop_assert!(routes.routes().iter().all(|r| r.weight >= 0.0));
    }

    #[test]
    fn position_is_exact_and_monotone(
        speed in 0.1f64..5.0,
        created_at in 0u64..1000,
        ticks in prop::collection::vec(0u64..5000, 1..20),
    ) {
        let routes = single_route();
        let mut state = line_state(&routes, 200.0);
        state.particles.insert(particle(speed, created_at, 200));

        let mut ticks = ticks;
        ticks.sort_unstable();
        let mut previous = 0.0;
        for tick in ticks {
            step_particles(&mut state, &routes, OPTIONS, tick);
            let p = state.particles.iter().next().unwrap();
            let expected = tick.saturating_sub(created_at) as f64 * speed;
            prop_assert_eq!(p.current_pos, expected);
            prop_assert!(p.current_pos >= previous);
            previous = p.current_pos;
        }
    }

    #[test]
    fn stepping_is_idempotent(
        speeds in prop::collection::vec(0.1f64..3.0, 1..30),
        tick in 0u64..400,
    ) {
        let routes = single_route();
        let mut state = line_state(&routes, 150.0);
        for (i, speed) in speeds.iter().enumerate() {
            state.particles.insert(particle(*speed, i as u64, 150));
        }
        let first = step_particles(&mut state, &routes, OPTIONS, tick);
        let second = step_particles(&mut state, &routes, OPTIONS, tick);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn in_flight_iff_before_route_end(speed in 0.1f64..3.0, tick in 0u64..2000) {
        let routes = single_route();
        let mut state = line_state(&routes, 100.0);
        state.particles.insert(particle(speed, 0, 100));
        let sprites = step_particles(&mut state, &routes, OPTIONS, tick);
        let in_flight = (tick as f64 * speed) < 100.0;
        prop_assert_eq!(sprites.len(), usize::from(in_flight));
    }
}
