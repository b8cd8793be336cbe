//! Arrival tally - per destination and group counts, recomputed from particle state.

use serde::Serialize;

use super::{RouteTable, SimulationState};

/// Arrival counter for one destination and group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counter {
    pub destination: String,
    pub group: String,
    pub count: u64,
    /// `count / population_total`, in [0, 1] while the population is capped.
    pub percentage: f64,
}

impl Counter {
    /// Whole-percent label, e.g. `"42%"`.
    pub fn label(&self) -> String {
        format!("{:.0}%", self.percentage * 100.0)
    }
}

/// Count arrived particles per (destination, group).
///
/// Counters come out destination-major in first-appearance order, one per
/// group, including zero counts.
pub fn tally_arrivals(
    state: &SimulationState,
    routes: &RouteTable,
    population_total: f64,
) -> Vec<Counter> {
    let mut counts = state.retired.clone();
    counts.resize(routes.destinations().len() * routes.groups().len(), 0);

    for particle in state.particles.iter().filter(|p| p.is_arrived()) {
        if let Some(route) = routes.get(particle.route) {
            counts[routes.tally_slot(route.destination_index, particle.group)] += 1;
        }
    }

    let mut counters = Vec::with_capacity(counts.len());
    for (d, destination) in routes.destinations().iter().enumerate() {
        for (g, group) in routes.groups().iter().enumerate() {
            let count = counts[routes.tally_slot(d, g)];
            counters.push(Counter {
                destination: destination.clone(),
                group: group.clone(),
                count,
                percentage: if population_total > 0.0 {
                    count as f64 / population_total
                } else {
                    0.0
                },
            });
        }
    }
    counters
}
