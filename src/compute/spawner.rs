//! Particle spawner - stochastic creation of new particles each tick.

use log::debug;

use super::{EngineError, FlowRng, Particle, ParticleId, RouteTable, SimulationState, SpawnScales};

/// Spawn between 0 and `density` particles for `tick`, stopping at `cap` live particles.
///
/// Returns the number of particles added. A tick that attempts any spawn
/// fails before inserting anything if some route has no cached geometry.
pub fn spawn_particles(
    state: &mut SimulationState,
    routes: &RouteTable,
    scales: &SpawnScales,
    density: u32,
    cap: usize,
    rng: &mut FlowRng,
    tick: u64,
) -> Result<usize, EngineError> {
    if state.particles.len() >= cap {
        return Ok(0);
    }

    let attempts = (rng.unit() * density as f64).round() as u32;
    if attempts > 0
        && let Some(route) = routes
            .routes()
            .iter()
            .find(|r| !state.cache.contains(&r.geometry_key))
    {
        return Err(EngineError::CacheNotReady {
            key: route.geometry_key.clone(),
        });
    }

    let mut added = 0;
    for index in 0..attempts {
        if state.particles.len() >= cap {
            debug!("Population cap {cap} reached at tick {tick}");
            break;
        }

        let route_index = routes.sample(rng.unit());
        let route = routes
            .get(route_index)
            .ok_or(EngineError::UnknownRoute(route_index))?;
        let geometry = state
            .cache
            .get(&route.geometry_key)
            .ok_or_else(|| EngineError::CacheNotReady {
                key: route.geometry_key.clone(),
            })?;

        let speed = rng.sample(&scales.speed);
        let lateral_offset = rng.sample(&scales.offset);
        let group = routes.resolve_group(route, rng.unit());

        state.particles.insert(Particle {
            id: ParticleId { tick, index },
            route: route_index,
            group,
            speed,
            lateral_offset,
            created_at: tick,
            current_pos: 0.0,
            route_length: geometry.len(),
        });
        added += 1;
    }

    if added > 0 {
        debug!(
            "Tick {tick}: spawned {added} particles ({} live)",
            state.particles.len()
        );
    }
    Ok(added)
}
