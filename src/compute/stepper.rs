//! Particle stepper - maps tick time to arclength and interpolates screen positions.

use serde::Serialize;

use super::{Particle, ParticleId, Point, RouteTable, SimulationState};

/// Minimum height of a squeezed particle.
const MIN_SQUEEZED_HEIGHT: f64 = 2.0;

/// Render-ready rectangle for one in-flight particle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sprite {
    pub id: ParticleId,
    pub route: usize,
    pub group: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Options for [`step_particles`].
#[derive(Debug, Clone, Copy)]
pub struct StepOptions {
    pub particle_size: f64,
    pub squeeze_on_arrival: bool,
    pub retain_arrived: bool,
}

/// Advance every live particle to `tick` and emit sprites for those in flight.
///
/// Position is `(tick - created_at) * speed`, recomputed from scratch, so
/// stepping the same tick twice yields the same sprites. Arrived particles
/// are kept, or reclaimed into the retired tally when `retain_arrived` is off.
pub fn step_particles(
    state: &mut SimulationState,
    routes: &RouteTable,
    options: StepOptions,
    tick: u64,
) -> Vec<Sprite> {
    let SimulationState {
        particles,
        cache,
        retired,
        ..
    } = state;

    let mut sprites = Vec::with_capacity(particles.len());
    let mut arrived_slots = Vec::new();

    for (slot, particle) in particles.iter_slots_mut() {
        particle.current_pos = particle.position_at(tick);
        if particle.is_arrived() {
            arrived_slots.push(slot);
            continue;
        }

        let Some(points) = routes
            .get(particle.route)
            .and_then(|r| cache.get(&r.geometry_key))
        else {
            continue;
        };

        let index = particle.current_pos.floor() as usize;
        let frac = particle.current_pos - index as f64;
        // `index` can exceed a cache rebuilt shorter than the spawn-time snapshot.
        let Some(p0) = points.get(index) else {
            continue;
        };
        // The last cached point has no successor; hold the particle there until it arrives.
        let p1 = points.get(index + 1).unwrap_or(p0);
        let position = p0.lerp(p1, frac);

        let last = points
            .get(particle.route_length.saturating_sub(1))
            .or_else(|| points.points().last().copied())
            .unwrap_or(position);
        sprites.push(sprite(particle, position, last, options));
    }

    if !options.retain_arrived {
        for slot in arrived_slots {
            if let Some(particle) = particles.remove(slot)
                && let Some(route) = routes.get(particle.route)
            {
                retired[routes.tally_slot(route.destination_index, particle.group)] += 1;
            }
        }
    }

    sprites
}

fn sprite(particle: &Particle, position: Point, last: Point, options: StepOptions) -> Sprite {
    let size = options.particle_size;
    let squeeze = if options.squeeze_on_arrival {
        (size - (last.x - position.x)).clamp(0.0, size)
    } else {
        0.0
    };
    let height = (size - squeeze).max(MIN_SQUEEZED_HEIGHT.min(size));
    let dy = (size - height) / 2.0;
    let dx = squeeze / 2.0;

    Sprite {
        id: particle.id,
        route: particle.route,
        group: particle.group,
        x: position.x - dx,
        y: position.y + particle.lateral_offset + dy,
        width: size + squeeze,
        height,
    }
}
