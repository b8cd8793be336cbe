//! Flow engine - owns the simulation state and runs one tick per `advance` call.

use log::{info, warn};
use serde::Serialize;

use super::{
    Counter, Curve, FlowRng, GeometryCache, Hierarchy, HierarchyKind, Layout, LayoutResult,
    ParticleStore, RouteTable, SpawnScales, Sprite, StepOptions, spawn_particles, step_particles,
    tally_arrivals,
};
use crate::schema::{ConfigError, Dataset, DatasetError, DatasetShape, EngineConfig};

/// Engine errors. Per-tick out-of-bounds lookups are arrivals, never errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No route from the root reaches a terminal with a positive count")]
    EmptyGraph,
    #[error("Geometry cache has no entry for route '{key}'; build geometry before advancing")]
    CacheNotReady { key: String },
    #[error("Route index {0} out of range")]
    UnknownRoute(usize),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Mutable simulation state, owned by the engine and passed to each stage.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Live particle set.
    pub particles: ParticleStore,
    /// Sampled route geometry, replaced wholesale on relayout.
    pub cache: GeometryCache,
    /// Arrivals folded out of reclaimed slots, indexed by `RouteTable::tally_slot`.
    pub retired: Vec<u64>,
}

impl SimulationState {
    /// Empty state sized for `routes`.
    pub fn new(routes: &RouteTable) -> Self {
        Self {
            particles: ParticleStore::new(),
            cache: GeometryCache::new(),
            retired: vec![0; routes.destinations().len() * routes.groups().len()],
        }
    }
}

/// Everything the renderer needs for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub tick: u64,
    /// Particles spawned during this tick.
    pub spawned: usize,
    /// In-flight particles.
    pub sprites: Vec<Sprite>,
    /// Arrival counters per destination and group.
    pub counters: Vec<Counter>,
}

/// Particle flow engine.
pub struct FlowEngine {
    config: EngineConfig,
    hierarchy: Hierarchy,
    routes: RouteTable,
    state: SimulationState,
    scales: SpawnScales,
    rng: FlowRng,
    population_cap: usize,
}

impl FlowEngine {
    /// Create an engine for a parsed dataset. Geometry must be built before advancing.
    pub fn new(dataset: &Dataset, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let hierarchy = Hierarchy::flatten(dataset);
        let routes = RouteTable::enumerate(&hierarchy)?;
        let population_cap = config
            .population_cap
            .unwrap_or_else(|| routes.total_count().round() as usize);

        for group in routes.groups() {
            if !config.palette.contains_key(group) {
                warn!("Group '{group}' has no palette color");
            }
        }
        info!(
            "Flow engine ready: {} routes, population cap {}",
            routes.len(),
            population_cap
        );

        Ok(Self {
            scales: SpawnScales::from_config(&config),
            rng: FlowRng::from_seed_option(config.random_seed),
            state: SimulationState::new(&routes),
            config,
            hierarchy,
            routes,
            population_cap,
        })
    }

    /// Parse a dataset JSON string of the given shape and create an engine.
    pub fn from_json_str(
        json: &str,
        shape: &DatasetShape,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        shape.validate()?;
        let dataset = Dataset::from_json_str(json, shape, config.max_depth)?;
        Self::new(&dataset, config)
    }

    /// Sample route curves into the geometry cache, replacing any previous cache.
    ///
    /// Takes `&mut self`, so no tick can observe a partially rebuilt cache.
    pub fn build_geometry<C: Curve>(&mut self, curves: &[(String, C)]) {
        let cache = GeometryCache::build(curves);
        let route_keys = self.routes.geometry_keys();
        for key in &route_keys {
            if !cache.contains(key) {
                warn!("No curve supplied for route '{key}'");
            }
        }
        for key in cache.keys().filter(|k| !route_keys.contains(k)) {
            warn!("Curve '{key}' does not match any route");
        }
        let rebuilt = !self.state.cache.is_empty();
        self.state.cache.replace(cache);
        if rebuilt {
            info!("Geometry cache rebuilt");
        }
    }

    /// Run a layout pass and build geometry from its curves.
    ///
    /// Lateral offsets are re-derived from the layout's band so particles
    /// stay inside it; `offset_range` only applies to `build_geometry`.
    pub fn apply_layout(&mut self, layout: &dyn Layout) -> LayoutResult {
        let result = layout.layout(&self.hierarchy, &self.routes);
        let (min, max) = band_offset_range(
            self.hierarchy.kind,
            result.band_half_height,
            self.config.particle_size,
        );
        self.scales = self.scales.with_offset_range(min, max);
        self.build_geometry(&result.curves);
        result
    }

    /// True once every route has cached geometry.
    pub fn is_ready(&self) -> bool {
        self.routes
            .geometry_keys()
            .into_iter()
            .all(|k| self.state.cache.contains(k))
    }

    /// Run one tick: spawn, step, tally.
    pub fn advance(&mut self, tick: u64) -> Result<Frame, EngineError> {
        let spawned = spawn_particles(
            &mut self.state,
            &self.routes,
            &self.scales,
            self.config.density,
            self.population_cap,
            &mut self.rng,
            tick,
        )?;
        let options = self.step_options();
        let sprites = step_particles(&mut self.state, &self.routes, options, tick);
        let counters = tally_arrivals(&self.state, &self.routes, self.population_cap as f64);

        Ok(Frame {
            tick,
            spawned,
            sprites,
            counters,
        })
    }

    /// Re-step the live set at `tick` without spawning.
    pub fn step_only(&mut self, tick: u64) -> Vec<Sprite> {
        let options = self.step_options();
        step_particles(&mut self.state, &self.routes, options, tick)
    }

    /// Current arrival counters.
    pub fn counters(&self) -> Vec<Counter> {
        tally_arrivals(&self.state, &self.routes, self.population_cap as f64)
    }

    fn step_options(&self) -> StepOptions {
        StepOptions {
            particle_size: self.config.particle_size,
            // Squeeze applies to nested routes only.
            squeeze_on_arrival: self.config.squeeze_on_arrival
                && self.hierarchy.kind == HierarchyKind::Nested,
            retain_arrived: self.config.retain_arrived,
        }
    }

    /// Palette color for a group index.
    pub fn group_color(&self, group: usize) -> Option<&str> {
        let key = self.routes.groups().get(group)?;
        self.config.palette.get(key).map(String::as_str)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current spawn scales.
    pub fn scales(&self) -> &SpawnScales {
        &self.scales
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Live population bound; also the denominator of counter percentages.
    pub fn population_cap(&self) -> usize {
        self.population_cap
    }

    /// True when the population is full and nothing is left in flight.
    pub fn is_finished(&self) -> bool {
        self.state.particles.len() >= self.population_cap
            && self.state.particles.iter().all(|p| p.is_arrived())
    }
}

/// Lateral offset interval for a band of half height `half`.
///
/// Nested bands center the particle on the route; flat bands keep the whole
/// particle inside `[-half, half]`.
pub fn band_offset_range(kind: HierarchyKind, half: f64, particle_size: f64) -> (f64, f64) {
    let (min, max) = match kind {
        HierarchyKind::Nested => (-half - particle_size / 2.0, half - particle_size / 2.0),
        HierarchyKind::Flat => (-half, half - particle_size),
    };
    (min, max.max(min))
}
