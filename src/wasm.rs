//! WebAssembly bindings for the particle flow engine.
//!
//! Provides a thin wrapper around `FlowEngine` for browser environments. The
//! page owns the animation loop and calls `advance` once per frame.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    compute::{FlowEngine, HierarchyKind, LayoutResult, NodeBox, default_layout},
    schema::{DatasetShape, EngineConfig, LayoutConfig},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

/// WebAssembly wrapper for the flow engine and its layout.
#[wasm_bindgen]
pub struct WasmFlowEngine {
    engine: FlowEngine,
    layout: LayoutResult,
}

#[wasm_bindgen]
impl WasmFlowEngine {
    /// Create an engine from JSON inputs and lay it out for `width`.
    ///
    /// # Arguments
    /// * `dataset_json` - JSON dataset
    /// * `config_json` - JSON string containing EngineConfig, empty for the shape's defaults
    /// * `shape_json` - JSON string containing DatasetShape, empty for nested
    /// * `width` - Canvas width in CSS pixels
    #[wasm_bindgen(constructor)]
    pub fn new(
        dataset_json: &str,
        config_json: &str,
        shape_json: &str,
        width: f64,
    ) -> Result<WasmFlowEngine, JsValue> {
        let shape: DatasetShape = parse_or_default(shape_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid shape JSON: {e}")))?;
        let config: EngineConfig = if config_json.trim().is_empty() {
            EngineConfig::for_shape(&shape)
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {e}")))?
        };

        let mut engine = FlowEngine::from_json_str(dataset_json, &shape, config)
            .map_err(|e| JsValue::from_str(&format!("Engine error: {e}")))?;
        let layout = relayout(&mut engine, width)?;

        Ok(WasmFlowEngine { engine, layout })
    }

    /// Run one tick and return the frame as a JS object.
    #[wasm_bindgen]
    pub fn advance(&mut self, tick: u64) -> Result<JsValue, JsValue> {
        let frame = self
            .engine
            .advance(tick)
            .map_err(|e| JsValue::from_str(&format!("Engine error: {e}")))?;
        serde_wasm_bindgen::to_value(&frame)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    /// Re-run layout for a new canvas width and rebuild the geometry cache.
    #[wasm_bindgen]
    pub fn resize(&mut self, width: f64) -> Result<(), JsValue> {
        self.layout = relayout(&mut self.engine, width)?;
        Ok(())
    }

    /// Route curves as SVG path data, keyed by geometry key.
    #[wasm_bindgen(js_name = getRoutePaths)]
    pub fn get_route_paths(&self) -> Result<JsValue, JsValue> {
        let paths: Vec<RoutePath<'_>> = self
            .layout
            .curves
            .iter()
            .map(|(key, curve)| RoutePath {
                key,
                d: curve.to_svg(),
            })
            .collect();
        serde_wasm_bindgen::to_value(&paths)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    /// Node boxes and canvas size from the last layout pass.
    #[wasm_bindgen(js_name = getLayout)]
    pub fn get_layout(&self) -> Result<JsValue, JsValue> {
        let snapshot = LayoutSnapshot {
            width: self.layout.width,
            height: self.layout.height,
            boxes: &self.layout.boxes,
        };
        serde_wasm_bindgen::to_value(&snapshot)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    /// Current arrival counters.
    #[wasm_bindgen(js_name = getCounters)]
    pub fn get_counters(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.engine.counters())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }

    /// Palette color for a group index.
    #[wasm_bindgen(js_name = groupColor)]
    pub fn group_color(&self, group: usize) -> Option<String> {
        self.engine.group_color(group).map(str::to_string)
    }

    /// Get live particle count.
    #[wasm_bindgen(js_name = totalParticles)]
    pub fn total_particles(&self) -> usize {
        self.engine.state().particles.len()
    }

    /// Get the population cap.
    #[wasm_bindgen(js_name = populationCap)]
    pub fn population_cap(&self) -> usize {
        self.engine.population_cap()
    }
}

fn parse_or_default<T: Default + serde::de::DeserializeOwned>(
    json: &str,
) -> Result<T, serde_json::Error> {
    if json.trim().is_empty() {
        Ok(T::default())
    } else {
        serde_json::from_str(json)
    }
}

fn relayout(engine: &mut FlowEngine, width: f64) -> Result<LayoutResult, JsValue> {
    let kind = engine.hierarchy().kind;
    let config = match kind {
        HierarchyKind::Nested => LayoutConfig::nested(width),
        HierarchyKind::Flat => LayoutConfig::flat(width),
    };
    config
        .validate()
        .map_err(|e| JsValue::from_str(&format!("Invalid layout: {e}")))?;
    Ok(engine.apply_layout(default_layout(kind, config).as_ref()))
}

#[derive(Serialize)]
struct RoutePath<'a> {
    key: &'a str,
    d: String,
}

#[derive(Serialize)]
struct LayoutSnapshot<'a> {
    width: f64,
    height: f64,
    boxes: &'a [NodeBox],
}
