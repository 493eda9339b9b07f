// crates/freefall-ffi-wasm/src/lib.rs
//
// WASM bindings: world presets, tick-driven simulation, chart report and
// terminal-velocity check for the browser front-end.

use wasm_bindgen::prelude::*;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen as swb;

// --- our crates ---
use freefall_core::{
    grams_to_kg, BodyState, DragRegime, Overrides, SimulationConfig, SimulationParameters, World,
};
use freefall_models::terminal_velocity;
use freefall_sim::{ComparativeSeries, Simulation, TickOutcome};

// Better panic messages in browser console
#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/* --------------------------- Shared DTOs (JS) --------------------------- */

/// Values read from the configuration screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsSetup {
    /// Preset name, e.g. "earth-air"
    pub world: String,
    pub mass_g: f64,
    pub height_m: f64,
    #[serde(default)]
    pub v0_ms: f64,
    #[serde(default)]
    pub gravity: Option<f64>,
    #[serde(default)]
    pub drag_coefficient: Option<f64>,
    /// "none" | "linear" | "quadratic" (unknown -> linear)
    #[serde(default)]
    pub regime: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsWorld {
    pub name: String,
    pub gravity: f64,
    pub drag_coefficient: f64,
    pub regime: String,
    pub description: String,
    pub gravity_editable: bool,
    pub drag_editable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JsBodyState {
    pub velocity_ms: f64,
    pub height_m: f64,
    pub distance_fallen_m: f64,
    pub elapsed_s: f64,
    pub weight_n: f64,
    pub falling: bool,
    pub landed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsCurveLegend {
    pub tag: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsReport {
    pub labels: Vec<String>,
    pub legends: Vec<JsCurveLegend>,
    pub series: ComparativeSeries,
}

/// Turn the configuration screen values into a validated config.
pub fn config_from_setup(setup: &JsSetup) -> Result<SimulationConfig, String> {
    let world: World = setup.world.parse().map_err(|e: freefall_core::ConfigError| e.to_string())?;
    let mut config = SimulationConfig::for_world(world, grams_to_kg(setup.mass_g), setup.height_m, setup.v0_ms);
    let overrides = Overrides {
        gravity: setup.gravity,
        drag_coefficient: setup.drag_coefficient,
        regime: setup.regime.as_deref().map(DragRegime::from_tag),
    };
    config.apply_overrides(world, &overrides).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn body_state_dto(state: &BodyState, config: &SimulationConfig) -> JsBodyState {
    JsBodyState {
        velocity_ms: state.velocity,
        height_m: state.height,
        distance_fallen_m: state.distance_fallen(config.initial_height),
        elapsed_s: state.elapsed,
        weight_n: config.params.weight(),
        falling: state.falling,
        landed: state.landed,
    }
}

fn report_dto(series: ComparativeSeries) -> JsReport {
    let legends = series
        .references
        .iter()
        .map(|c| JsCurveLegend { tag: c.kind.tag(), label: c.kind.label() })
        .collect();
    JsReport { labels: series.labels(), legends, series }
}

fn world_dto(world: World) -> JsWorld {
    let p = world.preset();
    JsWorld {
        name: world.name().to_string(),
        gravity: p.gravity,
        drag_coefficient: p.drag_coefficient,
        regime: p.regime.tag().to_string(),
        description: p.description.to_string(),
        gravity_editable: p.gravity_editable,
        drag_editable: p.drag_editable,
    }
}

/* ------------------------------ Exports -------------------------------- */

#[wasm_bindgen]
pub fn list_worlds() -> Result<JsValue, JsValue> {
    let worlds: Vec<JsWorld> = World::ALL.into_iter().map(world_dto).collect();
    swb::to_value(&worlds).map_err(|e| e.into())
}

/// Analytical terminal velocity for `{ mass, gravity, drag_coefficient, regime }`.
#[wasm_bindgen]
pub fn terminal_velocity_js(params: JsValue) -> Result<f64, JsValue> {
    let params: SimulationParameters = swb::from_value(params)?;
    Ok(terminal_velocity(&params))
}

/// One simulation owned by the page; drive it with `tick()` from
/// `requestAnimationFrame`.
#[wasm_bindgen]
pub struct WasmSimulation {
    inner: Simulation,
}

#[wasm_bindgen]
impl WasmSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(setup: JsValue) -> Result<WasmSimulation, JsValue> {
        let setup: JsSetup = swb::from_value(setup)?;
        let config = config_from_setup(&setup).map_err(js_err)?;
        let inner = Simulation::new(config).map_err(js_err)?;
        Ok(WasmSimulation { inner })
    }

    /// Release the body. `false` while a fall is already running.
    pub fn start_fall(&mut self) -> bool {
        self.inner.start_fall()
    }

    /// Advance one fixed step. Returns "idle", "falling" or "landed".
    pub fn tick(&mut self) -> String {
        match self.inner.tick() {
            TickOutcome::Idle => "idle",
            TickOutcome::Falling => "falling",
            TickOutcome::Landed => "landed",
        }
        .to_string()
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn is_falling(&self) -> bool {
        self.inner.is_falling()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        let dto = body_state_dto(self.inner.state(), self.inner.config());
        swb::to_value(&dto).map_err(|e| e.into())
    }

    /// Chart data. Refused while the body is still falling.
    pub fn report(&self) -> Result<JsValue, JsValue> {
        if self.inner.is_falling() {
            return Err(JsValue::from_str("the fall must finish before showing the chart"));
        }
        swb::to_value(&report_dto(self.inner.report())).map_err(|e| e.into())
    }

    pub fn terminal_velocity(&self) -> f64 {
        self.inner.terminal_velocity()
    }

    /// `{ correct, guess, reference }` for a user guess [m/s].
    pub fn check_terminal_guess(&self, guess: f64) -> Result<JsValue, JsValue> {
        let check = self.inner.check_terminal_guess(guess).map_err(js_err)?;
        swb::to_value(&check).map_err(|e| e.into())
    }
}

/* -------------------------------- tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(world: &str) -> JsSetup {
        JsSetup {
            world: world.to_string(),
            mass_g: 100.0,
            height_m: 50.0,
            v0_ms: 0.0,
            gravity: None,
            drag_coefficient: None,
            regime: None,
        }
    }

    #[test]
    fn setup_maps_to_config() {
        let cfg = config_from_setup(&setup("jupiter")).unwrap();
        assert!((cfg.params.mass - 0.1).abs() < 1e-12);
        assert_eq!(cfg.params.regime, DragRegime::Quadratic);
        assert_eq!(cfg.initial_height, 50.0);
    }

    #[test]
    fn setup_rejects_locked_and_invalid_inputs() {
        let mut s = setup("moon");
        s.gravity = Some(9.81);
        assert!(config_from_setup(&s).unwrap_err().contains("gravity"));

        let mut s = setup("custom");
        s.height_m = 0.0;
        assert!(config_from_setup(&s).is_err());

        assert!(config_from_setup(&setup("pluto")).is_err());
    }

    #[test]
    fn custom_regime_tag_falls_back_to_linear() {
        let mut s = setup("custom");
        s.regime = Some("turbulent".to_string());
        s.drag_coefficient = Some(0.05);
        let cfg = config_from_setup(&s).unwrap();
        assert_eq!(cfg.params.regime, DragRegime::Linear);
    }

    #[test]
    fn state_and_report_dtos() {
        let mut sim = Simulation::new(config_from_setup(&setup("earth-air")).unwrap()).unwrap();
        sim.run_until_landed(1_000_000).unwrap();

        let dto = body_state_dto(sim.state(), sim.config());
        assert!(dto.landed && !dto.falling);
        assert_eq!(dto.height_m, 0.0);
        assert_eq!(dto.distance_fallen_m, 50.0);

        let report = report_dto(sim.report());
        assert_eq!(report.labels.len(), report.series.len());
        assert_eq!(report.legends.len(), report.series.references.len());
        assert_eq!(report.legends[0].tag, "ideal");
    }

    #[test]
    fn worlds_listed() {
        let w = world_dto(World::Water);
        assert_eq!(w.name, "water");
        assert_eq!(w.regime, "linear");
        assert!(!w.gravity_editable);
    }
}
