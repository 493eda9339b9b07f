//! Core types for the freefall workspace
//!
//! Includes:
//! - Units & conversions (grams, km/h)
//! - Drag regime selector and model parameters
//! - Body state and trajectory samples
//! - Simulation configuration & validation
//! - World presets (Earth, Moon, Water, Jupiter, ...)
//!
//! Sign convention used across every crate in the workspace:
//! velocity is positive **downward**, `height` is the remaining height above
//! the ground. A step lowers the height by `v * dt`; the ground is reached
//! when `height <= 0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::f64::{Mass, Velocity};
use uom::si::mass::{gram, kilogram};
use uom::si::velocity::{kilometer_per_hour, meter_per_second};

/// Fixed integration step [s]. Decoupled from the rendering frame rate.
pub const DEFAULT_DT: f64 = 0.01;
/// Record one history sample every N integration steps (0.1 s at `DEFAULT_DT`).
pub const DEFAULT_SAMPLE_STRIDE: u32 = 10;
/// Upper bound on recorded samples for a single fall.
pub const DEFAULT_MAX_SAMPLES: usize = 100_000;

/// Mass used by the lab experiment [kg] (70 g).
pub const EXPERIMENT_MASS_KG: f64 = 0.07;
/// Default drop height [m].
pub const DEFAULT_HEIGHT_M: f64 = 100.0;

/// -------------------------
/// Units & Conversions
/// -------------------------

/// UI mass inputs are in grams; the physics runs in kilograms.
pub fn grams_to_kg(g: f64) -> f64 { Mass::new::<gram>(g).get::<kilogram>() }
pub fn kg_to_grams(kg: f64) -> f64 { Mass::new::<kilogram>(kg).get::<gram>() }

pub fn mps_to_kmh(v: f64) -> f64 { Velocity::new::<meter_per_second>(v).get::<kilometer_per_hour>() }
pub fn kmh_to_mps(v: f64) -> f64 { Velocity::new::<kilometer_per_hour>(v).get::<meter_per_second>() }

/// -------------------------
/// Drag regime
/// -------------------------

/// Functional form of the resistance opposing the motion.
///
/// Text tags are parsed case-insensitively. Any tag that is not recognized
/// selects [`DragRegime::Linear`], so configs written for newer regimes still
/// load with the linear model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum DragRegime {
    /// Ideal fall, no drag term (coefficient ignored).
    None,
    /// Drag proportional to velocity.
    #[default]
    Linear,
    /// Drag proportional to velocity squared, sign-preserving.
    Quadratic,
}

impl DragRegime {
    pub const ALL: [DragRegime; 3] = [DragRegime::None, DragRegime::Linear, DragRegime::Quadratic];

    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "none" | "ideal" => DragRegime::None,
            "linear" => DragRegime::Linear,
            "quadratic" => DragRegime::Quadratic,
            other => {
                log::warn!("unknown drag regime {other:?}, using linear drag");
                DragRegime::Linear
            }
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            DragRegime::None => "none",
            DragRegime::Linear => "linear",
            DragRegime::Quadratic => "quadratic",
        }
    }

    pub fn has_drag(self) -> bool { !matches!(self, DragRegime::None) }
}

impl From<String> for DragRegime {
    fn from(tag: String) -> Self { DragRegime::from_tag(&tag) }
}

impl From<DragRegime> for &'static str {
    fn from(regime: DragRegime) -> Self { regime.tag() }
}

impl FromStr for DragRegime {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(DragRegime::from_tag(s)) }
}

impl fmt::Display for DragRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

/// -------------------------
/// Model parameters
/// -------------------------

/// Physical parameters of one falling body.
///
/// Invariants (checked by [`SimulationConfig::validate`], assumed everywhere
/// else): `mass > 0`, `gravity > 0`, `drag_coefficient >= 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub mass: f64,             // kg
    pub gravity: f64,          // m/s²
    pub drag_coefficient: f64, // kg/s (linear) or kg/m (quadratic)
    pub regime: DragRegime,
}

impl SimulationParameters {
    pub fn new(mass: f64, gravity: f64, drag_coefficient: f64, regime: DragRegime) -> Self {
        Self { mass, gravity, drag_coefficient, regime }
    }

    /// Drag-free parameters.
    pub fn ideal(mass: f64, gravity: f64) -> Self {
        Self::new(mass, gravity, 0.0, DragRegime::None)
    }

    /// Coefficient actually applied: zero when the regime has no drag term.
    pub fn effective_drag(&self) -> f64 {
        if self.regime.has_drag() { self.drag_coefficient } else { 0.0 }
    }

    /// `k / m`, the drag-per-mass factor shared by every drag formula.
    pub fn drag_per_mass(&self) -> f64 { self.effective_drag() / self.mass }

    /// Weight of the body [N].
    pub fn weight(&self) -> f64 { self.mass * self.gravity }
}

impl Default for SimulationParameters {
    fn default() -> Self { World::EarthAir.parameters(EXPERIMENT_MASS_KG) }
}

/// -------------------------
/// Body state & samples
/// -------------------------

/// Kinematic state of the body during one fall.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub velocity: f64, // m/s, positive = downward
    pub height: f64,   // m, remaining height above ground
    pub elapsed: f64,  // s
    pub falling: bool,
    pub landed: bool,
}

impl BodyState {
    /// Body waiting at the release point.
    pub fn at_rest(height: f64, velocity: f64) -> Self {
        Self { velocity, height, elapsed: 0.0, falling: false, landed: false }
    }

    /// Body just released: clock at zero and falling.
    pub fn released(height: f64, velocity: f64) -> Self {
        Self { falling: true, ..Self::at_rest(height, velocity) }
    }

    pub fn distance_fallen(&self, initial_height: f64) -> f64 {
        (initial_height - self.height).max(0.0)
    }

    pub fn sample(&self) -> TrajectorySample { TrajectorySample::new(self.elapsed, self.velocity) }
}

/// One recorded (time, velocity) point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time: f64,     // s
    pub velocity: f64, // m/s
}

impl TrajectorySample {
    pub fn new(time: f64, velocity: f64) -> Self { Self { time, velocity } }
}

/// -------------------------
/// Configuration
/// -------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("mass must be greater than zero (got {0} kg)")]
    NonPositiveMass(f64),
    #[error("drop height must be greater than zero (got {0} m)")]
    NonPositiveHeight(f64),
    #[error("gravity must be greater than zero (got {0} m/s²)")]
    NonPositiveGravity(f64),
    #[error("drag coefficient cannot be negative (got {0})")]
    NegativeDrag(f64),
    #[error("initial velocity must point downward (got {0} m/s)")]
    NegativeInitialVelocity(f64),
    #[error("time step must be greater than zero (got {0} s)")]
    NonPositiveStep(f64),
    #[error("sample stride must be at least one step")]
    ZeroSampleStride,
    #[error("history bound must allow at least two samples (got {0})")]
    HistoryTooSmall(usize),
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("unknown world {0:?}")]
    UnknownWorld(String),
    #[error("{input} is fixed for world {world}")]
    LockedInput { input: &'static str, world: World },
}

/// Everything needed to start a fall.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub params: SimulationParameters,
    pub initial_height: f64,   // m
    pub initial_velocity: f64, // m/s
    pub dt: f64,               // s
    pub sample_stride: u32,    // steps between history samples
    pub max_samples: usize,
    /// Experimental reference curve shown next to linear-drag results.
    pub fit: Option<ExponentialFit>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            params: SimulationParameters::default(),
            initial_height: DEFAULT_HEIGHT_M,
            initial_velocity: 0.0,
            dt: DEFAULT_DT,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            max_samples: DEFAULT_MAX_SAMPLES,
            fit: None,
        }
    }
}

impl SimulationConfig {
    pub fn new(params: SimulationParameters, initial_height: f64, initial_velocity: f64) -> Self {
        Self { params, initial_height, initial_velocity, ..Self::default() }
    }

    /// Config for a preset world with the given mass [kg], height [m] and v0 [m/s].
    pub fn for_world(world: World, mass: f64, initial_height: f64, initial_velocity: f64) -> Self {
        Self { fit: world.preset().fit, ..Self::new(world.parameters(mass), initial_height, initial_velocity) }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_sample_stride(mut self, stride: u32) -> Self {
        self.sample_stride = stride;
        self
    }

    /// Apply user edits on top of a preset, honoring which inputs the preset
    /// leaves editable. The regime can only change on [`World::Custom`].
    pub fn apply_overrides(&mut self, world: World, overrides: &Overrides) -> Result<(), ConfigError> {
        let preset = world.preset();
        if let Some(g) = overrides.gravity {
            if !preset.gravity_editable {
                return Err(ConfigError::LockedInput { input: "gravity", world });
            }
            self.params.gravity = g;
        }
        if let Some(k) = overrides.drag_coefficient {
            if !preset.drag_editable {
                return Err(ConfigError::LockedInput { input: "drag coefficient", world });
            }
            self.params.drag_coefficient = k;
        }
        if let Some(regime) = overrides.regime {
            if world != World::Custom {
                return Err(ConfigError::LockedInput { input: "drag regime", world });
            }
            self.params.regime = regime;
        }
        Ok(())
    }

    /// Reject configurations the numeric core cannot handle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.params;
        let finite = [
            ("mass", p.mass),
            ("gravity", p.gravity),
            ("drag coefficient", p.drag_coefficient),
            ("initial height", self.initial_height),
            ("initial velocity", self.initial_velocity),
            ("time step", self.dt),
        ];
        if let Some(&(name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }

        if p.mass <= 0.0 { return Err(ConfigError::NonPositiveMass(p.mass)); }
        if p.gravity <= 0.0 { return Err(ConfigError::NonPositiveGravity(p.gravity)); }
        if p.drag_coefficient < 0.0 { return Err(ConfigError::NegativeDrag(p.drag_coefficient)); }
        if self.initial_height <= 0.0 { return Err(ConfigError::NonPositiveHeight(self.initial_height)); }
        if self.initial_velocity < 0.0 {
            return Err(ConfigError::NegativeInitialVelocity(self.initial_velocity));
        }
        if self.dt <= 0.0 { return Err(ConfigError::NonPositiveStep(self.dt)); }
        if self.sample_stride == 0 { return Err(ConfigError::ZeroSampleStride); }
        if self.max_samples < 2 { return Err(ConfigError::HistoryTooSmall(self.max_samples)); }
        Ok(())
    }
}

/// Optional edits to a world preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub gravity: Option<f64>,
    pub drag_coefficient: Option<f64>,
    pub regime: Option<DragRegime>,
}

/// -------------------------
/// World presets
/// -------------------------

/// Exponential curve `v(t) = scale * (exp(rate * t) - 1)` fitted to the lab
/// measurements of the Earth-with-air experiment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    pub scale: f64, // m/s
    pub rate: f64,  // 1/s
}

impl ExponentialFit {
    pub const EXPERIMENT: ExponentialFit = ExponentialFit { scale: 45_780.0, rate: 214.285e-6 };
}

/// Scenarios offered by the front-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum World {
    EarthAir,
    EarthVacuum,
    Moon,
    Water,
    Jupiter,
    Custom,
}

/// Constants and UI hints attached to a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WorldPreset {
    pub world: World,
    pub gravity: f64,
    pub drag_coefficient: f64,
    pub regime: DragRegime,
    pub description: &'static str,
    pub gravity_editable: bool,
    pub drag_editable: bool,
    pub fit: Option<ExponentialFit>,
}

impl World {
    pub const ALL: [World; 6] = [
        World::EarthAir,
        World::EarthVacuum,
        World::Moon,
        World::Water,
        World::Jupiter,
        World::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            World::EarthAir => "earth-air",
            World::EarthVacuum => "earth-vacuum",
            World::Moon => "moon",
            World::Water => "water",
            World::Jupiter => "jupiter",
            World::Custom => "custom",
        }
    }

    pub fn preset(self) -> WorldPreset {
        let (gravity, drag_coefficient, regime, description) = match self {
            World::EarthAir => (9.81, 0.015, DragRegime::Linear, "Air resistance fitted to the lab measurements"),
            World::EarthVacuum => (9.81, 0.0, DragRegime::None, "Ideal model, no friction"),
            World::Moon => (1.62, 0.0, DragRegime::None, "Low gravity, no atmosphere"),
            World::Water => (9.81, 5.0, DragRegime::Linear, "High viscosity (linear model)"),
            World::Jupiter => (24.79, 0.1, DragRegime::Quadratic, "High gravity and drag (high speed)"),
            World::Custom => (9.81, 0.0, DragRegime::Linear, "Every variable set by hand"),
        };
        WorldPreset {
            world: self,
            gravity,
            drag_coefficient,
            regime,
            description,
            gravity_editable: self == World::Custom,
            drag_editable: matches!(self, World::Custom | World::EarthAir),
            fit: (self == World::EarthAir).then_some(ExponentialFit::EXPERIMENT),
        }
    }

    /// Preset constants applied to a body of `mass` kg.
    pub fn parameters(self, mass: f64) -> SimulationParameters {
        let p = self.preset();
        SimulationParameters::new(mass, p.gravity, p.drag_coefficient, p.regime)
    }
}

impl FromStr for World {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(char::is_ascii_alphanumeric).collect::<String>().to_ascii_lowercase();
        World::ALL
            .into_iter()
            .find(|w| w.name().replace('-', "") == key)
            .ok_or_else(|| ConfigError::UnknownWorld(s.to_string()))
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/* -------------------------------- tests -------------------------------- */
