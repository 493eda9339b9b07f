//! freefall-sim
//!
//! Fixed-step free-fall simulation with RK4 integration.
//! - Acceleration comes from `freefall_models::acceleration` (drag regime
//!   dispatched there, once).
//! - One RK4 step per logical tick; `dt` is a configuration constant, not
//!   wall-clock frame time.
//! - A sample is recorded every `sample_stride` steps (integer step counter)
//!   and the landing sample is always appended.
//! - Reports compare the recorded velocity with closed-form references.
//!
//! Conventions:
//! - Velocity positive downward.
//! - `height` is the remaining height above ground: `height -= v_new * dt`.
//!   The body lands when `height <= 0`; height is then clamped to 0.
//!
//! `Simulation` owns all mutable state, so independent runs never share data.

pub mod history;
pub mod series;

use freefall_core::{BodyState, ConfigError, SimulationConfig, SimulationParameters};
use freefall_models::{acceleration, check_terminal_guess, terminal_velocity, GuessError, TerminalVelocityCheck};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use history::TrajectoryHistory;
pub use series::{default_horizon, generate_comparative_series, ComparativeSeries, CurveKind, ReferenceCurve, SeriesSource};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Guess(#[from] GuessError),
    #[error("body still airborne after {ticks} ticks ({height:.3} m left)")]
    DidNotLand { ticks: u64, height: f64 },
}

/* ------------------------------- integrator ------------------------------ */

/// One classical RK4 step of `dv/dt = a(v)`.
#[inline]
pub fn rk4_velocity(v: f64, params: &SimulationParameters, dt: f64) -> f64 {
    let k1 = acceleration(v, params);
    let k2 = acceleration(v + 0.5 * dt * k1, params);
    let k3 = acceleration(v + 0.5 * dt * k2, params);
    let k4 = acceleration(v + dt * k3, params);
    v + dt / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
}

/// Advance a falling body by one step of `dt` seconds.
///
/// Height drops by the *new* velocity times `dt`. States that are not
/// falling are returned unchanged. Ground handling (clamping, landed flag)
/// belongs to the caller, see [`Simulation::tick`].
pub fn advance(state: BodyState, params: &SimulationParameters, dt: f64) -> BodyState {
    if !state.falling {
        return state;
    }
    let velocity = rk4_velocity(state.velocity, params, dt);
    BodyState {
        velocity,
        height: state.height - velocity * dt,
        elapsed: state.elapsed + dt,
        ..state
    }
}

/* ------------------------------- simulation ------------------------------ */

/// What a call to [`Simulation::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickOutcome {
    /// Nothing to integrate (not released yet, or already on the ground).
    Idle,
    /// Stepped; still airborne.
    Falling,
    /// Stepped and reached the ground on this tick.
    Landed,
}

/// Summary of a completed fall.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallSummary {
    pub ticks: u64,
    pub elapsed: f64,         // s
    pub impact_velocity: f64, // m/s
    pub samples: usize,
}

/// One simulation run: configuration, body state and trajectory history.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimulationConfig,
    state: BodyState,
    history: TrajectoryHistory,
    steps: u64,
}

impl Simulation {
    /// Validate `config` and place the body at the release point.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            state: BodyState::at_rest(config.initial_height, config.initial_velocity),
            history: TrajectoryHistory::new(config.max_samples),
            steps: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig { &self.config }
    pub fn params(&self) -> &SimulationParameters { &self.config.params }
    pub fn state(&self) -> &BodyState { &self.state }
    pub fn history(&self) -> &TrajectoryHistory { &self.history }
    /// Integration steps taken in the current fall.
    pub fn steps(&self) -> u64 { self.steps }
    pub fn is_falling(&self) -> bool { self.state.falling }

    /// Release the body: reset state and history, record the `t = 0` sample.
    ///
    /// Returns `false` (and changes nothing) while a fall is in progress.
    pub fn start_fall(&mut self) -> bool {
        if self.state.falling {
            log::warn!("start_fall ignored: a fall is already in progress");
            return false;
        }
        let c = &self.config;
        self.state = BodyState::released(c.initial_height, c.initial_velocity);
        self.steps = 0;
        self.history.clear();
        self.history.record(self.state.sample());
        log::info!(
            "fall started: h0={} m v0={} m/s regime={} k={} m={} kg g={} m/s²",
            c.initial_height, c.initial_velocity, c.params.regime, c.params.drag_coefficient,
            c.params.mass, c.params.gravity,
        );
        true
    }

    /// Back to the idle state at the release point, history cleared.
    pub fn reset(&mut self) {
        self.state = BodyState::at_rest(self.config.initial_height, self.config.initial_velocity);
        self.steps = 0;
        self.history.clear();
    }

    /// One logical tick: a single RK4 step while the body is airborne.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.falling {
            return TickOutcome::Idle;
        }

        self.state = advance(self.state, &self.config.params, self.config.dt);
        self.steps += 1;

        if self.steps % u64::from(self.config.sample_stride) == 0 {
            let sample = self.state.sample();
            if self.history.record(sample) {
                log::debug!("t={:.2} s v={:.4} m/s h={:.3} m", sample.time, sample.velocity, self.state.height);
            }
        }

        if self.state.height <= 0.0 {
            self.land();
            return TickOutcome::Landed;
        }
        TickOutcome::Falling
    }

    fn land(&mut self) {
        self.state.height = 0.0;
        self.state.falling = false;
        self.state.landed = true;
        self.history.ensure_final(self.state.sample());
        log::info!(
            "landed after {:.4} s ({} steps) at {:.4} m/s",
            self.state.elapsed, self.steps, self.state.velocity,
        );
    }

    /// Release the body (unless already falling) and tick until it lands.
    ///
    /// Fails with [`SimError::DidNotLand`] after `max_ticks` ticks.
    pub fn run_until_landed(&mut self, max_ticks: u64) -> Result<FallSummary, SimError> {
        if !self.state.falling {
            self.start_fall();
        }
        let mut ticks = 0;
        while ticks < max_ticks {
            ticks += 1;
            if self.tick() == TickOutcome::Landed {
                return Ok(FallSummary {
                    ticks,
                    elapsed: self.state.elapsed,
                    impact_velocity: self.state.velocity,
                    samples: self.history.len(),
                });
            }
        }
        Err(SimError::DidNotLand { ticks, height: self.state.height })
    }

    /// Comparison series over [`default_horizon`] of the last fall.
    ///
    /// Meant for a finished fall; calling it mid-fall reports the partial
    /// history.
    pub fn report(&self) -> ComparativeSeries {
        if self.state.falling {
            log::warn!("report requested while the body is still falling");
        }
        self.report_with_horizon(default_horizon(self.state.elapsed))
    }

    pub fn report_with_horizon(&self, horizon: f64) -> ComparativeSeries {
        generate_comparative_series(
            self.history.samples(),
            &self.config.params,
            self.config.initial_velocity,
            horizon,
            self.config.fit.as_ref(),
        )
    }

    pub fn terminal_velocity(&self) -> f64 { terminal_velocity(&self.config.params) }

    pub fn check_terminal_guess(&self, guess: f64) -> Result<TerminalVelocityCheck, SimError> {
        Ok(check_terminal_guess(guess, &self.config.params)?)
    }
}

/* ----------------------------------- tests ---------------------------------- */
