//! freefall-models
//!
//! The differential-equation model of a falling body and its closed-form
//! reference solutions:
//!
//!   dv/dt = g                  (no drag)
//!   dv/dt = g - (k/m) v        (linear drag)
//!   dv/dt = g - (k/m) v |v|    (quadratic drag)
//!
//! Everything here is a pure function of its arguments. Non-finite inputs
//! propagate as NaN/Infinity; nothing panics. `mass > 0` is a precondition
//! owned by the configuration layer (`SimulationConfig::validate`).
//!
//! Exports:
//!   - `acceleration(v, params)`
//!   - `ideal_velocity`, `linear_drag_velocity`, `quadratic_drag_velocity`,
//!     `closed_form_velocity`
//!   - `terminal_velocity`, `check_terminal_guess`
//!   - `euler_step` (coarse first-order reference curve)
//!   - `fitted_velocity` (exponential fit of the lab experiment)

use freefall_core::{DragRegime, ExponentialFit, SimulationParameters};
use thiserror::Error;

/// Coarse step used by the Euler reference curve [s].
pub const EULER_DT: f64 = 0.1;

/// Relative tolerance accepted when checking a terminal-velocity guess.
pub const TERMINAL_GUESS_TOLERANCE: f64 = 0.05;

/* ------------------------------ acceleration ----------------------------- */

/// Instantaneous acceleration [m/s²] (positive = downward) at `velocity`.
///
/// This is the only place the drag regime is matched for the equation of
/// motion; the integrator just calls it.
#[inline]
pub fn acceleration(velocity: f64, params: &SimulationParameters) -> f64 {
    let g = params.gravity;
    match params.regime {
        DragRegime::None => g,
        DragRegime::Linear => g - params.drag_per_mass() * velocity,
        // v * |v| keeps the drag opposing the motion in either direction
        DragRegime::Quadratic => g - params.drag_per_mass() * velocity * velocity.abs(),
    }
}

/* --------------------------- closed-form v(t) ---------------------------- */

/// Drag-free fall: `v(t) = g t + v0`.
#[inline]
pub fn ideal_velocity(t: f64, gravity: f64, v0: f64) -> f64 {
    gravity * t + v0
}

/// Linear drag: `v(t) = Vt (1 - e^(-k t / m)) + v0 e^(-k t / m)` with
/// `Vt = m g / k`. Falls back to the drag-free formula when `k <= 0`.
pub fn linear_drag_velocity(t: f64, mass: f64, gravity: f64, k: f64, v0: f64) -> f64 {
    if k <= 0.0 {
        return ideal_velocity(t, gravity, v0);
    }
    let vt = mass * gravity / k;
    let x = -(k / mass) * t;
    // 1 - e^x without cancellation for small k t / m
    let approach = -x.exp_m1();
    vt * approach + v0 * x.exp()
}

/// Quadratic drag: `v(t) = Vt tanh(sqrt(g k / m) t + atanh(v0 / Vt))` with
/// `Vt = sqrt(m g / k)`. Falls back to the drag-free formula when `k <= 0`.
///
/// Bodies released faster than `Vt` slow down along
/// `Vt coth(sqrt(g k / m) t + acoth(v0 / Vt))`. Assumes downward motion (`v0 >= 0`).
pub fn quadratic_drag_velocity(t: f64, mass: f64, gravity: f64, k: f64, v0: f64) -> f64 {
    if k <= 0.0 {
        return ideal_velocity(t, gravity, v0);
    }
    let vt = (mass * gravity / k).sqrt();
    let lambda = (gravity * k / mass).sqrt();
    let ratio = v0 / vt;

    if ratio < 1.0 {
        vt * (lambda * t + ratio.atanh()).tanh()
    } else if ratio > 1.0 {
        vt / (lambda * t + ratio.recip().atanh()).tanh()
    } else {
        // exactly at Vt, or NaN passed through
        ratio * vt
    }
}

/// Closed-form velocity for the regime selected in `params`.
pub fn closed_form_velocity(t: f64, params: &SimulationParameters, v0: f64) -> f64 {
    let (m, g, k) = (params.mass, params.gravity, params.effective_drag());
    match params.regime {
        DragRegime::None => ideal_velocity(t, g, v0),
        DragRegime::Linear => linear_drag_velocity(t, m, g, k, v0),
        DragRegime::Quadratic => quadratic_drag_velocity(t, m, g, k, v0),
    }
}

/* --------------------------- terminal velocity --------------------------- */

/// Asymptotic velocity [m/s] the fall converges to. `f64::INFINITY` when the
/// regime has no drag or the coefficient is not positive.
pub fn terminal_velocity(params: &SimulationParameters) -> f64 {
    let k = params.effective_drag();
    if k <= 0.0 {
        return f64::INFINITY;
    }
    let mg = params.weight();
    match params.regime {
        DragRegime::None => f64::INFINITY,
        DragRegime::Linear => mg / k,
        DragRegime::Quadratic => (mg / k).sqrt(),
    }
}

/// Outcome of comparing a user guess with the analytical terminal velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminalVelocityCheck {
    pub correct: bool,
    pub guess: f64,
    /// Analytical terminal velocity (may be infinite).
    pub reference: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuessError {
    #[error("terminal velocity guess is not a number")]
    NotANumber,
}

/// Check `guess` against [`terminal_velocity`] within 5% relative error.
///
/// A zero reference is compared on absolute error. An infinite reference
/// (no drag) only accepts an infinite guess; a plain relative test would
/// give `NaN` there and reject every guess.
pub fn check_terminal_guess(guess: f64, params: &SimulationParameters) -> Result<TerminalVelocityCheck, GuessError> {
    if guess.is_nan() {
        return Err(GuessError::NotANumber);
    }
    let reference = terminal_velocity(params);
    let correct = if reference.is_infinite() {
        guess == reference
    } else {
        let scale = if reference == 0.0 { 1.0 } else { reference.abs() };
        (guess - reference).abs() / scale < TERMINAL_GUESS_TOLERANCE
    };
    Ok(TerminalVelocityCheck { correct, guess, reference })
}

/* --------------------------- reference curves ---------------------------- */

/// One explicit Euler step of the linear-drag equation:
/// `v + (g - (k/m) v) dt`. Used only as a coarse comparison curve.
#[inline]
pub fn euler_step(v: f64, params: &SimulationParameters, dt: f64) -> f64 {
    v + (params.gravity - params.drag_per_mass() * v) * dt
}

/// Experimental exponential fit `scale (e^(rate t) - 1)`.
#[inline]
pub fn fitted_velocity(t: f64, fit: &ExponentialFit) -> f64 {
    fit.scale * (fit.rate * t).exp_m1()
}

/* -------------------------------- tests -------------------------------- */
