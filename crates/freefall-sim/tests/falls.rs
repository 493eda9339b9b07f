// End-to-end falls: drive the simulation tick by tick and compare against the
// closed-form references.

use approx::assert_relative_eq;
use freefall_core::{DragRegime, SimulationConfig, SimulationParameters, TrajectorySample, World};
use freefall_models::{closed_form_velocity, terminal_velocity};
use freefall_sim::{ComparativeSeries, CurveKind, SeriesSource, Simulation, TickOutcome};

const MAX_TICKS: u64 = 10_000_000;

fn sim(mass: f64, gravity: f64, k: f64, regime: DragRegime, height: f64, v0: f64) -> Simulation {
    let params = SimulationParameters::new(mass, gravity, k, regime);
    Simulation::new(SimulationConfig::new(params, height, v0)).expect("valid config")
}

#[test]
fn vacuum_fall_after_one_second() {
    // m = 0.1 kg, g = 9.8, k = 0, dt = 0.01: 100 ticks -> v = 9.8
    let mut s = sim(0.1, 9.8, 0.0, DragRegime::None, 100.0, 0.0);
    s.start_fall();
    for _ in 0..100 {
        assert_eq!(s.tick(), TickOutcome::Falling);
    }
    assert_relative_eq!(s.state().velocity, 9.8, max_relative = 1e-6);
    assert_relative_eq!(s.state().elapsed, 1.0, max_relative = 1e-9);
}

#[test]
fn zero_drag_matches_ideal_in_every_regime() {
    for regime in DragRegime::ALL {
        let mut s = sim(0.1, 9.8, 0.0, regime, 100.0, 3.0);
        s.start_fall();
        for _ in 0..100 {
            s.tick();
        }
        assert_relative_eq!(s.state().velocity, 9.8 * s.state().elapsed + 3.0, max_relative = 1e-6);
    }
}

#[test]
fn linear_drag_converges_to_terminal_velocity() {
    let mut s = sim(0.1, 9.8, 0.05, DragRegime::Linear, 500.0, 0.0);
    assert_relative_eq!(s.terminal_velocity(), 19.6, max_relative = 1e-12);

    let summary = s.run_until_landed(MAX_TICKS).unwrap();
    assert_relative_eq!(summary.impact_velocity, 19.6, max_relative = 0.05);
    assert!(s.check_terminal_guess(summary.impact_velocity).unwrap().correct);
}

#[test]
fn quadratic_drag_converges_to_terminal_velocity() {
    let mut s = sim(0.1, 24.79, 0.1, DragRegime::Quadratic, 500.0, 0.0);
    let vt = s.terminal_velocity();
    assert_relative_eq!(vt, 4.979, max_relative = 1e-3);

    let summary = s.run_until_landed(MAX_TICKS).unwrap();
    assert_relative_eq!(summary.impact_velocity, vt, max_relative = 0.05);
}

#[test]
fn drag_falls_are_monotonic_and_bounded() {
    for world in [World::EarthAir, World::Water, World::Jupiter] {
        let mut s = Simulation::new(SimulationConfig::for_world(world, 0.1, 200.0, 0.0)).unwrap();
        s.start_fall();
        let vt = s.terminal_velocity();
        let mut prev = s.state().velocity;
        while s.tick() != TickOutcome::Landed {
            let v = s.state().velocity;
            assert!(v >= prev - 1e-12, "{world}: velocity dropped from {prev} to {v}");
            assert!(v <= vt * (1.0 + 1e-9), "{world}: {v} above terminal {vt}");
            prev = v;
        }
    }
}

#[test]
fn rk4_tracks_closed_form() {
    for regime in [DragRegime::Linear, DragRegime::Quadratic] {
        let mut s = sim(0.1, 9.8, 0.05, regime, 300.0, 0.0);
        s.run_until_landed(MAX_TICKS).unwrap();
        for sample in s.history().samples() {
            let exact = closed_form_velocity(sample.time, s.params(), 0.0);
            assert_relative_eq!(sample.velocity, exact, epsilon = 1e-6, max_relative = 1e-6);
        }
    }
}

#[test]
fn history_round_trips_through_series() {
    let mut s = sim(0.1, 9.8, 0.05, DragRegime::Linear, 50.0, 0.0);
    s.run_until_landed(MAX_TICKS).unwrap();
    let history: Vec<TrajectorySample> = s.history().samples().to_vec();

    let report = s.report();
    assert_eq!(report.source, SeriesSource::Recorded);
    assert_eq!(report.recorded_samples(), history);

    let json = serde_json::to_string(&report).unwrap();
    let back: ComparativeSeries = serde_json::from_str(&json).unwrap();
    assert_eq!(back.recorded_samples(), history);
    assert_eq!(back, report);
}

#[test]
fn landing_sample_is_last_even_off_cadence() {
    let mut s = sim(0.1, 9.8, 0.0, DragRegime::None, 7.0, 0.0);
    s.run_until_landed(MAX_TICKS).unwrap();
    let samples = s.history().samples();
    let last = samples.last().unwrap();
    assert_eq!(last.time, s.state().elapsed);
    // strictly increasing, no duplicate landing entry
    assert!(samples.windows(2).all(|w| w[0].time < w[1].time));
}

#[test]
fn preview_before_first_fall() {
    let s = sim(0.1, 9.8, 0.05, DragRegime::Linear, 50.0, 0.0);
    let report = s.report();
    assert_eq!(report.source, SeriesSource::Synthesized);
    assert_eq!(report.len(), 101);
    let euler = report.reference(CurveKind::Euler).unwrap();
    // the coarse Euler curve runs ahead of the exact solution early on and ends near Vt
    assert!(euler.values[5] > report.numeric[5]);
    assert_relative_eq!(*euler.values.last().unwrap(), terminal_velocity(s.params()), max_relative = 0.02);
}

#[test]
fn independent_runs_do_not_interfere() {
    let mut a = sim(0.1, 9.8, 0.05, DragRegime::Linear, 30.0, 0.0);
    let mut b = sim(0.1, 24.79, 0.1, DragRegime::Quadratic, 30.0, 0.0);
    let mut solo = a.clone();

    a.start_fall();
    b.start_fall();
    while a.is_falling() || b.is_falling() {
        a.tick();
        b.tick();
    }
    solo.run_until_landed(MAX_TICKS).unwrap();
    assert_eq!(a.history(), solo.history());
    assert_eq!(a.state(), solo.state());
}
