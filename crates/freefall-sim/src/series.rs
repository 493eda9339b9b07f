//! Comparative series for the velocity chart.
//!
//! Turns a recorded history (or, before the first fall, pure closed-form
//! evaluation) into aligned columns: time, numeric velocity, reference
//! curves, and a constant terminal-velocity line.

use freefall_core::{DragRegime, ExponentialFit, SimulationParameters, TrajectorySample, DEFAULT_MAX_SAMPLES};
use freefall_models::{
    closed_form_velocity, euler_step, fitted_velocity, ideal_velocity, terminal_velocity, EULER_DT,
};
use serde::{Deserialize, Serialize};

/// Spacing of synthesized time points [s]. Equal to the Euler step so the
/// Euler curve lines up with the time column.
pub const SYNTHETIC_STEP: f64 = EULER_DT;
/// Horizon used before any fall has been simulated [s].
pub const DEFAULT_HORIZON: f64 = 10.0;
/// Charts extend past the landing time by this factor.
pub const HORIZON_FACTOR: f64 = 1.5;
/// Upper bound on synthesized time points; longer horizons are truncated.
pub const MAX_SYNTHETIC_POINTS: usize = DEFAULT_MAX_SAMPLES;

/// Where the numeric column came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesSource {
    /// RK4 samples of a finished fall.
    Recorded,
    /// Closed-form placeholder (no fall yet).
    Synthesized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveKind {
    /// `g t + v0`
    Ideal,
    /// Analytical solution of the active regime.
    ClosedForm,
    /// Coarse explicit Euler integration.
    Euler,
    /// Experimental exponential fit.
    ExponentialFit,
}

impl CurveKind {
    pub fn tag(self) -> &'static str {
        match self {
            CurveKind::Ideal => "ideal",
            CurveKind::ClosedForm => "closed-form",
            CurveKind::Euler => "euler",
            CurveKind::ExponentialFit => "exponential-fit",
        }
    }

    /// Legend text for charts.
    pub fn label(self) -> &'static str {
        match self {
            CurveKind::Ideal => "Ideal model (no drag)",
            CurveKind::ClosedForm => "Analytical solution",
            CurveKind::Euler => "Discrete model (Euler)",
            CurveKind::ExponentialFit => "Experimental fit",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCurve {
    pub kind: CurveKind,
    pub values: Vec<f64>,
}

/// Column-aligned data for one velocity chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparativeSeries {
    pub source: SeriesSource,
    pub regime: DragRegime,
    pub times: Vec<f64>,
    pub numeric: Vec<f64>,
    pub references: Vec<ReferenceCurve>,
    /// Analytical terminal velocity; infinite without drag (`null` in JSON).
    #[serde(with = "unbounded")]
    pub terminal_velocity: f64,
    /// `terminal_velocity` repeated once per time point.
    #[serde(with = "unbounded_vec")]
    pub terminal_velocity_series: Vec<f64>,
}

impl ComparativeSeries {
    pub fn len(&self) -> usize { self.times.len() }
    pub fn is_empty(&self) -> bool { self.times.is_empty() }

    pub fn reference(&self, kind: CurveKind) -> Option<&ReferenceCurve> {
        self.references.iter().find(|c| c.kind == kind)
    }

    /// (time, velocity) pairs of the numeric column. For a recorded series
    /// these are the history samples, bit for bit.
    pub fn recorded_samples(&self) -> Vec<TrajectorySample> {
        self.times
            .iter()
            .zip(&self.numeric)
            .map(|(&t, &v)| TrajectorySample::new(t, v))
            .collect()
    }

    /// Time axis labels with one decimal.
    pub fn labels(&self) -> Vec<String> {
        self.times.iter().map(|t| format!("{t:.1}")).collect()
    }

    /// JSON export. Infinite terminal velocities become `null`.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty { serde_json::to_string_pretty(self) } else { serde_json::to_string(self) }
    }

    /// CSV with a header row: `time,numeric,<curves...>,terminal_velocity`.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("time,numeric");
        for curve in &self.references {
            out.push(',');
            out.push_str(curve.kind.tag());
        }
        out.push_str(",terminal_velocity\n");

        // rows stop at the shortest column; a short curve leaves an empty cell
        let mut buf = ryu::Buffer::new();
        let rows = self.times.iter().zip(&self.numeric).zip(&self.terminal_velocity_series);
        for (i, ((&t, &v), &vt)) in rows.enumerate() {
            out.push_str(buf.format(t));
            push_cell(&mut out, &mut buf, Some(v));
            for curve in &self.references {
                push_cell(&mut out, &mut buf, curve.values.get(i).copied());
            }
            push_cell(&mut out, &mut buf, Some(vt));
            out.push('\n');
        }
        out
    }
}

fn push_cell(out: &mut String, buf: &mut ryu::Buffer, value: Option<f64>) {
    out.push(',');
    if let Some(v) = value {
        out.push_str(buf.format(v));
    }
}

/// Chart horizon: 1.5x the fall duration, or [`DEFAULT_HORIZON`] before any fall.
pub fn default_horizon(elapsed: f64) -> f64 {
    if elapsed > 0.0 { elapsed * HORIZON_FACTOR } else { DEFAULT_HORIZON }
}

/// Build the comparison columns.
///
/// With a non-empty `history` the numeric column is the recorded samples and
/// reference curves are evaluated at the recorded times (`horizon` unused).
/// With an empty history, times run from 0 to `horizon` every
/// [`SYNTHETIC_STEP`] and every column comes from closed-form evaluation.
///
/// Pure: reads the history, never mutates it.
pub fn generate_comparative_series(
    history: &[TrajectorySample],
    params: &SimulationParameters,
    v0: f64,
    horizon: f64,
    fit: Option<&ExponentialFit>,
) -> ComparativeSeries {
    let vt = terminal_velocity(params);
    let with_fit = fit.filter(|_| params.regime == DragRegime::Linear);

    let (source, times, numeric, mut references) = if history.is_empty() {
        let times = synthetic_times(horizon);
        let numeric: Vec<f64> = times.iter().map(|&t| closed_form_velocity(t, params, v0)).collect();

        let mut refs = vec![ideal_curve(&times, params, v0)];
        if params.regime == DragRegime::Linear {
            refs.push(ReferenceCurve { kind: CurveKind::Euler, values: euler_curve(times.len(), params, v0) });
        }
        (SeriesSource::Synthesized, times, numeric, refs)
    } else {
        let times: Vec<f64> = history.iter().map(|s| s.time).collect();
        let numeric: Vec<f64> = history.iter().map(|s| s.velocity).collect();

        let mut refs = vec![ideal_curve(&times, params, v0)];
        if params.effective_drag() > 0.0 {
            let values = times.iter().map(|&t| closed_form_velocity(t, params, v0)).collect();
            refs.push(ReferenceCurve { kind: CurveKind::ClosedForm, values });
        }
        (SeriesSource::Recorded, times, numeric, refs)
    };

    if let Some(fit) = with_fit {
        let values = times.iter().map(|&t| fitted_velocity(t, fit)).collect();
        references.push(ReferenceCurve { kind: CurveKind::ExponentialFit, values });
    }

    let terminal_velocity_series = vec![vt; times.len()];
    ComparativeSeries {
        source,
        regime: params.regime,
        times,
        numeric,
        references,
        terminal_velocity: vt,
        terminal_velocity_series,
    }
}

fn synthetic_times(horizon: f64) -> Vec<f64> {
    let horizon = if horizon.is_finite() { horizon.max(0.0) } else { 0.0 };
    // tolerance so 10.0 / 0.1 still includes the end point
    let steps = (horizon / SYNTHETIC_STEP + 1e-9).floor();
    if steps >= MAX_SYNTHETIC_POINTS as f64 {
        log::warn!("horizon {horizon} s truncated to {MAX_SYNTHETIC_POINTS} points");
    }
    let last = steps.min((MAX_SYNTHETIC_POINTS - 1) as f64) as usize;
    (0..=last).map(|i| i as f64 * SYNTHETIC_STEP).collect()
}

fn ideal_curve(times: &[f64], params: &SimulationParameters, v0: f64) -> ReferenceCurve {
    let values = times.iter().map(|&t| ideal_velocity(t, params.gravity, v0)).collect();
    ReferenceCurve { kind: CurveKind::Ideal, values }
}

/// Euler velocities at 0, dt, 2dt, ... (value at each time, then step).
fn euler_curve(len: usize, params: &SimulationParameters, v0: f64) -> Vec<f64> {
    let mut v = v0;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(v);
        v = euler_step(v, params, SYNTHETIC_STEP);
    }
    out
}

/// Infinite terminal velocity <-> JSON `null`.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() { s.serialize_some(v) } else { s.serialize_none() }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

mod unbounded_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(|x| x.is_finite().then_some(*x)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(d)?;
        Ok(raw.into_iter().map(|x| x.unwrap_or(f64::INFINITY)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear() -> SimulationParameters {
        SimulationParameters::new(0.1, 9.8, 0.05, DragRegime::Linear)
    }

    #[test]
    fn horizon_defaults() {
        assert_eq!(default_horizon(0.0), DEFAULT_HORIZON);
        assert_relative_eq!(default_horizon(4.0), 6.0);
    }

    #[test]
    fn synthesized_preview() {
        let p = linear();
        let s = generate_comparative_series(&[], &p, 0.0, 10.0, None);
        assert_eq!(s.source, SeriesSource::Synthesized);
        assert_eq!(s.len(), 101);
        assert_eq!(s.times[0], 0.0);
        assert_relative_eq!(s.times[100], 10.0, max_relative = 1e-12);
        assert_relative_eq!(s.numeric[10], 19.6 * (1.0 - (-0.5_f64).exp()), max_relative = 1e-12);

        let euler = s.reference(CurveKind::Euler).unwrap();
        assert_eq!(euler.values[0], 0.0);
        assert_relative_eq!(euler.values[1], 0.98, max_relative = 1e-12);
        assert!(s.reference(CurveKind::ClosedForm).is_none());
        assert!(s.terminal_velocity_series.iter().all(|&v| v == s.terminal_velocity));
    }

    #[test]
    fn synthesized_quadratic_has_no_euler() {
        let p = SimulationParameters::new(0.1, 24.79, 0.1, DragRegime::Quadratic);
        let s = generate_comparative_series(&[], &p, 0.0, 1.0, Some(&ExponentialFit::EXPERIMENT));
        assert_eq!(s.len(), 11);
        assert!(s.reference(CurveKind::Euler).is_none());
        assert!(s.reference(CurveKind::ExponentialFit).is_none());
        assert!(s.numeric.iter().all(|&v| v <= s.terminal_velocity));
    }

    #[test]
    fn recorded_series_keeps_samples() {
        let p = linear();
        let history = [
            TrajectorySample::new(0.0, 0.0),
            TrajectorySample::new(0.1, 0.9558),
            TrajectorySample::new(0.137, 1.3),
        ];
        let s = generate_comparative_series(&history, &p, 0.0, 99.0, Some(&ExponentialFit::EXPERIMENT));
        assert_eq!(s.source, SeriesSource::Recorded);
        assert_eq!(s.recorded_samples(), history.to_vec());

        let ideal = s.reference(CurveKind::Ideal).unwrap();
        assert_relative_eq!(ideal.values[2], 9.8 * 0.137, max_relative = 1e-12);
        assert!(s.reference(CurveKind::ClosedForm).is_some());
        assert!(s.reference(CurveKind::ExponentialFit).is_some());
        assert!(s.reference(CurveKind::Euler).is_none());
        assert_eq!(s.labels(), vec!["0.0", "0.1", "0.1"]);
    }

    #[test]
    fn drag_free_terminal_line_is_infinite() {
        let p = SimulationParameters::ideal(0.1, 1.62);
        let s = generate_comparative_series(&[], &p, 1.0, 0.2, None);
        assert!(s.terminal_velocity.is_infinite());
        assert_relative_eq!(s.numeric[2], 1.0 + 1.62 * 0.2, max_relative = 1e-12);

        let json = s.to_json(false).unwrap();
        assert!(json.contains("\"terminal_velocity\":null"));
        let back: ComparativeSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn csv_layout() {
        let p = linear();
        let s = generate_comparative_series(&[TrajectorySample::new(0.5, 4.0)], &p, 0.0, 1.0, None);
        let csv = s.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("time,numeric,ideal,closed-form,terminal_velocity"));
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&row[..3], &["0.5", "4.0", "4.9"]);
        assert_relative_eq!(row[4].parse::<f64>().unwrap(), 19.6, max_relative = 1e-12);
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn bad_horizon_yields_single_point() {
        let s = generate_comparative_series(&[], &linear(), 0.0, f64::NAN, None);
        assert_eq!(s.times, vec![0.0]);
    }

    #[test]
    fn huge_horizon_is_capped() {
        for horizon in [f64::MAX, 1e12] {
            let s = generate_comparative_series(&[], &linear(), 0.0, horizon, None);
            assert_eq!(s.len(), MAX_SYNTHETIC_POINTS);
            assert_eq!(s.reference(CurveKind::Euler).unwrap().values.len(), MAX_SYNTHETIC_POINTS);
        }
    }

    #[test]
    fn csv_tolerates_ragged_columns() {
        let mut s = generate_comparative_series(&[], &linear(), 0.0, 1.0, None);
        s.numeric.truncate(5);
        s.references[0].values.truncate(2);
        let csv = s.to_csv();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows.len(), 5);
        assert!(rows[4].split(',').nth(2).unwrap().is_empty());
        assert!(!rows[1].split(',').nth(2).unwrap().is_empty());
    }
}
