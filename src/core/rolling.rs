//! Session-scoped statistics over flight time.
//!
//! Rolling variance is a trailing statistic, so a live prefix of a session
//! gets exactly the values the finished session gets. The z-score needs the
//! whole session and is only computed on the batch path.

use crate::core::features::DerivedFeatureRecord;
use statrs::statistics::Statistics;

/// Number of flight times in the rolling variance window.
pub const ROLLING_WINDOW: usize = 5;

/// Added to the standard deviation before dividing.
pub const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Sample variance of the trailing `window` values at each position.
///
/// Positions with fewer than `window` values available get 0.
pub fn rolling_variance(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                0.0
            } else {
                values[i + 1 - window..=i].iter().variance()
            }
        })
        .collect()
}

/// Z-score of each value against the mean and sample standard deviation of all values.
///
/// A single value has a standard deviation of 0.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mean = values.iter().mean();
    let std = if values.len() < 2 {
        0.0
    } else {
        values.iter().std_dev()
    };

    values
        .iter()
        .map(|v| (v - mean) / (std + NORMALIZATION_EPSILON))
        .collect()
}

/// Fills the statistics fields of derived records, one session at a time.
pub struct RollingStatistics;

impl RollingStatistics {
    /// Fill `flight_time_var` for every record.
    pub fn apply(records: &mut [DerivedFeatureRecord]) {
        for session in session_runs(records) {
            let flights = flight_times(session);
            for (record, var) in session.iter_mut().zip(rolling_variance(&flights, ROLLING_WINDOW)) {
                record.flight_time_var = var;
            }
        }
    }

    /// Fill `flight_time_norm` for every record. Requires complete sessions.
    pub fn apply_normalization(records: &mut [DerivedFeatureRecord]) {
        for session in session_runs(records) {
            let flights = flight_times(session);
            for (record, norm) in session.iter_mut().zip(zscore(&flights)) {
                record.flight_time_norm = Some(norm);
            }
        }
    }
}

fn flight_times(records: &[DerivedFeatureRecord]) -> Vec<f64> {
    records.iter().map(|r| r.flight_time as f64).collect()
}

/// Split records into runs sharing a session id so no window crosses sessions.
fn session_runs(records: &mut [DerivedFeatureRecord]) -> Vec<&mut [DerivedFeatureRecord]> {
    let mut runs = Vec::new();
    let mut rest = records;

    while !rest.is_empty() {
        let len = rest
            .iter()
            .position(|r| r.session_id != rest[0].session_id)
            .unwrap_or(rest.len());
        let (run, tail) = std::mem::take(&mut rest).split_at_mut(len);
        runs.push(run);
        rest = tail;
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::KeystrokeEvent;
    use crate::core::features::{FeatureDeriver, SessionContext};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_rolling_variance_short_prefix_is_zero() {
        let vars = rolling_variance(&[0.0, 100.0, 50.0, 2000.0], ROLLING_WINDOW);
        assert_eq!(vars, vec![0.0; 4]);
    }

    #[test]
    fn test_rolling_variance_sample_denominator() {
        let vars = rolling_variance(&[0.0, 100.0, 50.0, 2000.0, 50.0, 50.0], ROLLING_WINDOW);
        assert!(approx_eq(vars[4], 761_750.0));
        // [100, 50, 2000, 50, 50]: mean 450, squared deviations sum 3_005_000
        assert!(approx_eq(vars[5], 751_250.0));
    }

    #[test]
    fn test_zscore() {
        let z = zscore(&[1.0, 2.0, 3.0]);
        assert!(approx_eq(z[1], 0.0));
        assert!((z[0] + 1.0).abs() < 1e-5);
        assert!((z[2] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zscore_degenerate_sessions() {
        assert_eq!(zscore(&[]), Vec::<f64>::new());
        assert_eq!(zscore(&[120.0]), vec![0.0]);
        assert_eq!(zscore(&[80.0, 80.0, 80.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_windows_do_not_cross_sessions() {
        let events: Vec<KeystrokeEvent> = (0..6)
            .map(|i| KeystrokeEvent::down(i * 100 + i * i * 10, "KeyA", "a"))
            .collect();

        let ctx_a = SessionContext {
            session_id: "A".to_string(),
            ..SessionContext::live()
        };
        let ctx_b = SessionContext {
            session_id: "B".to_string(),
            ..SessionContext::live()
        };

        let mut records = FeatureDeriver::derive(&events, &ctx_a);
        records.extend(FeatureDeriver::derive(&events[..3], &ctx_b));
        RollingStatistics::apply(&mut records);

        assert!(records[4].flight_time_var > 0.0);
        assert!(records[5].flight_time_var > 0.0);
        // Session B restarts its window.
        assert!(records[6..].iter().all(|r| r.flight_time_var == 0.0));
    }

    #[test]
    fn test_apply_normalization_per_session() {
        let ctx = SessionContext::live();
        let events = vec![
            KeystrokeEvent::down(0, "KeyA", "a"),
            KeystrokeEvent::down(100, "KeyB", "b"),
            KeystrokeEvent::down(300, "KeyC", "c"),
        ];
        let mut records = FeatureDeriver::derive(&events, &ctx);
        RollingStatistics::apply_normalization(&mut records);
        let norms: Vec<f64> = records.iter().map(|r| r.flight_time_norm.unwrap()).collect();
        assert!((norms[0] + 1.0).abs() < 1e-5);
        assert!(norms[1].abs() < 1e-9);
        assert!((norms[2] - 1.0).abs() < 1e-5);
    }
}
