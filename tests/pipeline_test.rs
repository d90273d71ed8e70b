//! End-to-end tests of the keystroke feature pipeline

use ndarray::Array2;
use proptest::prelude::*;
use std::sync::Arc;
use typestate::collector::{parse_sessions, KeystrokeEvent, UNRESOLVED_CHAR};
use typestate::core::{
    derive_features, latest_records, EventNormalizer, SessionContext, FLIGHT_TIME_CEILING_MS,
};
use typestate::{
    FeatureLayout, LinearWindowClassifier, ModelArtifacts, ScalerParameters, StressAnalyzer,
    StressStatus, TrainingTable, WINDOW_SIZE,
};

const KEYS: [(&str, &str); 5] = [
    ("KeyA", "a"),
    ("KeyS", "s"),
    ("Space", " "),
    ("Backspace", "Backspace"),
    ("KeyD", "d"),
];

/// Events with strictly increasing timestamps, so any shuffle has one sorted order.
fn distinct_time_events() -> impl Strategy<Value = Vec<KeystrokeEvent>> {
    prop::collection::vec((1i64..3000, 0usize..KEYS.len(), any::<bool>()), 0..80).prop_map(|steps| {
        let mut t = 1_700_000_000_000i64;
        steps
            .into_iter()
            .map(|(gap, k, is_down)| {
                t += gap;
                let (key, ch) = KEYS[k];
                if is_down {
                    KeystrokeEvent::down(t, key, ch)
                } else {
                    KeystrokeEvent::up(t, key)
                }
            })
            .collect()
    })
}

/// Arbitrary timestamps, including duplicates and negatives.
fn any_time_events() -> impl Strategy<Value = Vec<KeystrokeEvent>> {
    prop::collection::vec((-10_000i64..100_000, 0usize..KEYS.len(), any::<bool>()), 0..80).prop_map(|raw| {
        raw.into_iter()
            .map(|(t, k, is_down)| {
                let (key, ch) = KEYS[k];
                if is_down {
                    KeystrokeEvent::down(t, key, ch)
                } else {
                    KeystrokeEvent::up(t, key)
                }
            })
            .collect()
    })
}

fn ctx() -> SessionContext {
    SessionContext {
        session_id: "S1".to_string(),
        label: 1,
        client_class: typestate::collector::ClientClass::Desktop,
    }
}

proptest! {
    #[test]
    fn derived_features_ignore_input_order(
        (events, shuffled) in distinct_time_events()
            .prop_flat_map(|ev| (Just(ev.clone()), Just(ev).prop_shuffle()))
    ) {
        prop_assert_eq!(derive_features(&events, &ctx()), derive_features(&shuffled, &ctx()));
    }

    #[test]
    fn flight_times_stay_in_range(events in any_time_events()) {
        for record in derive_features(&events, &ctx()) {
            prop_assert!(record.flight_time >= 0);
            prop_assert!(record.flight_time <= FLIGHT_TIME_CEILING_MS);
            prop_assert!(record.flight_time_var >= 0.0);
        }
    }

    #[test]
    fn one_record_per_accepted_press(events in any_time_events()) {
        let presses = events.iter().filter(|e| e.is_down()).count();
        let records = derive_features(&events, &ctx());
        prop_assert_eq!(records.len(), presses);
        for (idx, record) in records.iter().enumerate() {
            prop_assert_eq!(record.sequence_idx, idx);
        }
    }
}

#[test]
fn test_worked_example() {
    // Flights come out as [0, 100, 50, 2000, 50]
    let events = vec![
        KeystrokeEvent::down(3050, "KeyE", "e"),
        KeystrokeEvent::down(0, "KeyA", "a"),
        KeystrokeEvent::up(60, "KeyA"),
        KeystrokeEvent::down(150, "Backspace", "Backspace"),
        KeystrokeEvent::down(100, "KeyB", "b"),
        KeystrokeEvent::down(3000, "KeyD", "d"),
    ];
    let records = derive_features(&events, &ctx());

    let flights: Vec<i64> = records.iter().map(|r| r.flight_time).collect();
    assert_eq!(flights, vec![0, 100, 50, 2000, 50]);

    let digraphs: Vec<&str> = records.iter().map(|r| r.digraph.as_str()).collect();
    assert_eq!(digraphs, vec!["START", "a-b", "b-Backspace", "Backspace-d", "d-e"]);

    let errors: Vec<u8> = records.iter().map(|r| r.is_error).collect();
    assert_eq!(errors, vec![0, 0, 1, 0, 0]);

    assert_eq!(records[0].dwell_time, Some(60));
    assert!(records[..4].iter().all(|r| r.flight_time_var == 0.0));
    assert!((records[4].flight_time_var - 761_750.0).abs() < 1e-3);
}

#[test]
fn test_unresolved_presses_are_invisible() {
    let clean = vec![
        KeystrokeEvent::down(0, "KeyA", "a"),
        KeystrokeEvent::down(180, "KeyS", "s"),
    ];
    let mut noisy = clean.clone();
    noisy.push(KeystrokeEvent::down(90, "Unidentified", UNRESOLVED_CHAR));
    noisy.push(KeystrokeEvent::up(120, "Unidentified"));

    assert_eq!(derive_features(&clean, &ctx()), derive_features(&noisy, &ctx()));
}

#[test]
fn test_extreme_timestamps_do_not_overflow() {
    let events = vec![
        KeystrokeEvent::down(i64::MIN, "KeyA", "a"),
        KeystrokeEvent::up(i64::MAX, "KeyA"),
        KeystrokeEvent::down(i64::MAX, "KeyB", "b"),
    ];
    let records = derive_features(&events, &SessionContext::live());
    let flights: Vec<i64> = records.iter().map(|r| r.flight_time).collect();
    assert_eq!(flights, vec![0, FLIGHT_TIME_CEILING_MS]);
    assert_eq!(records[0].dwell_time, Some(i64::MAX));
}

#[test]
fn test_out_of_range_raw_times_discarded() {
    let raw = vec![
        serde_json::json!({"type": "down", "key": "KeyA", "char": "a", "time": -1e30}),
        serde_json::json!({"type": "down", "key": "KeyB", "char": "b", "time": 1e30}),
        serde_json::json!({"type": "down", "key": "KeyC", "char": "c", "time": 100}),
        serde_json::json!({"type": "down", "key": "KeyD", "char": "d", "time": 250}),
    ];
    let normalized = EventNormalizer::normalize_raw(&raw);
    assert_eq!(normalized.discarded, 2);

    let records = derive_features(&normalized.events, &SessionContext::live());
    let flights: Vec<i64> = records.iter().map(|r| r.flight_time).collect();
    assert_eq!(flights, vec![0, 150]);
    assert_eq!(records[0].digraph, "START");
}

#[test]
fn test_sessions_file_to_table() {
    let json = r#"[
        {
            "sessionId": "S-relaxed",
            "mode": "relaxed",
            "userAgent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)",
            "keystrokes": [
                {"type": "down", "key": "KeyH", "char": "h", "time": 10},
                {"type": "up", "key": "KeyH", "time": 90},
                {"type": "down", "key": "KeyI", "char": "i", "time": 200},
                {"type": "down", "char": "x"}
            ]
        },
        {
            "sessionId": "S-stressed",
            "mode": "stressed",
            "keystrokes": [
                {"type": "down", "key": "KeyO", "char": "o", "time": 5},
                {"type": "down", "key": "Backspace", "char": "Backspace", "time": 65}
            ]
        },
        "not a session"
    ]"#;

    let loaded = parse_sessions(json).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].discarded, 1);

    let sessions: Vec<_> = loaded.into_iter().map(|l| l.session).collect();
    let table = TrainingTable::build(&sessions);
    let summary = table.summary();
    assert_eq!(summary.records, 4);
    assert_eq!(summary.relaxed, 2);
    assert_eq!(summary.stressed, 2);

    let first = &table.records[0];
    assert_eq!(first.client_class.as_str(), "mobile");
    assert_eq!(first.dwell_time, Some(80));
    let last = &table.records[3];
    assert_eq!(last.label, 1);
    assert_eq!(last.is_error, 1);
    assert_eq!(last.flight_time, 60);
}

fn typing_history(presses: usize, start: i64) -> Vec<KeystrokeEvent> {
    let rhythm = [110i64, 240, 95, 400, 160, 130, 75];
    let mut t = start;
    let mut events = Vec::new();
    for i in 0..presses {
        let (key, ch) = KEYS[i % KEYS.len()];
        events.push(KeystrokeEvent::down(t, key, ch));
        events.push(KeystrokeEvent::up(t + 60, key));
        t += rhythm[i % rhythm.len()];
    }
    events
}

fn varied_analyzer() -> StressAnalyzer {
    let layout = FeatureLayout::canonical();
    let scaler = ScalerParameters::new(layout.scaled_names(), vec![180.0, 9000.0], vec![90.0, 7000.0]).unwrap();
    let weights = Array2::from_shape_fn((WINDOW_SIZE, layout.len()), |(row, col)| {
        ((row * 7 + col * 3) % 11) as f64 / 50.0 - 0.1
    });
    let classifier = LinearWindowClassifier::new(layout.names(), weights, -0.2).unwrap();
    StressAnalyzer::new(ModelArtifacts::new(scaler, Arc::new(classifier))).unwrap()
}

#[test]
fn test_collecting_until_window_full() {
    let analyzer = varied_analyzer();

    let short = analyzer.analyze(&typing_history(WINDOW_SIZE - 1, 0)).unwrap();
    assert_eq!(short.status, StressStatus::CollectingData);
    assert_eq!(short.score, 0.0);

    let full = analyzer.analyze(&typing_history(WINDOW_SIZE, 0)).unwrap();
    assert_ne!(full.status, StressStatus::CollectingData);
    assert!((0.0..=1.0).contains(&full.score));
}

#[test]
fn test_only_recent_window_matters() {
    let analyzer = varied_analyzer();
    let history = typing_history(WINDOW_SIZE + 5, 50_000);

    let mut with_noise = typing_history(12, 0);
    with_noise.extend(history.iter().cloned());

    let layout = FeatureLayout::canonical();
    let vectors = |events: &[KeystrokeEvent]| -> Vec<Vec<f64>> {
        let records = StressAnalyzer::live_features(events);
        latest_records(&records, WINDOW_SIZE)
            .unwrap()
            .iter()
            .map(|r| layout.raw_vector(r))
            .collect()
    };
    assert_eq!(vectors(&history), vectors(&with_noise));

    let plain = analyzer.analyze(&history).unwrap();
    let noisy = analyzer.analyze(&with_noise).unwrap();
    assert_eq!(plain, noisy);
}

#[test]
fn test_analysis_is_repeatable() {
    let analyzer = varied_analyzer();
    let history = typing_history(40, 0);
    let first = analyzer.analyze(&history).unwrap();
    for _ in 0..3 {
        assert_eq!(analyzer.analyze(&history).unwrap(), first);
    }
}
