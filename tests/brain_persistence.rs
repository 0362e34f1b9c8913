use anyhow::Result;
use arena_qbot::brain::{LearningParams, QBrain, Successor};
use arena_qbot::error::BrainError;
use arena_qbot::state::StateKey;
use std::fs;

fn trained_brain() -> QBrain {
    let mut brain = QBrain::new(4, LearningParams::default(), 5);
    let keys = ["CLOSE-LOW-DUEL", "MID-LOW-DUEL", "FAR-HIGH-ALONE-CENTER"];
    for (i, key) in keys.iter().enumerate() {
        let state = StateKey::from(*key);
        let next = StateKey::from(keys[(i + 1) % keys.len()]);
        brain.update(Some(&state), i % 4, 1.0 / 3.0 + i as f64, Successor::State(&next));
        brain.update(Some(&state), 3, -0.7, Successor::Terminal);
    }
    brain
}

#[test]
fn save_and_reload_reproduces_every_state() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("nested/brain.json");
    let brain = trained_brain();
    brain.persist(&path)?;

    let mut fresh = QBrain::new(4, LearningParams::default(), 99);
    let loaded = fresh.restore(&path)?;
    assert_eq!(loaded, brain.len());
    for (state, values) in brain.states() {
        let restored = fresh.values(state).expect("state restored");
        for (a, b) in values.iter().zip(restored) {
            assert!((a - b).abs() < 1e-12, "state {state}: {a} vs {b}");
        }
    }
    Ok(())
}

#[test]
fn missing_image_starts_empty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let mut brain = trained_brain();
    assert_eq!(brain.restore(&tmp.path().join("absent.json"))?, 0);
    assert!(brain.is_empty());

    let loaded = QBrain::load_or_empty(4, LearningParams::default(), 1, &tmp.path().join("absent.json"));
    assert!(loaded.is_empty());
    Ok(())
}

#[test]
fn shape_mismatch_is_rejected_without_touching_table() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("wide.json");
    let mut wide = QBrain::new(6, LearningParams::default(), 1);
    wide.update(Some(&StateKey::from("s")), 5, 1.0, Successor::Terminal);
    wide.persist(&path)?;

    let mut narrow = trained_brain();
    let before = narrow.len();
    let err = narrow.restore(&path).unwrap_err();
    assert!(matches!(err, BrainError::ShapeMismatch { expected: 4, found: 6, .. }));
    assert_eq!(narrow.len(), before);

    let recovered = QBrain::load_or_empty(4, LearningParams::default(), 1, &path);
    assert!(recovered.is_empty());
    Ok(())
}

#[test]
fn ragged_rows_are_rejected() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("ragged.json");
    fs::write(
        &path,
        r#"{"num_actions":4,"states":{"A":[0,0,0,0],"B":[1,2]}}"#,
    )?;
    let mut brain = QBrain::new(4, LearningParams::default(), 1);
    match brain.restore(&path) {
        Err(BrainError::ShapeMismatch { state: Some(state), found: 2, .. }) => assert_eq!(state, "B"),
        other => panic!("unexpected restore result: {other:?}"),
    }
    Ok(())
}

#[test]
fn corrupt_image_reports_decode_error() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("corrupt.json");
    fs::write(&path, b"not json")?;
    let mut brain = QBrain::new(4, LearningParams::default(), 1);
    let err = brain.restore(&path).unwrap_err();
    assert!(matches!(err, BrainError::Decode { .. }));
    assert!(err.to_string().contains("corrupt.json"));
    Ok(())
}
