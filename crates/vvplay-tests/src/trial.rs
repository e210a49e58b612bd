//! Integration tests for the trial harness.
//!
//! Runs sessions end to end: experiment file on disk, presentation order,
//! playback through vvplay-playback and the result log.

use std::sync::Arc;
use std::time::{Duration, Instant};
use vvplay_media::SyntheticDecoder;
use vvplay_playback::{Player, PlayerState, RecordingSink, TickOutcome};
use vvplay_schedule::{Catalog, VariantSpec};
use vvplay_trial::{
    EndOfContent, ExperimentConfig, PresentationOrder, ResultLog, TrainingRun, TrialSession,
    VariantSelection,
};

const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 30);

fn run(player: &mut Player) {
    let t0 = Instant::now();
    let mut sink = RecordingSink::new();
    player.play_at(t0).unwrap();
    for step in 0..20_000u32 {
        if player.state() == PlayerState::Ended {
            return;
        }
        match player.tick_at(t0 + FRAME * step, &mut sink) {
            TickOutcome::Buffering { .. } => {
                player.await_prefill(Duration::from_secs(5));
            }
            TickOutcome::Stalled { .. } => {
                player.buffer().wait_for_len(2, Duration::from_millis(50));
            }
            _ => {}
        }
    }
    panic!("trial did not end");
}

fn legacy_experiment(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("experiment.json");
    let json = serde_json::json!({
        "content": { "name": "redandblack", "last_frame": 59, "root": "unused" },
        "catalog": "switch",
        "variant_indices": [0, 4, 9],
        "result_dir": dir.join("results"),
        "shuffle_seed": 2024,
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&json).unwrap()).unwrap();
    path
}

#[test]
fn legacy_file_runs_a_full_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig::load_from_file(&legacy_experiment(dir.path())).unwrap();
    assert_eq!(
        config.variants,
        VariantSelection::Catalog {
            catalog: Catalog::VersionSwitch,
            indices: Some(vec![0, 4, 9]),
        }
    );

    let mut session = TrialSession::open(&config).unwrap();
    let mut player = session
        .create_player(Arc::new(SyntheticDecoder::new(8)))
        .unwrap();
    let ended = EndOfContent::new();
    player.add_observer(Box::new(ended.clone()));

    let mut score = 1;
    while !session.is_complete() {
        if session.step() > 0 {
            session.present(&mut player).unwrap();
        }
        run(&mut player);
        let report = ended.take().unwrap();
        assert_eq!(report.schedule_len, 60);
        session.record_score(score, &report, player.schedule()).unwrap();
        score += 1;
    }
    player.shutdown().unwrap();

    let records = ResultLog::read_records(session.log().path()).unwrap();
    let ids: Vec<usize> = records.iter().map(|r| r.variant_id).collect();
    let expected: Vec<usize> = session
        .order()
        .positions()
        .iter()
        .map(|&p| [0, 4, 9][p])
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(
        records.iter().map(|r| r.score).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    // Version-switch schedules play every source frame once
    for record in &records {
        assert_eq!(
            record.sequence,
            (0..60).map(|i| i.to_string()).collect::<Vec<_>>().join(",")
        );
    }
}

#[test]
fn order_file_is_shared_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig::load_from_file(&legacy_experiment(dir.path())).unwrap();

    let first = TrialSession::open(&config).unwrap();
    let second = TrialSession::open(&ExperimentConfig {
        shuffle_seed: Some(1),
        ..config.clone()
    })
    .unwrap();

    assert_eq!(first.order(), second.order());
    assert_eq!(first.order(), &PresentationOrder::shuffled(3, 2024));
    assert_ne!(first.log().session_id(), second.log().session_id());
}

#[test]
fn training_runs_unscored_before_trials() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ExperimentConfig::load_from_file(&legacy_experiment(dir.path())).unwrap();
    config.training = vec![VariantSpec::looping(30, 2), VariantSpec::baseline(15)];
    let path = dir.path().join("with_training.json");
    config.save_to_file(&path).unwrap();
    let config = ExperimentConfig::load_from_file(&path).unwrap();

    let decoder = Arc::new(SyntheticDecoder::new(8));
    let mut training = TrainingRun::from_config(&config).unwrap();
    let mut player = training.create_player(decoder.clone()).unwrap();
    let ended = EndOfContent::new();
    player.add_observer(Box::new(ended.clone()));

    let mut watched = Vec::new();
    while !training.is_complete() {
        if training.step() > 0 {
            training.present(&mut player).unwrap();
        }
        run(&mut player);
        let report = ended.take().unwrap();
        watched.push((report.variant.clone(), report.schedule_len));
        training.finish_current(&report).unwrap();
    }
    assert_eq!(
        watched,
        vec![
            ("Loop_30fps_x2".to_string(), 120),
            ("Baseline_15fps".to_string(), 120),
        ]
    );

    // Training leaves no trace in the results
    let mut session = TrialSession::open(&config).unwrap();
    session.present(&mut player).unwrap();
    run(&mut player);
    let report = ended.take().unwrap();
    session.record_score(4, &report, player.schedule()).unwrap();
    player.shutdown().unwrap();

    let records = ResultLog::read_records(session.log().path()).unwrap();
    assert_eq!(records.len(), 1);
    assert!([0, 4, 9].contains(&records[0].variant_id));
}
