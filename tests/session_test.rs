//! Session controller: validation, the advisory protocol and the experiment log.

use rand::rngs::StdRng;
use rand::SeedableRng;

use battery_additive_mixer::additives::AdditiveId;
use battery_additive_mixer::config::{ControllerConfig, UnrecognizedPolicy};
use battery_additive_mixer::error::MixerError;
use battery_additive_mixer::run::CancelToken;
use battery_additive_mixer::session::{Advisory, ApprovedRun, Mode, PendingRun, RunStep, Session};

fn session() -> Session {
    Session::new(ControllerConfig::default())
}

fn expect_ready(step: RunStep) -> ApprovedRun {
    match step {
        RunStep::Ready(approved) => approved,
        RunStep::Confirm(pending) => panic!("unexpected advisory: {}", pending.advisory()),
    }
}

fn expect_confirm(step: RunStep) -> PendingRun {
    match step {
        RunStep::Confirm(pending) => pending,
        RunStep::Ready(_) => panic!("expected an advisory"),
    }
}

fn finish(session: &mut Session, approved: ApprovedRun) {
    let mut run = approved.start(StdRng::seed_from_u64(42), CancelToken::new());
    for _ in run.by_ref() {}
    session.record(run).expect("finished run is recorded");
}

// =============================================================================
// Input validation
// =============================================================================

#[test]
fn test_rejects_non_positive_iterations() {
    let s = session();
    for bad in ["0", "-3", "ten", "", "2.5"] {
        assert!(
            matches!(s.request_run(bad, "10"), Err(MixerError::InvalidIterations(_))),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn test_manual_mode_requires_numeric_total() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    assert!(matches!(s.request_run("5", ""), Err(MixerError::InvalidTotal(_))));
    assert!(matches!(s.request_run("5", "abc"), Err(MixerError::InvalidTotal(_))));
    assert!(matches!(s.request_run("5", "-1"), Err(MixerError::InvalidTotal(_))));
}

#[test]
fn test_automatic_mode_treats_blank_total_as_zero() {
    let s = session();
    let approved = expect_ready(s.request_run("3", "  ").unwrap());
    assert_eq!(approved.plan().declared_total, 0.0);
    assert_eq!(approved.plan().mode, Mode::Automatic);
}

#[test]
fn test_invalid_concentration_leaves_list_untouched() {
    let mut s = session();
    assert!(s.add_compound_text("Compound 1", "").is_err());
    assert!(s.add_compound_text("Compound 1", "-2").is_err());
    assert!(s.add_compound_text("Compound 1", "lots").is_err());
    assert!(s.selections().is_empty());
}

#[test]
fn test_reject_policy_refuses_unknown_compounds() {
    let config = ControllerConfig {
        unrecognized: UnrecognizedPolicy::Reject,
        ..ControllerConfig::default()
    };
    let mut s = Session::new(config);
    let err = s.add_compound("Mystery Salt", 1.0).unwrap_err();
    assert_eq!(
        err,
        MixerError::UnrecognizedCompound {
            name: "Mystery Salt".to_string(),
            key: "MYSTERY_SALT".to_string(),
        }
    );
    assert!(s.selections().is_empty());
}

// =============================================================================
// Advisories
// =============================================================================

#[test]
fn test_manual_run_on_target_needs_no_confirmation() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 6.0).unwrap();
    s.add_compound("Compound 2", 4.0).unwrap();
    expect_ready(s.request_run("2", "10").unwrap());
}

#[test]
fn test_advisories_are_asked_in_order() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 12.0).unwrap();

    let pending = expect_confirm(s.request_run("2", "8").unwrap());
    assert_eq!(pending.remaining(), 3);
    assert!(matches!(pending.advisory(), Advisory::CompoundsExceedTotal { .. }));

    let pending = expect_confirm(pending.accept());
    assert!(matches!(pending.advisory(), Advisory::TotalOffTarget { .. }));

    let pending = expect_confirm(pending.accept());
    assert!(matches!(pending.advisory(), Advisory::CompoundSumOffTarget { .. }));

    let approved = expect_ready(pending.accept());
    assert_eq!(approved.acknowledged().len(), 3);
}

#[test]
fn test_automatic_mode_skips_advisories() {
    let mut s = session();
    s.add_compound("Compound 1", 50.0).unwrap();
    expect_ready(s.request_run("2", "3").unwrap());
}

#[test]
fn test_declining_leaves_session_unchanged() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 6.0).unwrap();
    let before_selections = s.selections().to_vec();
    let before_additives = s.additives().clone();

    let pending = expect_confirm(s.request_run("4", "5").unwrap());
    pending.decline();

    assert_eq!(s.selections(), before_selections.as_slice());
    assert_eq!(s.additives(), &before_additives);
    assert!(s.log().is_empty());
    assert_eq!(s.experiment_count(), 0);
}

// =============================================================================
// Recording
// =============================================================================

#[test]
fn test_record_appends_and_replaces_mapping() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 6.0).unwrap();
    s.add_compound("Compound 3", 4.0).unwrap();

    let approved = expect_ready(s.request_run("5", "10").unwrap());
    finish(&mut s, approved);

    assert_eq!(s.experiment_count(), 1);
    let record = &s.log()[0];
    assert_eq!(record.sequence, 1);
    assert_eq!(record.mode, Mode::Manual);
    assert_eq!(record.readings.len(), 5);
    assert!(record.started_at <= record.finished_at);
    assert!(s.additives().get(AdditiveId::AdditiveY).used);
    assert_eq!(s.additives(), &record.additives);
}

#[test]
fn test_cancelled_run_is_not_recorded() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 6.0).unwrap();
    s.add_compound("Compound 2", 4.0).unwrap();
    let before_additives = s.additives().clone();

    let cancel = CancelToken::new();
    let approved = expect_ready(s.request_run("10", "10").unwrap());
    let mut run = approved.start(StdRng::seed_from_u64(42), cancel.clone());
    assert!(run.next().is_some());
    assert!(run.next().is_some());
    cancel.cancel();
    assert!(run.next().is_none());
    assert_eq!(run.readings().len(), 2);

    let err = s.record(run).unwrap_err();
    assert_eq!(err, MixerError::RunIncomplete { completed: 2, iterations: 10 });
    assert!(s.log().is_empty());
    assert_eq!(s.experiment_count(), 0);
    assert_eq!(s.additives(), &before_additives);
}

#[test]
fn test_partial_run_is_not_recorded() {
    let mut s = session();
    let approved = expect_ready(s.request_run("3", "10").unwrap());
    let mut run = approved.start(StdRng::seed_from_u64(1), CancelToken::new());
    assert!(run.next().is_some());
    assert!(matches!(s.record(run), Err(MixerError::RunIncomplete { completed: 1, iterations: 3 })));
    assert!(s.log().is_empty());
}

#[test]
fn test_idle_mapping_holds_full_batch_of_base() {
    let s = session();
    let base = s.additives().get(AdditiveId::Lp30);
    assert!(base.used);
    assert_eq!(base.percentage, 100.0);
    assert!((base.volume - s.config().total_volume_ml).abs() < 1e-12);
    assert_eq!(s.additives().used().count(), 1);
}

#[test]
fn test_overridden_advisories_are_kept_on_record() {
    let mut s = session();
    s.set_mode(Mode::Manual);
    s.add_compound("Compound 1", 3.0).unwrap();

    let mut step = s.request_run("1", "10").unwrap();
    let approved = loop {
        match step {
            RunStep::Confirm(pending) => step = pending.accept(),
            RunStep::Ready(approved) => break approved,
        }
    };
    finish(&mut s, approved);

    let record = &s.log()[0];
    assert_eq!(record.advisories.len(), 1);
    assert!(matches!(record.advisories[0], Advisory::CompoundSumOffTarget { .. }));
}

#[test]
fn test_sequence_numbers_increase() {
    let mut s = session();
    for _ in 0..3 {
        let approved = expect_ready(s.request_run("1", "10").unwrap());
        finish(&mut s, approved);
    }
    let seqs: Vec<u32> = s.log().iter().map(|r| r.sequence).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[test]
fn test_run_uses_snapshot_taken_at_request() {
    let mut s = session();
    s.add_compound("Compound 1", 6.0).unwrap();
    let approved = expect_ready(s.request_run("1", "10").unwrap());

    s.clear_compounds();
    finish(&mut s, approved);

    assert_eq!(s.log()[0].selections.len(), 1);
    assert!(s.additives().get(AdditiveId::Tep).used);
}

#[test]
fn test_warn_policy_lists_dropped_compounds() {
    let mut s = session();
    s.add_compound("Mystery Salt", 2.0).unwrap();
    let approved = expect_ready(s.request_run("1", "10").unwrap());
    finish(&mut s, approved);
    assert_eq!(s.log()[0].unrecognized.len(), 1);
}

#[test]
fn test_ignore_policy_drops_silently() {
    let config = ControllerConfig {
        unrecognized: UnrecognizedPolicy::Ignore,
        ..ControllerConfig::default()
    };
    let mut s = Session::new(config);
    s.add_compound("Mystery Salt", 2.0).unwrap();
    let approved = expect_ready(s.request_run("1", "10").unwrap());
    finish(&mut s, approved);
    assert!(s.log()[0].unrecognized.is_empty());
}

// =============================================================================
// Compound list editing
// =============================================================================

#[test]
fn test_scale_and_clear() {
    let mut s = session();
    s.add_compound("Compound 1", 5.0).unwrap();
    s.add_compound("Compound 2", 2.0).unwrap();
    s.scale_concentrations(1.10).unwrap();
    assert!((s.compound_total() - 7.7).abs() < 1e-9);

    assert!(s.scale_concentrations(0.0).is_err());
    assert!(s.scale_concentrations(f64::NAN).is_err());

    s.clear_compounds();
    assert!(s.selections().is_empty());
}

#[test]
fn test_automatic_add_uses_zero_percent() {
    let mut s = session();
    let added = s.add_automatic("Compound 2").unwrap();
    assert_eq!(added.percentage(), 0.0);
    assert_eq!(s.selections().len(), 1);
}
