use std::time::Duration;

use crate::link::{ArrivalGate, Channel, FaultError, FaultModel};

#[test]
fn probabilities_outside_unit_interval_are_rejected() {
    let model = FaultModel {
        loss: 1.5,
        ..FaultModel::default()
    };
    assert_eq!(
        Channel::new(model, 0).err(),
        Some(FaultError::ProbabilityOutOfRange {
            name: "loss",
            value: 1.5
        })
    );

    let model = FaultModel {
        reorder: -0.1,
        ..FaultModel::default()
    };
    assert!(matches!(
        model.validate(),
        Err(FaultError::ProbabilityOutOfRange { name: "reorder", .. })
    ));
}

#[test]
fn perfect_channel_delivers_one_intact_copy_after_latency() {
    let mut ch = Channel::new(FaultModel::perfect(7), 1).expect("valid");
    for _ in 0..50 {
        let d = ch.transmit();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].delay, Duration::from_millis(7));
        assert!(!d[0].corrupted);
    }
    assert_eq!(ch.stats.sent_frames, 50);
    assert_eq!(ch.stats.delivered_frames, 50);
    assert_eq!(ch.stats.lost_frames, 0);
}

#[test]
fn certain_loss_drops_everything() {
    let model = FaultModel {
        loss: 1.0,
        duplicate: 1.0,
        ..FaultModel::default()
    };
    let mut ch = Channel::new(model, 1).expect("valid");
    for _ in 0..10 {
        assert!(ch.transmit().is_empty());
    }
    assert_eq!(ch.stats.lost_frames, 10);
    assert_eq!(ch.stats.duplicated_frames, 0);
}

#[test]
fn certain_duplication_and_corruption() {
    let model = FaultModel {
        duplicate: 1.0,
        corrupt: 1.0,
        ..FaultModel::perfect(2)
    };
    let mut ch = Channel::new(model, 1).expect("valid");
    let d = ch.transmit();
    assert_eq!(d.len(), 2);
    assert!(d.iter().all(|c| c.corrupted));
    assert_eq!(ch.stats.duplicated_frames, 1);
    assert_eq!(ch.stats.corrupted_frames, 2);
    assert_eq!(ch.stats.delivered_frames, 0);
}

#[test]
fn reordering_only_adds_bounded_extra_delay() {
    let model = FaultModel {
        reorder: 1.0,
        latency_ms: 10,
        jitter_ms: 30,
        ..FaultModel::default()
    };
    let mut ch = Channel::new(model, 9).expect("valid");
    for _ in 0..200 {
        let d = ch.transmit();
        assert_eq!(d.len(), 1);
        assert!(d[0].delay >= Duration::from_millis(10));
        assert!(d[0].delay <= Duration::from_millis(40));
    }
}

#[test]
fn same_seed_gives_same_fate() {
    let model = FaultModel {
        loss: 0.3,
        corrupt: 0.2,
        duplicate: 0.2,
        reorder: 0.5,
        latency_ms: 5,
        jitter_ms: 20,
    };
    let mut a = Channel::new(model.clone(), 42).expect("valid");
    let mut b = Channel::new(model, 42).expect("valid");
    let run_a = (0..100).map(|_| a.transmit()).collect::<Vec<_>>();
    let run_b = (0..100).map(|_| b.transmit()).collect::<Vec<_>>();
    assert_eq!(run_a, run_b);
    assert!(a.stats.lost_frames > 0);
}

#[test]
fn copies_carry_the_send_order_of_their_frame() {
    let model = FaultModel {
        loss: 0.3,
        duplicate: 0.5,
        ..FaultModel::perfect(1)
    };
    let mut ch = Channel::new(model, 5).expect("valid");
    for expected in 0..100_u64 {
        let copies = ch.transmit();
        assert!(copies.iter().all(|d| d.frame_index == expected));
    }
}

#[test]
fn arrival_gate_drops_copies_sent_before_the_newest_arrival() {
    let mut gate = ArrivalGate::default();
    assert!(gate.admit(0));
    assert!(gate.admit(2));
    assert!(gate.admit(2), "second copy of the same frame");
    assert!(!gate.admit(1), "overtaken by frame 2");
    assert!(gate.admit(5));
    assert!(!gate.admit(0));
    assert_eq!(gate.expired(), 2);
}
