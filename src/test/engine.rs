use super::support::{engine, packet, TestEngine};
use crate::proto::{Event, Frame, FrameKind, Packet, Signal, TimerKey};

fn send_ready(e: &mut TestEngine) {
    e.handle(Signal::Event(Event::SendReady));
}

fn arrive(e: &mut TestEngine, frame: Frame) {
    e.physical_mut().inbox.push_back(frame);
    e.handle(Signal::Event(Event::FrameArrival));
}

fn data(seq: u32, ack: u32) -> Frame {
    Frame::data(seq, ack, packet(100 + seq as u64))
}

fn fire_retransmit(e: &mut TestEngine, seq: u32) {
    let slot = e.space().slot(seq);
    let fired = e
        .timers()
        .scheduler()
        .last_armed(TimerKey::Retransmit(slot))
        .expect("retransmit timer armed");
    e.handle(Signal::Timer(fired));
}

fn fire_ack_timer(e: &mut TestEngine) {
    let fired = e
        .timers()
        .scheduler()
        .last_armed(TimerKey::DelayedAck)
        .expect("ack timer armed");
    e.handle(Signal::Timer(fired));
}

fn sent_kinds(e: &TestEngine) -> Vec<(FrameKind, u32)> {
    e.physical().sent.iter().map(|f| (f.kind, f.seq)).collect()
}

#[test]
fn start_grants_a_full_window_of_credit() {
    let e = engine(7, 0);
    assert_eq!(e.network().credit_grants, vec![4]);
    let s = e.state();
    assert_eq!((s.ack_expected, s.next_frame_to_send, s.frame_expected), (0, 0, 0));
    assert_eq!(s.too_far, 4);
    assert_eq!(s.nbuffered, 0);
    assert!(s.no_nak);
}

#[test]
fn cumulative_ack_loss_and_timeout_scenario() {
    let mut e = engine(7, 4);
    for _ in 0..4 {
        send_ready(&mut e);
    }
    assert_eq!(e.state().nbuffered, 4);
    assert_eq!(e.state().next_frame_to_send, 4);
    assert_eq!(
        sent_kinds(&e),
        vec![
            (FrameKind::Data, 0),
            (FrameKind::Data, 1),
            (FrameKind::Data, 2),
            (FrameKind::Data, 3)
        ]
    );
    for seq in 0..4 {
        assert!(e.timers().is_retransmit_armed(seq));
    }

    // 对端只确认了 0
    arrive(&mut e, Frame::control(FrameKind::Ack, 0));
    assert_eq!(e.state().ack_expected, 1);
    assert_eq!(e.state().nbuffered, 3);
    assert!(!e.timers().is_retransmit_armed(0));
    assert_eq!(e.network().credit_grants, vec![4, 1]);

    // 帧 1 丢失，定时器到期后原样重传
    let before = e.physical().sent.len();
    fire_retransmit(&mut e, 1);
    let resent = &e.physical().sent[before..];
    assert_eq!(resent.len(), 1);
    assert_eq!(resent[0].kind, FrameKind::Data);
    assert_eq!(resent[0].seq, 1);
    assert_eq!(resent[0].payload, Some(packet(1)));
    assert!(e.timers().is_retransmit_armed(1), "retransmission re-arms its timer");
    assert_eq!(e.stats().retransmissions, 1);

    // 累计确认到 3
    arrive(&mut e, Frame::control(FrameKind::Ack, 3));
    assert_eq!(e.state().ack_expected, 4);
    assert_eq!(e.state().nbuffered, 0);
    assert_eq!(e.network().credit_grants, vec![4, 1, 1, 1, 1]);
    for seq in 1..4 {
        assert!(!e.timers().is_retransmit_armed(seq));
    }
}

#[test]
fn every_frame_piggybacks_frame_expected_minus_one() {
    let mut e = engine(7, 2);
    send_ready(&mut e);
    assert_eq!(e.physical().sent[0].ack, 7);

    arrive(&mut e, data(0, 7));
    arrive(&mut e, data(1, 7));
    assert_eq!(e.state().frame_expected, 2);

    send_ready(&mut e);
    let last = e.physical().sent.last().expect("sent");
    assert_eq!((last.kind, last.seq, last.ack), (FrameKind::Data, 1, 1));
    assert!(!e.timers().is_ack_armed(), "the data frame carried the ack");
}

#[test]
fn out_of_order_data_sends_one_nak_per_gap() {
    let mut e = engine(7, 0);

    arrive(&mut e, data(1, 7));
    assert_eq!(sent_kinds(&e), vec![(FrameKind::Nak, 0)]);
    assert_eq!(e.physical().sent[0].ack, 7, "NAK asks for frame_expected");
    assert!(!e.state().no_nak);

    arrive(&mut e, data(2, 7));
    e.handle(Signal::Event(Event::CksumErr));
    e.handle(Signal::Event(Event::CksumErr));
    assert_eq!(e.stats().naks_sent, 1, "no NAK storm for the same gap");
    assert!(e.timers().is_ack_armed());

    // 补齐空洞：0,1,2 连续交付，NAK 抑制解除
    arrive(&mut e, data(0, 7));
    let ids = e.network().delivered.iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![100, 101, 102]);
    assert!(e.state().no_nak);
    assert_eq!(e.state().frame_expected, 3);
    assert_eq!(e.state().too_far, 7);

    e.handle(Signal::Event(Event::CksumErr));
    assert_eq!(e.stats().naks_sent, 2);
    let nak = e.physical().sent.last().expect("nak");
    assert_eq!((nak.kind, nak.ack), (FrameKind::Nak, 2));
}

#[test]
fn duplicate_arrival_changes_nothing() {
    let mut e = engine(7, 0);
    arrive(&mut e, data(2, 7));
    assert!(e.buffers().is_arrived(2));
    let buffered = e.buffers().get_in(2).clone();

    arrive(&mut e, Frame::data(2, 7, Packet::new(999, "other")));
    assert!(e.buffers().is_arrived(2));
    assert_eq!(e.buffers().get_in(2), &buffered);
    assert!(e.network().delivered.is_empty());
    assert_eq!(e.stats().frames_discarded, 1);
}

#[test]
fn data_outside_the_receive_window_is_not_buffered() {
    let mut e = engine(7, 0);
    // 接收窗口 [0, 4)
    arrive(&mut e, data(5, 7));
    assert!(!e.buffers().is_arrived(5));
    assert!(e.network().delivered.is_empty());
    assert_eq!(e.state().frame_expected, 0);
    assert_eq!(e.stats().frames_discarded, 1);
}

#[test]
fn already_delivered_frame_is_dropped_but_still_acknowledged() {
    let mut e = engine(7, 0);
    arrive(&mut e, data(0, 7));
    assert_eq!(e.network().delivered.len(), 1);

    // 对端没收到确认，又重传了 0
    arrive(&mut e, data(0, 7));
    assert_eq!(e.network().delivered.len(), 1);
    let nak = e.physical().sent.last().expect("reply");
    assert_eq!(nak.kind, FrameKind::Nak);
    assert_eq!(nak.ack, 0, "reply carries the cumulative ack");
}

#[test]
fn in_order_delivery_restarts_the_ack_timer_and_ack_timeout_sends_standalone_ack() {
    let mut e = engine(7, 0);
    arrive(&mut e, data(0, 7));
    assert!(e.timers().is_ack_armed());

    fire_ack_timer(&mut e);
    let ack = e.physical().sent.last().expect("ack");
    assert_eq!((ack.kind, ack.seq, ack.ack), (FrameKind::Ack, 0, 0));
    assert_eq!(ack.payload, None);
    assert!(!e.timers().is_ack_armed());
    assert_eq!(e.stats().acks_sent, 1);
}

#[test]
fn any_outgoing_frame_cancels_the_pending_ack_timer() {
    let mut e = engine(7, 1);
    arrive(&mut e, data(0, 7));
    assert!(e.timers().is_ack_armed());

    send_ready(&mut e);
    assert!(!e.timers().is_ack_armed());

    arrive(&mut e, data(1, 7));
    assert!(e.timers().is_ack_armed());
    e.handle(Signal::Event(Event::CksumErr));
    assert_eq!(e.physical().sent.last().map(|f| f.kind), Some(FrameKind::Nak));
    assert!(!e.timers().is_ack_armed());
}

#[test]
fn nak_triggers_single_frame_fast_retransmit() {
    let mut e = engine(7, 3);
    for _ in 0..3 {
        send_ready(&mut e);
    }
    let before = e.physical().sent.len();

    // 对端收到了 0，请求 1
    arrive(&mut e, Frame::control(FrameKind::Nak, 0));
    let resent = &e.physical().sent[before..];
    assert_eq!(resent.len(), 1, "only the requested frame is resent");
    assert_eq!((resent[0].kind, resent[0].seq), (FrameKind::Data, 1));
    assert_eq!(resent[0].payload, Some(packet(1)));
    assert_eq!(e.stats().fast_retransmits, 1);
    // NAK 同时捎带了对 0 的确认
    assert_eq!(e.state().ack_expected, 1);
}

#[test]
fn nak_for_a_frame_outside_the_send_window_is_ignored() {
    let mut e = engine(7, 1);
    send_ready(&mut e);
    let before = e.physical().sent.len();
    // ack+1 = 1 == next_frame_to_send：窗口外
    arrive(&mut e, Frame::control(FrameKind::Nak, 0));
    assert_eq!(e.physical().sent.len(), before);
    assert_eq!(e.stats().fast_retransmits, 0);
    assert_eq!(e.state().ack_expected, 1);
}

#[test]
fn stale_timer_firing_is_discarded() {
    let mut e = engine(7, 1);
    send_ready(&mut e);
    let old = e
        .timers()
        .scheduler()
        .last_armed(TimerKey::Retransmit(0))
        .expect("armed");
    arrive(&mut e, Frame::control(FrameKind::Ack, 0));
    let before = e.physical().sent.len();

    e.handle(Signal::Timer(old));
    assert_eq!(e.physical().sent.len(), before);
    assert_eq!(e.stats().stale_timers, 1);
    assert_eq!(e.stats().retransmissions, 0);
}

#[test]
fn timeout_outside_the_send_window_is_only_a_diagnostic() {
    let mut e = engine(7, 0);
    let state = e.state().clone();
    e.handle(Signal::Event(Event::Timeout(3)));
    assert!(e.physical().sent.is_empty());
    assert_eq!(e.state(), &state);
    assert_eq!(e.stats().violations, 1);
}

#[test]
fn send_ready_beyond_the_window_does_not_pull_a_packet() {
    let mut e = engine(7, 6);
    for _ in 0..5 {
        send_ready(&mut e);
    }
    assert_eq!(e.state().nbuffered, 4);
    assert_eq!(e.network().outgoing.len(), 2, "fifth packet stays upstream");
    assert_eq!(e.stats().violations, 1);
}

#[test]
fn credit_never_exceeds_the_window_of_unacknowledged_frames() {
    let mut e = engine(7, 12);
    let mut acked = 0_u32;
    for round in 0..3 {
        for _ in 0..4 {
            send_ready(&mut e);
        }
        let outstanding = e.state().nbuffered;
        let granted = e.network().total_credit();
        assert_eq!(granted - acked, 4, "round {round}");
        assert_eq!(outstanding, 4);

        let last = e.space().prev(e.state().next_frame_to_send);
        arrive(&mut e, Frame::control(FrameKind::Ack, last));
        acked += 4;
        assert_eq!(e.state().nbuffered, 0);
    }
    assert_eq!(e.network().total_credit(), 16);
}

#[test]
fn wraparound_delivers_in_order_across_the_sequence_space() {
    let mut e = engine(3, 0);
    // W = 2，序号 0..3 回绕两圈
    let mut expected = Vec::new();
    for i in 0..8_u64 {
        let seq = (i % 4) as u32;
        e.physical_mut()
            .inbox
            .push_back(Frame::data(seq, 3, Packet::new(i, "x")));
        e.handle(Signal::Event(Event::FrameArrival));
        expected.push(i);
    }
    let ids = e.network().delivered.iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(ids, expected);
    assert_eq!(e.state().frame_expected, 0);
    assert_eq!(e.state().too_far, 2);
}

#[test]
fn run_processes_signals_until_the_source_closes() {
    let mut e = engine(7, 2);
    let mut source = vec![
        Signal::Event(Event::SendReady),
        Signal::Event(Event::SendReady),
    ]
    .into_iter();
    e.run(&mut source);
    assert_eq!(e.state().next_frame_to_send, 2);
    assert_eq!(e.physical().sent.len(), 2);
    // `engine()` 已经 start 过一次，run 又授予了一次
    assert_eq!(e.network().credit_grants, vec![4, 4]);
}
