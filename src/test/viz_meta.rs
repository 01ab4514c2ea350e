use crate::duplex::{DuplexWorld, StationId};
use crate::link::{AppLayer, FaultModel};
use crate::sim::{SimTime, Simulator};
use crate::viz::{VizEventKind, VizLogger};

use super::support::cfg;

fn traced_world(fault: FaultModel, packets: usize) -> DuplexWorld {
    let mut world = DuplexWorld::new(
        cfg(7),
        fault,
        3,
        AppLayer::generated("a", packets),
        AppLayer::generated("b", 0),
    )
    .expect("valid fault model");
    world.viz = Some(VizLogger::default());
    world.emit_viz_meta();
    world
}

#[test]
fn viz_meta_describes_stations_and_protocol_parameters() {
    let world = traced_world(FaultModel::perfect(10), 5);

    let events = &world.viz.as_ref().expect("viz enabled").events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].t_ns, 0);
    assert_eq!(events[0].station, None);

    let VizEventKind::Meta {
        stations,
        max_seq,
        window,
        timeout_ns,
        ack_timeout_ns,
        fault,
    } = &events[0].kind
    else {
        panic!("expected Meta event");
    };
    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].name, "A");
    assert_eq!(stations[0].packets, 5);
    assert_eq!(stations[1].name, "B");
    assert_eq!(stations[1].packets, 0);
    assert_eq!(*max_seq, 7);
    assert_eq!(*window, 4);
    assert_eq!(*timeout_ns, SimTime::from_millis(1000).0);
    assert_eq!(*ack_timeout_ns, SimTime::from_millis(500).0);
    assert_eq!(fault, &FaultModel::perfect(10));
}

#[test]
fn viz_trace_records_sends_receipts_and_deliveries_in_time_order() {
    let mut world = traced_world(FaultModel::perfect(10), 3);
    let mut sim = Simulator::default();
    world.schedule_start(&mut sim);
    sim.run_until(SimTime::from_secs(60), &mut world);
    assert!(world.is_complete());

    let events = &world.viz.as_ref().expect("viz enabled").events;
    assert!(matches!(events[0].kind, VizEventKind::Meta { .. }));
    assert!(events.windows(2).all(|w| w[0].t_ns <= w[1].t_ns));

    let sends_from_a = events
        .iter()
        .filter(|e| e.station == Some(StationId::A.0))
        .filter(|e| matches!(e.kind, VizEventKind::SendFrame(_)))
        .count();
    assert!(sends_from_a >= 3);

    let delivered_at_b = events
        .iter()
        .filter(|e| e.station == Some(StationId::B.0))
        .filter_map(|e| match e.kind {
            VizEventKind::Deliver { packet_id } => Some(packet_id),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(delivered_at_b, vec![0, 1, 2]);

    let json = world.viz.as_ref().expect("viz enabled").to_json().expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed[0]["kind"], "meta");
    assert!(
        parsed
            .as_array()
            .expect("array")
            .iter()
            .any(|e| e["kind"] == "recv_frame" && e["frame_kind"] == "data")
    );
}
