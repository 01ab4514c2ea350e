use crate::link::AppLayer;
use crate::proto::NetworkLayer;

#[test]
fn send_ready_is_announced_only_for_credit_backed_packets() {
    let mut app = AppLayer::generated("x", 6);
    assert_eq!(app.total(), 6);
    assert_eq!(app.remaining(), 6);

    app.grant_credit(4);
    assert_eq!(app.take_ready(), 4);
    assert_eq!(app.take_ready(), 0, "notifications are taken once");
    assert_eq!(app.credit(), 0);

    let first = app.pull_next_packet().expect("packet");
    assert_eq!((first.id, first.data.as_slice()), (0, b"x-0".as_slice()));
    assert_eq!(app.remaining(), 5);

    // 还有 3 个已通知未取走，只剩 2 个分组可以再通知
    app.grant_credit(1);
    app.grant_credit(5);
    assert_eq!(app.take_ready(), 2);
    assert_eq!(app.credit(), 4, "unused credit is kept");
    assert!(!app.is_complete());
}

#[test]
fn drained_app_layer_is_complete_and_keeps_deliveries() {
    let mut app = AppLayer::generated("y", 1);
    app.grant_credit(1);
    assert!(app.pull_next_packet().is_some());
    assert!(app.pull_next_packet().is_none());
    assert_eq!(app.remaining(), 0);
    assert!(app.is_complete());

    app.grant_credit(3);
    assert_eq!(app.take_ready(), 1, "only the announcement made before the pull");
    assert_eq!(app.credit(), 3);

    app.deliver(crate::proto::Packet::new(9, "z"));
    assert_eq!(app.delivered().len(), 1);
}
