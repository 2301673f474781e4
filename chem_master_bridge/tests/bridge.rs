use chem_master_bridge::backend::demo_snapshot;
use chem_master_bridge::wire::{
    ActionRequest, ChemAction, ClientCommand, ErrorCode, Screen, ServerMessage, StateSnapshot,
    WindowConfig,
};
use chem_master_bridge::{
    ActionSink, BridgeConfig, InboundMsg, OutboundMsg, SyncBridge, INBOUND_CAP, OUTBOUND_CAP,
};
use crossbeam_channel::{bounded, Receiver, Sender};

fn bridge() -> (SyncBridge, Sender<InboundMsg>, Receiver<OutboundMsg>) {
    let (in_tx, in_rx) = bounded(16);
    let (out_tx, out_rx) = bounded(16);
    (SyncBridge::new(in_rx, out_tx), in_tx, out_rx)
}

fn update(src_ref: &str, data: StateSnapshot) -> InboundMsg {
    InboundMsg::Server {
        msg: ServerMessage::Update {
            config: WindowConfig {
                src_ref: src_ref.to_string(),
                title: "ChemMaster".to_string(),
            },
            data,
        },
    }
}

#[test]
fn starts_with_default_snapshot_and_never_blocks() {
    let (mut bridge, _in_tx, _out_rx) = bridge();
    assert!(!bridge.tick());
    assert_eq!(bridge.snapshot(), &StateSnapshot::default());
    assert!(bridge.window().is_none());
}

#[test]
fn tick_replaces_snapshot_wholesale_with_latest() {
    let (mut bridge, in_tx, _out_rx) = bridge();
    let first = demo_snapshot();
    let mut second = StateSnapshot::default();
    second.screen = Screen::Analyze;

    in_tx.send(InboundMsg::Connected).unwrap();
    in_tx.send(update("r1", first)).unwrap();
    in_tx.send(update("r1", second.clone())).unwrap();

    assert!(bridge.tick());
    assert!(bridge.is_connected());
    assert_eq!(bridge.snapshot(), &second);
    assert!(bridge.snapshot().beaker_contents.is_empty());
    assert!(!bridge.tick());
}

#[test]
fn dispatch_before_first_update_is_dropped() {
    let (bridge, _in_tx, out_rx) = bridge();
    bridge.dispatch(ChemAction::ToggleMode);
    assert!(out_rx.try_recv().is_err());
}

#[test]
fn dispatch_echoes_window_ref() {
    let (mut bridge, in_tx, out_rx) = bridge();
    in_tx.send(update("abc123", demo_snapshot())).unwrap();
    bridge.tick();

    bridge.dispatch(ChemAction::Analyze {
        id: "water".to_string(),
    });

    let OutboundMsg::Send { cmd } = out_rx.try_recv().expect("queued");
    assert_eq!(
        cmd,
        ClientCommand::Act {
            src_ref: "abc123".to_string(),
            action: ActionRequest::new("analyze").param("id", "water"),
        }
    );
}

#[test]
fn disconnect_keeps_snapshot_but_forgets_ref() {
    let (mut bridge, in_tx, out_rx) = bridge();
    in_tx.send(InboundMsg::Connected).unwrap();
    in_tx.send(update("abc", demo_snapshot())).unwrap();
    bridge.tick();

    in_tx.send(InboundMsg::Disconnected).unwrap();
    assert!(!bridge.tick());
    assert!(!bridge.is_connected());
    assert!(bridge.snapshot().is_beaker_loaded);

    bridge.dispatch(ChemAction::Eject);
    assert!(out_rx.try_recv().is_err());
}

#[test]
fn backend_errors_do_not_touch_the_snapshot() {
    let (mut bridge, in_tx, _out_rx) = bridge();
    in_tx.send(update("abc", demo_snapshot())).unwrap();
    bridge.tick();
    let before = bridge.snapshot().clone();

    in_tx
        .send(InboundMsg::Server {
            msg: ServerMessage::Error {
                msg: "no chemical with id nope".to_string(),
                code: ErrorCode::TargetNotFound,
            },
        })
        .unwrap();
    assert!(!bridge.tick());
    assert_eq!(bridge.snapshot(), &before);
}

#[test]
fn full_outbound_queue_drops_overflow() {
    let (in_tx, in_rx) = bounded(4);
    let (out_tx, out_rx) = bounded(1);
    let mut bridge = SyncBridge::new(in_rx, out_tx);
    in_tx.send(update("abc", demo_snapshot())).unwrap();
    bridge.tick();

    bridge.dispatch(ChemAction::ToggleMode);
    bridge.dispatch(ChemAction::Eject);
    assert_eq!(out_rx.len(), 1);

    match out_rx.try_recv() {
        Ok(OutboundMsg::Send {
            cmd: ClientCommand::Act { src_ref, action },
        }) => {
            assert_eq!(src_ref, "abc");
            assert_eq!(action, ActionRequest::from(ChemAction::ToggleMode));
        }
        Err(e) => panic!("expected queued act, got: {e:?}"),
    }
    assert!(out_rx.is_empty());
}

#[test]
fn zero_queue_caps_are_raised_to_one() {
    let config = BridgeConfig {
        inbound_cap: 0,
        outbound_cap: 0,
        ..BridgeConfig::default()
    };
    assert_eq!(config.queue_caps(), (1, 1));
    assert_eq!(
        BridgeConfig::default().queue_caps(),
        (INBOUND_CAP, OUTBOUND_CAP)
    );

    let (inbound_cap, outbound_cap) = config.queue_caps();
    let (in_tx, in_rx) = bounded(inbound_cap);
    let (out_tx, out_rx) = bounded(outbound_cap);
    let mut bridge = SyncBridge::new(in_rx, out_tx);
    in_tx.try_send(update("abc", demo_snapshot())).unwrap();
    assert!(bridge.tick());
    bridge.dispatch(ChemAction::ToggleMode);
    assert_eq!(out_rx.len(), 1);
}
