use chem_protocol::{
    ActionRequest, ChemAction, ClientCommand, CreateVolume, PackagingKind, Screen,
    ServerMessage, StateSnapshot, TransferAmount, TransferTarget,
};
use serde_json::json;

#[test]
fn empty_object_decodes_to_defaults() {
    let snap: StateSnapshot = serde_json::from_str("{}").expect("decode");
    assert_eq!(snap, StateSnapshot::default());
    assert_eq!(snap.screen, Screen::Home);
    assert!(snap.beaker_contents.is_empty());
    assert!(snap.buffer_contents.is_empty());
    assert!(!snap.is_beaker_loaded);
}

#[test]
fn missing_beaker_contents_is_empty_list() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "isBeakerLoaded": true,
        "bufferContents": [{ "id": "water", "name": "Water", "volume": 5 }],
    }))
    .expect("decode");
    assert!(snap.beaker_contents.is_empty());
    assert_eq!(snap.buffer_contents.len(), 1);
}

#[test]
fn null_and_numeric_fields_are_tolerated() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "screen": null,
        "beakerContents": null,
        "beakerCurrentVolume": null,
        "beakerMaxVolume": "100",
        "isBeakerLoaded": 1,
        "isPillBottleLoaded": 0,
        "pillBottleCurrentAmount": 12.0,
        "pillBottleMaxAmount": -3,
        "mode": 1,
        "condi": null,
        "chosenPillStyle": null,
        "analyzeVars": null,
    }))
    .expect("decode");
    assert_eq!(snap.screen, Screen::Home);
    assert!(snap.beaker_contents.is_empty());
    assert_eq!(snap.beaker_current_volume, 0.0);
    assert_eq!(snap.beaker_max_volume, 100.0);
    assert!(snap.is_beaker_loaded);
    assert!(!snap.is_pill_bottle_loaded);
    assert_eq!(snap.pill_bottle_current_amount, 12);
    assert_eq!(snap.pill_bottle_max_amount, 0);
    assert!(snap.mode);
    assert!(!snap.condi);
    assert_eq!(snap.chosen_pill_style, None);
    assert_eq!(snap.analyze_vars.name, "");
}

#[test]
fn unknown_screen_falls_back_to_home() {
    let snap: StateSnapshot =
        serde_json::from_value(json!({ "screen": "settings" })).expect("decode");
    assert_eq!(snap.screen, Screen::Home);

    let snap: StateSnapshot =
        serde_json::from_value(json!({ "screen": "analyze" })).expect("decode");
    assert_eq!(snap.screen, Screen::Analyze);
}

#[test]
fn non_string_screen_falls_back_to_home() {
    for screen in [json!(1), json!(null), json!({ "name": "analyze" })] {
        let snap: StateSnapshot =
            serde_json::from_value(json!({ "screen": screen, "mode": 1 })).expect("decode");
        assert_eq!(snap.screen, Screen::Home);
        assert!(snap.mode);
    }
}

#[test]
fn chosen_pill_style_accepts_numeric_strings() {
    let snap: StateSnapshot =
        serde_json::from_value(json!({ "chosenPillStyle": "2" })).expect("decode");
    assert_eq!(snap.chosen_pill_style, Some(2));

    let snap: StateSnapshot =
        serde_json::from_value(json!({ "chosenPillStyle": 4.0 })).expect("decode");
    assert_eq!(snap.chosen_pill_style, Some(4));

    for bad in [json!("round"), json!(-3), json!(1.5), json!(false)] {
        let snap: StateSnapshot =
            serde_json::from_value(json!({ "chosenPillStyle": bad })).expect("decode");
        assert_eq!(snap.chosen_pill_style, None);
    }
}

#[test]
fn malformed_pill_styles_are_skipped() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "isBeakerLoaded": true,
        "pillStyles": [
            { "className": "pill1" },
            { "id": "3", "className": "pill3" },
            { "id": null, "className": "pill4" },
            "pill5",
            { "id": 6 },
        ],
    }))
    .expect("decode");

    assert!(snap.is_beaker_loaded);
    let ids: Vec<u32> = snap.pill_styles.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![3, 6]);
    assert_eq!(snap.pill_styles[0].class_name, "pill3");
    assert_eq!(snap.pill_styles[1].class_name, "");
}

#[test]
fn malformed_chemical_entries_are_skipped() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "beakerContents": [null, { "id": "water", "name": "Water", "volume": 10 }, 7],
        "bufferContents": "none",
    }))
    .expect("decode");
    assert_eq!(snap.beaker_contents.len(), 1);
    assert_eq!(snap.beaker_contents[0].id, "water");
    assert!(snap.buffer_contents.is_empty());
}

#[test]
fn update_with_null_data_carries_default_snapshot() {
    let msg: ServerMessage = serde_json::from_value(json!({
        "type": "update",
        "config": { "ref": "abc" },
        "data": null,
    }))
    .expect("decode");
    match msg {
        ServerMessage::Update { config, data } => {
            assert_eq!(config.src_ref, "abc");
            assert_eq!(data, StateSnapshot::default());
        }
        other => panic!("expected update, got: {other:?}"),
    }
}

#[test]
fn chemical_ids_accept_numbers() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "beakerContents": [{ "id": 42, "name": "Bicaridine", "volume": 12.5 }],
    }))
    .expect("decode");
    assert_eq!(snap.beaker_contents[0].id, "42");
    assert_eq!(snap.beaker_contents[0].volume, 12.5);
    assert!(snap.find_chemical("42").is_some());
}

#[test]
fn analyze_vars_use_backend_field_names() {
    let snap: StateSnapshot = serde_json::from_value(json!({
        "screen": "analyze",
        "analyzeVars": {
            "name": "Epinephrine",
            "state": "Liquid",
            "color": "#ffffff",
            "description": "Stabilizes patients.",
            "metaRate": 0.4,
            "overD": 30,
            "addicD": 0,
        },
    }))
    .expect("decode");
    let vars = &snap.analyze_vars;
    assert_eq!(vars.name, "Epinephrine");
    assert_eq!(vars.meta_rate, 0.4);
    assert_eq!(vars.over_d, 30.0);
    assert_eq!(vars.addic_d, 0.0);
}

#[test]
fn transfer_wire_shape() {
    let req = ActionRequest::from(ChemAction::Transfer {
        id: "water".to_string(),
        amount: TransferAmount::Custom,
        to: TransferTarget::Buffer,
    });
    assert_eq!(
        serde_json::to_value(&req).expect("encode"),
        json!({ "name": "transfer", "params": { "id": "water", "amount": -1, "to": "buffer" } })
    );
}

#[test]
fn parameterless_actions_omit_params() {
    let req = ActionRequest::from(ChemAction::Eject);
    assert_eq!(
        serde_json::to_value(&req).expect("encode"),
        json!({ "name": "eject" })
    );
    let action = ChemAction::try_from(req).expect("decode");
    assert_eq!(action, ChemAction::Eject);
}

#[test]
fn create_request_decodes_to_typed_action() {
    let req = ActionRequest::new("create")
        .param("type", "condimentBottle")
        .param("amount", 3)
        .param("volume", "auto");
    let action = ChemAction::try_from(req).expect("decode");
    assert_eq!(
        action,
        ChemAction::Create {
            kind: PackagingKind::CondimentBottle,
            amount: 3,
            volume: CreateVolume::Auto,
        }
    );
}

#[test]
fn typed_serialization_matches_request_form() {
    let action = ChemAction::GoScreen {
        screen: Screen::Home,
    };
    let typed = serde_json::to_value(&action).expect("encode");
    let dynamic = serde_json::to_value(ActionRequest::from(action)).expect("encode");
    assert_eq!(typed, dynamic);
}

#[test]
fn unknown_action_is_rejected() {
    let err = ChemAction::try_from(ActionRequest::new("selfDestruct")).unwrap_err();
    assert!(err.to_string().contains("selfDestruct"));
}

#[test]
fn zero_and_negative_amounts_are_rejected() {
    assert!(TransferAmount::try_from(0).is_err());
    assert!(TransferAmount::try_from(-5).is_err());
    assert_eq!(TransferAmount::try_from(-1).unwrap(), TransferAmount::Custom);
    assert_eq!(TransferAmount::try_from(1000).unwrap(), TransferAmount::All);
    assert_eq!(TransferAmount::try_from(5).unwrap(), TransferAmount::Units(5));
}

#[test]
fn oversized_unit_counts_saturate_instead_of_meaning_all() {
    assert_eq!(i32::from(TransferAmount::Units(3_000_000_000)), i32::MAX);
    assert_eq!(
        TransferAmount::try_from(i32::from(TransferAmount::Units(3_000_000_000))).unwrap(),
        TransferAmount::Units(i32::MAX.unsigned_abs())
    );
    assert_eq!(i32::from(TransferAmount::Units(999)), 999);
}

#[test]
fn custom_is_the_only_negative_standard_amount() {
    let negatives: Vec<i32> = TransferAmount::STANDARD
        .iter()
        .map(|a| i32::from(*a))
        .filter(|n| *n < 0)
        .collect();
    assert_eq!(negatives, vec![-1]);
}

#[test]
fn envelopes_are_type_tagged() {
    let msg: ServerMessage = serde_json::from_value(json!({
        "type": "update",
        "config": { "ref": "abc" },
        "data": { "isBeakerLoaded": 1 },
    }))
    .expect("decode");
    match msg {
        ServerMessage::Update { config, data } => {
            assert_eq!(config.src_ref, "abc");
            assert!(data.is_beaker_loaded);
        }
        other => panic!("expected update, got: {other:?}"),
    }

    let cmd = ClientCommand::Act {
        src_ref: "abc".to_string(),
        action: ActionRequest::from(ChemAction::ToggleMode),
    };
    assert_eq!(
        serde_json::to_value(&cmd).expect("encode"),
        json!({ "type": "act", "ref": "abc", "action": { "name": "toggleMode" } })
    );
}
