mod server;

pub use server::BackendServer;

use crate::protocol::{
    BackendInbound, BackendOutbound, ChemAction, ErrorCode, ServerMessage, StateSnapshot,
    WindowConfig,
};
use crate::view::{MAX_CREATE_AMOUNT, MIN_CREATE_AMOUNT};
use chem_protocol::{
    AnalyzeVars, ChemicalEntry, PillStyle, Screen, TransferAmount, TransferTarget,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const DEFAULT_TITLE: &str = "ChemMaster 3000";

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("no beaker loaded")]
    NoBeaker,
    #[error("no pill bottle loaded")]
    NoPillBottle,
    #[error("no chemical with id {0}")]
    UnknownChemical(String),
    #[error("no pill style with id {0}")]
    UnknownPillStyle(u32),
    #[error("create amount {0} outside 1..=10")]
    InvalidAmount(u8),
    #[error("{0} packaging is not available on this device")]
    UnavailablePackaging(&'static str),
}

impl ApplyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApplyError::UnknownChemical(_) | ApplyError::UnknownPillStyle(_) => {
                ErrorCode::TargetNotFound
            }
            ApplyError::NoBeaker
            | ApplyError::NoPillBottle
            | ApplyError::InvalidAmount(_)
            | ApplyError::UnavailablePackaging(_) => ErrorCode::InvalidValue,
        }
    }
}

/// Tick-driven owner of the device state on the backend side.
///
/// Only structural state changes are modelled; reactions, capacities of
/// packaged items and custom-amount prompts are left to a real backend.
pub struct MainLoop {
    inbound_rx: Receiver<BackendInbound>,
    outbound_tx: Sender<BackendOutbound>,
    state: StateSnapshot,
    title: String,
    reagent_info: HashMap<String, AnalyzeVars>,
    active_ref: Option<String>,
}

impl MainLoop {
    pub fn new(
        inbound_rx: Receiver<BackendInbound>,
        outbound_tx: Sender<BackendOutbound>,
        state: StateSnapshot,
    ) -> Self {
        Self {
            inbound_rx,
            outbound_tx,
            state,
            title: DEFAULT_TITLE.to_string(),
            reagent_info: HashMap::new(),
            active_ref: None,
        }
    }

    /// Extra analysis details reported for `id` beyond its name.
    pub fn with_reagent_info(mut self, id: impl Into<String>, vars: AnalyzeVars) -> Self {
        self.reagent_info.insert(id.into(), vars);
        self
    }

    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    pub fn tick(&mut self) {
        let mut connected_ref: Option<String> = None;
        let mut actions: Vec<ChemAction> = Vec::new();

        loop {
            match self.inbound_rx.try_recv() {
                Ok(msg) => match msg {
                    BackendInbound::ClientConnected {
                        socket_addr,
                        src_ref,
                    } => {
                        info!(%socket_addr, "panel connected");
                        connected_ref = Some(src_ref);
                        actions.clear();
                    }
                    BackendInbound::ClientDisconnected => {
                        self.active_ref = None;
                        connected_ref = None;
                        actions.clear();
                    }
                    BackendInbound::Action { action } => actions.push(action),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }

        if let Some(src_ref) = connected_ref {
            self.active_ref = Some(src_ref);
            self.push_update();
        }

        for action in actions {
            self.handle(action);
        }
    }

    pub fn try_send(&mut self, msg: BackendOutbound) {
        let _ = self.outbound_tx.try_send(msg);
    }

    fn handle(&mut self, action: ChemAction) {
        let name = action.name();
        match self.apply(action) {
            Ok(()) => {
                debug!(action = %name, "applied");
                self.push_update();
            }
            Err(e) => {
                warn!(action = %name, error = %e, "rejected");
                self.send_error(e.to_string(), e.code());
            }
        }
    }

    pub fn apply(&mut self, action: ChemAction) -> Result<(), ApplyError> {
        match action {
            ChemAction::Eject => {
                if !self.state.is_beaker_loaded {
                    return Err(ApplyError::NoBeaker);
                }
                self.state.is_beaker_loaded = false;
                self.state.beaker_contents.clear();
                self.state.beaker_current_volume = 0.0;
                self.state.beaker_max_volume = 0.0;
            }
            ChemAction::EjectPillBottle => {
                if !self.state.is_pill_bottle_loaded {
                    return Err(ApplyError::NoPillBottle);
                }
                self.state.is_pill_bottle_loaded = false;
                self.state.pill_bottle_current_amount = 0;
                self.state.pill_bottle_max_amount = 0;
            }
            ChemAction::ToggleMode => self.state.mode = !self.state.mode,
            ChemAction::GoScreen { screen } => self.state.screen = screen,
            ChemAction::Analyze { id } => {
                let entry = self
                    .state
                    .find_chemical(&id)
                    .ok_or_else(|| ApplyError::UnknownChemical(id.clone()))?;
                let mut vars = self.reagent_info.get(&id).cloned().unwrap_or_default();
                vars.name = entry.name.clone();
                self.state.analyze_vars = vars;
                self.state.screen = Screen::Analyze;
            }
            ChemAction::PillStyle { id } => {
                if !self.state.has_pill_style(id) {
                    return Err(ApplyError::UnknownPillStyle(id));
                }
                self.state.chosen_pill_style = Some(id);
            }
            ChemAction::Transfer { id, amount, to } => self.transfer(id, amount, to)?,
            ChemAction::Create { kind, amount, .. } => {
                if !(MIN_CREATE_AMOUNT..=MAX_CREATE_AMOUNT).contains(&amount) {
                    return Err(ApplyError::InvalidAmount(amount));
                }
                if kind.is_condiment() != self.state.condi {
                    return Err(ApplyError::UnavailablePackaging(kind.as_str()));
                }
                if self.state.buffer_contents.is_empty() {
                    debug!(kind = kind.as_str(), "create with empty buffer ignored");
                } else {
                    info!(kind = kind.as_str(), amount, "create accepted");
                }
            }
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        id: String,
        amount: TransferAmount,
        to: TransferTarget,
    ) -> Result<(), ApplyError> {
        if !self.state.is_beaker_loaded {
            return Err(ApplyError::NoBeaker);
        }
        let units = match amount {
            TransferAmount::Units(n) => f64::from(n),
            TransferAmount::All => f64::INFINITY,
            TransferAmount::Custom => {
                debug!(%id, "custom amount prompt not supported; ignoring");
                return Ok(());
            }
        };

        match to {
            TransferTarget::Buffer => {
                let moved = take(&mut self.state.beaker_contents, &id, units)?;
                put(&mut self.state.buffer_contents, moved);
            }
            TransferTarget::Beaker => {
                let free = (self.state.beaker_max_volume - beaker_volume(&self.state)).max(0.0);
                let units = if self.state.mode { units.min(free) } else { units };
                let moved = take(&mut self.state.buffer_contents, &id, units)?;
                if self.state.mode {
                    put(&mut self.state.beaker_contents, moved);
                }
            }
        }
        self.state.beaker_current_volume = beaker_volume(&self.state);
        Ok(())
    }

    fn push_update(&mut self) {
        let Some(src_ref) = self.active_ref.clone() else {
            return;
        };
        let msg = ServerMessage::Update {
            config: WindowConfig {
                src_ref,
                title: self.title.clone(),
            },
            data: self.state.clone(),
        };
        self.try_send(BackendOutbound::Send { msg });
    }

    fn send_error(&mut self, msg: String, code: ErrorCode) {
        self.try_send(BackendOutbound::Send {
            msg: ServerMessage::Error { msg, code },
        });
    }
}

fn beaker_volume(state: &StateSnapshot) -> f64 {
    state.beaker_contents.iter().map(|c| c.volume).sum()
}

fn take(list: &mut Vec<ChemicalEntry>, id: &str, units: f64) -> Result<ChemicalEntry, ApplyError> {
    let idx = list
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| ApplyError::UnknownChemical(id.to_string()))?;
    let moved = units.min(list[idx].volume);
    list[idx].volume -= moved;
    let entry = ChemicalEntry {
        id: list[idx].id.clone(),
        name: list[idx].name.clone(),
        volume: moved,
    };
    if list[idx].volume <= 0.0 {
        list.remove(idx);
    }
    Ok(entry)
}

fn put(list: &mut Vec<ChemicalEntry>, entry: ChemicalEntry) {
    if entry.volume <= 0.0 {
        return;
    }
    match list.iter_mut().find(|c| c.id == entry.id) {
        Some(existing) => existing.volume += entry.volume,
        None => list.push(entry),
    }
}

/// A loaded beaker with a few reagents, an empty buffer, and a pill bottle.
pub fn demo_snapshot() -> StateSnapshot {
    let chem = |id: &str, name: &str, volume: f64| ChemicalEntry {
        id: id.to_string(),
        name: name.to_string(),
        volume,
    };
    StateSnapshot {
        screen: Screen::Home,
        beaker_contents: vec![
            chem("bicaridine", "Bicaridine", 30.0),
            chem("kelotane", "Kelotane", 20.0),
            chem("water", "Water", 10.0),
        ],
        buffer_contents: Vec::new(),
        beaker_current_volume: 60.0,
        beaker_max_volume: 100.0,
        is_beaker_loaded: true,
        is_pill_bottle_loaded: true,
        pill_bottle_current_amount: 0,
        pill_bottle_max_amount: 50,
        mode: true,
        condi: false,
        chosen_pill_style: Some(1),
        pill_styles: (1..=5)
            .map(|id| PillStyle {
                id,
                class_name: format!("pill{id}"),
            })
            .collect(),
        analyze_vars: AnalyzeVars::default(),
    }
}

pub fn demo_reagent_info() -> Vec<(&'static str, AnalyzeVars)> {
    let vars = |state: &str, color: &str, description: &str, meta_rate: f64, over_d: f64| {
        AnalyzeVars {
            name: String::new(),
            state: state.to_string(),
            color: color.to_string(),
            description: description.to_string(),
            meta_rate,
            over_d,
            addic_d: 0.0,
        }
    };
    vec![
        (
            "bicaridine",
            vars("Liquid", "#C8A5DC", "Heals brute damage.", 0.4, 30.0),
        ),
        (
            "kelotane",
            vars("Liquid", "#FFA800", "Heals burn damage.", 0.4, 30.0),
        ),
        ("water", vars("Liquid", "#AAAAAA77", "A clear liquid.", 0.4, 0.0)),
    ]
}
