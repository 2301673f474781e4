use crate::bridge::ActionSink;
use crate::protocol::{ChemAction, StateSnapshot};
use chem_protocol::{
    ChemicalEntry, CreateVolume, PackagingKind, PillStyle, Screen, TransferAmount,
    TransferTarget,
};

pub const MIN_CREATE_AMOUNT: u8 = 1;
pub const MAX_CREATE_AMOUNT: u8 = 10;

/// Quantities typed into the packaging rows. Lives as long as the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackagingAmounts {
    pub pill: u8,
    pub patch: u8,
    pub bottle: u8,
    pub medipen: u8,
    pub pack: u8,
}

impl Default for PackagingAmounts {
    fn default() -> Self {
        Self {
            pill: MIN_CREATE_AMOUNT,
            patch: MIN_CREATE_AMOUNT,
            bottle: MIN_CREATE_AMOUNT,
            medipen: MIN_CREATE_AMOUNT,
            pack: MIN_CREATE_AMOUNT,
        }
    }
}

impl PackagingAmounts {
    pub fn get(&self, kind: PackagingKind) -> u8 {
        match kind {
            PackagingKind::Pill => self.pill,
            PackagingKind::Patch => self.patch,
            PackagingKind::Bottle | PackagingKind::CondimentBottle => self.bottle,
            PackagingKind::Medipen => self.medipen,
            PackagingKind::CondimentPack => self.pack,
        }
    }

    /// Stores `value` clamped to the creatable range and returns what was kept.
    pub fn set(&mut self, kind: PackagingKind, value: i64) -> u8 {
        let clamped = value.clamp(i64::from(MIN_CREATE_AMOUNT), i64::from(MAX_CREATE_AMOUNT));
        let clamped = u8::try_from(clamped).unwrap_or(MIN_CREATE_AMOUNT);
        let slot = match kind {
            PackagingKind::Pill => &mut self.pill,
            PackagingKind::Patch => &mut self.patch,
            PackagingKind::Bottle | PackagingKind::CondimentBottle => &mut self.bottle,
            PackagingKind::Medipen => &mut self.medipen,
            PackagingKind::CondimentPack => &mut self.pack,
        };
        *slot = clamped;
        clamped
    }
}

/// Something the user can press on the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    EjectBeaker,
    ToggleMode,
    Transfer {
        id: String,
        amount: TransferAmount,
        to: TransferTarget,
    },
    Analyze {
        id: String,
    },
    SelectPillStyle {
        id: u32,
    },
    Create {
        kind: PackagingKind,
    },
    EjectPillBottle,
    Back,
}

#[derive(Debug)]
pub enum Panel<'a> {
    Home(HomePanel<'a>),
    Analysis(AnalysisPanel),
}

#[derive(Debug)]
pub struct HomePanel<'a> {
    pub beaker: BeakerSection<'a>,
    pub buffer: BufferSection<'a>,
    pub packaging: PackagingSection<'a>,
    pub pill_bottle: Option<PillBottleSection>,
}

#[derive(Debug)]
pub struct BeakerSection<'a> {
    /// `(current, max)` units, only shown while a beaker is loaded.
    pub volume: Option<(f64, f64)>,
    pub note: Option<&'static str>,
    pub rows: Vec<ChemicalRow<'a>>,
    pub controls: Vec<Control>,
}

#[derive(Debug)]
pub struct BufferSection<'a> {
    pub mode_label: &'static str,
    pub note: Option<&'static str>,
    pub rows: Vec<ChemicalRow<'a>>,
    pub controls: Vec<Control>,
}

#[derive(Debug)]
pub struct ChemicalRow<'a> {
    pub entry: &'a ChemicalEntry,
    pub controls: Vec<Control>,
}

impl ChemicalRow<'_> {
    pub fn label(&self) -> String {
        format!("{} units of {}", self.entry.volume, self.entry.name)
    }
}

#[derive(Debug)]
pub struct PackagingSection<'a> {
    pub pill_styles: Vec<PillStyleChoice<'a>>,
    pub rows: Vec<PackagingRow>,
}

#[derive(Debug)]
pub struct PillStyleChoice<'a> {
    pub style: &'a PillStyle,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRow {
    pub kind: PackagingKind,
    pub label: &'static str,
    pub unit: &'static str,
    pub side_note: &'static str,
    pub amount: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillBottleSection {
    pub current: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPanel {
    pub fields: Vec<(&'static str, String)>,
    pub color: String,
}

fn packaging_row(kind: PackagingKind, amount: u8) -> PackagingRow {
    let (label, unit, side_note) = match kind {
        PackagingKind::Pill => ("Pills", "pills", "max 50u"),
        PackagingKind::Patch => ("Patches", "patches", "max 40u"),
        PackagingKind::Bottle => ("Bottles", "bottles", "max 30u"),
        PackagingKind::Medipen => ("Medipens", "medipens", "max 10u"),
        PackagingKind::CondimentPack => ("Packs", "packs", "max 10u"),
        PackagingKind::CondimentBottle => ("Bottles", "bottles", "max 50u"),
    };
    PackagingRow {
        kind,
        label,
        unit,
        side_note,
        amount,
    }
}

fn chemical_rows(entries: &[ChemicalEntry], to: TransferTarget) -> Vec<ChemicalRow<'_>> {
    entries
        .iter()
        .map(|entry| {
            let mut controls: Vec<Control> = TransferAmount::STANDARD
                .iter()
                .map(|amount| Control::Transfer {
                    id: entry.id.clone(),
                    amount: *amount,
                    to,
                })
                .collect();
            controls.push(Control::Analyze {
                id: entry.id.clone(),
            });
            ChemicalRow { entry, controls }
        })
        .collect()
}

/// View model of the ChemMaster panel.
///
/// Holds only the local packaging quantities; everything else is derived from
/// the snapshot passed in on each call.
#[derive(Debug, Default)]
pub struct ChemMasterView {
    amounts: PackagingAmounts,
}

impl ChemMasterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amounts(&self) -> &PackagingAmounts {
        &self.amounts
    }

    pub fn set_amount(&mut self, kind: PackagingKind, value: i64) -> u8 {
        self.amounts.set(kind, value)
    }

    pub fn panel<'a>(&self, snap: &'a StateSnapshot) -> Panel<'a> {
        match snap.screen {
            Screen::Analyze => Panel::Analysis(self.analysis(snap)),
            Screen::Home => Panel::Home(self.home(snap)),
        }
    }

    fn home<'a>(&self, snap: &'a StateSnapshot) -> HomePanel<'a> {
        let beaker = BeakerSection {
            volume: snap
                .is_beaker_loaded
                .then_some((snap.beaker_current_volume, snap.beaker_max_volume)),
            note: if !snap.is_beaker_loaded {
                Some("No beaker loaded.")
            } else if snap.beaker_contents.is_empty() {
                Some("Beaker is empty.")
            } else {
                None
            },
            rows: chemical_rows(&snap.beaker_contents, TransferTarget::Buffer),
            controls: if snap.is_beaker_loaded {
                vec![Control::EjectBeaker]
            } else {
                Vec::new()
            },
        };

        let buffer = BufferSection {
            mode_label: if snap.mode { "Transfer" } else { "Destroy" },
            note: snap
                .buffer_contents
                .is_empty()
                .then_some("Buffer is empty."),
            rows: chemical_rows(&snap.buffer_contents, TransferTarget::Beaker),
            controls: vec![Control::ToggleMode],
        };

        let pill_styles = if snap.condi {
            Vec::new()
        } else {
            snap.pill_styles
                .iter()
                .map(|style| PillStyleChoice {
                    style,
                    selected: snap.chosen_pill_style == Some(style.id),
                })
                .collect()
        };
        let packaging = PackagingSection {
            pill_styles,
            rows: PackagingKind::available(snap.condi)
                .iter()
                .map(|kind| packaging_row(*kind, self.amounts.get(*kind)))
                .collect(),
        };

        let pill_bottle = snap.is_pill_bottle_loaded.then(|| PillBottleSection {
            current: snap.pill_bottle_current_amount,
            max: snap.pill_bottle_max_amount,
        });

        HomePanel {
            beaker,
            buffer,
            packaging,
            pill_bottle,
        }
    }

    fn analysis(&self, snap: &StateSnapshot) -> AnalysisPanel {
        let vars = &snap.analyze_vars;
        AnalysisPanel {
            fields: vec![
                ("Name", vars.name.clone()),
                ("State", vars.state.clone()),
                ("Color", vars.color.clone()),
                ("Description", vars.description.clone()),
                ("Metabolization Rate", format!("{} u/minute", vars.meta_rate)),
                ("Overdose Threshold", vars.over_d.to_string()),
                ("Addiction Threshold", vars.addic_d.to_string()),
            ],
            color: vars.color.clone(),
        }
    }

    /// Every control the panel offers for `snap`.
    pub fn controls(&self, snap: &StateSnapshot) -> Vec<Control> {
        let home = match self.panel(snap) {
            Panel::Analysis(_) => return vec![Control::Back],
            Panel::Home(home) => home,
        };

        let mut out = home.beaker.controls;
        out.extend(home.beaker.rows.into_iter().flat_map(|r| r.controls));
        out.extend(home.buffer.controls);
        out.extend(home.buffer.rows.into_iter().flat_map(|r| r.controls));
        out.extend(
            home.packaging
                .pill_styles
                .iter()
                .map(|c| Control::SelectPillStyle { id: c.style.id }),
        );
        out.extend(
            home.packaging
                .rows
                .iter()
                .map(|r| Control::Create { kind: r.kind }),
        );
        if home.pill_bottle.is_some() {
            out.push(Control::EjectPillBottle);
        }
        out
    }

    /// Action for pressing `control`, or `None` when `snap` does not offer it.
    pub fn activate(&self, snap: &StateSnapshot, control: &Control) -> Option<ChemAction> {
        if !self.controls(snap).contains(control) {
            return None;
        }
        let action = match control {
            Control::EjectBeaker => ChemAction::Eject,
            Control::ToggleMode => ChemAction::ToggleMode,
            Control::Transfer { id, amount, to } => ChemAction::Transfer {
                id: id.clone(),
                amount: *amount,
                to: *to,
            },
            Control::Analyze { id } => ChemAction::Analyze { id: id.clone() },
            Control::SelectPillStyle { id } => ChemAction::PillStyle { id: *id },
            Control::Create { kind } => ChemAction::Create {
                kind: *kind,
                amount: self.amounts.get(*kind),
                volume: CreateVolume::Auto,
            },
            Control::EjectPillBottle => ChemAction::EjectPillBottle,
            Control::Back => return self.go_screen(snap, Screen::Home),
        };
        Some(action)
    }

    /// `None` when `screen` is already showing.
    pub fn go_screen(&self, snap: &StateSnapshot, screen: Screen) -> Option<ChemAction> {
        (snap.screen != screen).then_some(ChemAction::GoScreen { screen })
    }

    /// Activates `control` and hands the resulting action to `sink`.
    /// Returns whether anything was dispatched.
    pub fn press(&self, sink: &dyn ActionSink, snap: &StateSnapshot, control: &Control) -> bool {
        match self.activate(snap, control) {
            Some(action) => {
                sink.dispatch(action);
                true
            }
            None => false,
        }
    }
}
