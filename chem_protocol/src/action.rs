use crate::snapshot::Screen;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ALL_UNITS: i32 = 1000;
pub const CUSTOM_AMOUNT: i32 = -1;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("invalid transfer amount: {0}")]
    InvalidAmount(i32),
    #[error("malformed {name} action: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferTarget {
    Beaker,
    Buffer,
}

impl TransferTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferTarget::Beaker => "beaker",
            TransferTarget::Buffer => "buffer",
        }
    }
}

/// Amount requested by a transfer button.
///
/// On the wire this is a plain integer: `1000` means "everything" and `-1`
/// asks the backend to prompt for a custom amount. `Units(1000)` therefore
/// reads back as `All`, and counts beyond `i32::MAX` saturate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(into = "i32", try_from = "i32")]
pub enum TransferAmount {
    Units(u32),
    All,
    Custom,
}

impl TransferAmount {
    /// The buttons offered next to every chemical entry, in display order.
    pub const STANDARD: [TransferAmount; 5] = [
        TransferAmount::Units(1),
        TransferAmount::Units(5),
        TransferAmount::Units(10),
        TransferAmount::All,
        TransferAmount::Custom,
    ];

    pub fn label(self) -> String {
        match self {
            TransferAmount::Units(n) => n.to_string(),
            TransferAmount::All => "All".to_string(),
            TransferAmount::Custom => "Custom amount".to_string(),
        }
    }
}

impl From<TransferAmount> for i32 {
    fn from(amount: TransferAmount) -> i32 {
        match amount {
            TransferAmount::Units(n) => i32::try_from(n).unwrap_or(i32::MAX),
            TransferAmount::All => ALL_UNITS,
            TransferAmount::Custom => CUSTOM_AMOUNT,
        }
    }
}

impl TryFrom<i32> for TransferAmount {
    type Error = ActionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            CUSTOM_AMOUNT => Ok(TransferAmount::Custom),
            ALL_UNITS => Ok(TransferAmount::All),
            n if n > 0 => Ok(TransferAmount::Units(n.unsigned_abs())),
            n => Err(ActionError::InvalidAmount(n)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PackagingKind {
    Pill,
    Patch,
    Bottle,
    Medipen,
    CondimentPack,
    CondimentBottle,
}

impl PackagingKind {
    pub const MEDICAL: [PackagingKind; 4] = [
        PackagingKind::Pill,
        PackagingKind::Patch,
        PackagingKind::Bottle,
        PackagingKind::Medipen,
    ];
    pub const CONDIMENT: [PackagingKind; 2] =
        [PackagingKind::CondimentPack, PackagingKind::CondimentBottle];

    pub fn as_str(self) -> &'static str {
        match self {
            PackagingKind::Pill => "pill",
            PackagingKind::Patch => "patch",
            PackagingKind::Bottle => "bottle",
            PackagingKind::Medipen => "medipen",
            PackagingKind::CondimentPack => "condimentPack",
            PackagingKind::CondimentBottle => "condimentBottle",
        }
    }

    pub fn is_condiment(self) -> bool {
        matches!(
            self,
            PackagingKind::CondimentPack | PackagingKind::CondimentBottle
        )
    }

    /// Kinds a device offers given its `condi` flag.
    pub fn available(condi: bool) -> &'static [PackagingKind] {
        if condi {
            &Self::CONDIMENT
        } else {
            &Self::MEDICAL
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreateVolume {
    #[default]
    Auto,
}

/// Every request the panel can send, with typed parameters.
///
/// Serializes as `{"name": ..., "params": {...}}`, the same shape as
/// [`ActionRequest`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "name", content = "params", rename_all = "camelCase")]
pub enum ChemAction {
    Eject,
    ToggleMode,
    Transfer {
        id: String,
        amount: TransferAmount,
        to: TransferTarget,
    },
    Analyze {
        id: String,
    },
    Create {
        #[serde(rename = "type")]
        kind: PackagingKind,
        amount: u8,
        #[serde(default)]
        volume: CreateVolume,
    },
    PillStyle {
        id: u32,
    },
    EjectPillBottle,
    GoScreen {
        screen: Screen,
    },
}

impl ChemAction {
    pub fn name(&self) -> &'static str {
        match self {
            ChemAction::Eject => "eject",
            ChemAction::ToggleMode => "toggleMode",
            ChemAction::Transfer { .. } => "transfer",
            ChemAction::Analyze { .. } => "analyze",
            ChemAction::Create { .. } => "create",
            ChemAction::PillStyle { .. } => "pillStyle",
            ChemAction::EjectPillBottle => "ejectPillBottle",
            ChemAction::GoScreen { .. } => "goScreen",
        }
    }
}

/// Untyped form of an action: a name plus primitive parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ActionRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl From<ChemAction> for ActionRequest {
    fn from(action: ChemAction) -> Self {
        let req = ActionRequest::new(action.name());
        match action {
            ChemAction::Eject | ChemAction::ToggleMode | ChemAction::EjectPillBottle => req,
            ChemAction::Transfer { id, amount, to } => req
                .param("id", id)
                .param("amount", i32::from(amount))
                .param("to", to.as_str()),
            ChemAction::Analyze { id } => req.param("id", id),
            ChemAction::Create { kind, amount, .. } => req
                .param("type", kind.as_str())
                .param("amount", amount)
                .param("volume", "auto"),
            ChemAction::PillStyle { id } => req.param("id", id),
            ChemAction::GoScreen { screen } => req.param("screen", screen.as_str()),
        }
    }
}

impl TryFrom<ActionRequest> for ChemAction {
    type Error = ActionError;

    fn try_from(req: ActionRequest) -> Result<Self, Self::Error> {
        let name = req.name;
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::String(name.clone()));
        if !req.params.is_empty() {
            obj.insert("params".to_string(), Value::Object(req.params));
        }
        serde_json::from_value(Value::Object(obj))
            .map_err(|source| ActionError::Malformed { name, source })
    }
}
