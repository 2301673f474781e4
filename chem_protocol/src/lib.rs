mod action;
mod lenient;
mod snapshot;

pub use action::{
    ActionError, ActionRequest, ChemAction, CreateVolume, PackagingKind, TransferAmount,
    TransferTarget, ALL_UNITS, CUSTOM_AMOUNT,
};
pub use snapshot::{AnalyzeVars, ChemicalEntry, PillStyle, Screen, StateSnapshot};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Busy,
    TargetNotFound,
    InvalidValue,
    InvalidCommand,
    InternalError,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowConfig {
    /// Opaque window reference; every action must echo it back.
    #[serde(rename = "ref")]
    pub src_ref: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ServerMessage {
    Update {
        config: WindowConfig,
        #[serde(default, deserialize_with = "lenient::or_default")]
        data: StateSnapshot,
    },
    Error {
        msg: String,
        code: ErrorCode,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ClientCommand {
    Act {
        #[serde(rename = "ref")]
        src_ref: String,
        action: ActionRequest,
    },
}

impl ClientCommand {
    pub fn src_ref(&self) -> &str {
        match self {
            ClientCommand::Act { src_ref, .. } => src_ref,
        }
    }
}
