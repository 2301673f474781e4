use crate::lenient;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Analyze,
    #[default]
    #[serde(other)]
    Home,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Analyze => "analyze",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChemicalEntry {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub volume: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PillStyle {
    #[serde(deserialize_with = "lenient::id")]
    pub id: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub class_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeVars {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub state: String,
    #[serde(deserialize_with = "lenient::text")]
    pub color: String,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Units metabolized per minute.
    #[serde(deserialize_with = "lenient::number")]
    pub meta_rate: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub over_d: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub addic_d: f64,
}

/// Point-in-time copy of the device state pushed by the backend.
///
/// Every field is optional on the wire: absent or null values fall back to
/// their defaults, so a partial update never fails to decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(deserialize_with = "lenient::or_default_on_error")]
    pub screen: Screen,
    #[serde(deserialize_with = "lenient::entries")]
    pub beaker_contents: Vec<ChemicalEntry>,
    #[serde(deserialize_with = "lenient::entries")]
    pub buffer_contents: Vec<ChemicalEntry>,
    #[serde(deserialize_with = "lenient::number")]
    pub beaker_current_volume: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub beaker_max_volume: f64,
    #[serde(deserialize_with = "lenient::truthy")]
    pub is_beaker_loaded: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub is_pill_bottle_loaded: bool,
    #[serde(deserialize_with = "lenient::count")]
    pub pill_bottle_current_amount: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub pill_bottle_max_amount: u32,
    /// `true` moves buffer contents back into the beaker, `false` destroys them.
    #[serde(deserialize_with = "lenient::truthy")]
    pub mode: bool,
    #[serde(deserialize_with = "lenient::truthy")]
    pub condi: bool,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub chosen_pill_style: Option<u32>,
    /// Entries without a usable id are skipped.
    #[serde(deserialize_with = "lenient::entries")]
    pub pill_styles: Vec<PillStyle>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub analyze_vars: AnalyzeVars,
}

impl StateSnapshot {
    pub fn find_chemical(&self, id: &str) -> Option<&ChemicalEntry> {
        self.beaker_contents
            .iter()
            .chain(self.buffer_contents.iter())
            .find(|c| c.id == id)
    }

    pub fn has_pill_style(&self, id: u32) -> bool {
        self.pill_styles.iter().any(|p| p.id == id)
    }
}
