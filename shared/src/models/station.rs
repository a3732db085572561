//! Kitchen preparation stations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Station type — determines which routing keyword bucket feeds it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationType {
    Grill,
    Fryer,
    Salad,
    /// Expediting / pass station — fallback target for unmatched items
    Expo,
    Bar,
    Prep,
    Dessert,
}

impl StationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationType::Grill => "grill",
            StationType::Fryer => "fryer",
            StationType::Salad => "salad",
            StationType::Expo => "expo",
            StationType::Bar => "bar",
            StationType::Prep => "prep",
            StationType::Dessert => "dessert",
        }
    }
}

impl std::fmt::Display for StationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical preparation area that receives order items
///
/// Created and updated by administrative action; read-heavy, rarely
/// mutated, so station listings cache with a long TTL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub station_type: StationType,
    /// Display order on the kitchen screen
    pub position: i32,
    pub color: String,
    pub is_active: bool,
    /// Opaque per-station configuration blob
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl Station {
    pub fn new(id: impl Into<String>, name: impl Into<String>, station_type: StationType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            station_type,
            position: 0,
            color: String::new(),
            is_active: true,
            settings: HashMap::new(),
        }
    }
}
