// ABOUTME: Opaque display records fetched from the backend
// Shapes follow the API contract; the client adds no invariants beyond display

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A running challenge container. `pod_name` plus one of
/// `container_names` is everything the exec bridge needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub pod_name: String,
    pub container_names: Vec<String>,
    #[serde(default)]
    pub team_label: Option<String>,
    #[serde(default)]
    pub challenge_name: Option<String>,
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
}

impl ContainerInfo {
    /// Label shown in the terminal window title bar.
    pub fn display_label(&self) -> &str {
        self.team_label.as_deref().unwrap_or(&self.pod_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: i64,
    pub name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSummary {
    pub challenge_id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_id: i64,
    pub name: String,
    #[serde(default)]
    pub score: Option<i64>,
}
