//! Scan configuration model: a reusable bundle of target description and
//! tool settings owned by a project. Jobs snapshot this data at creation,
//! so later edits never affect in-flight jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanConfiguration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub has_predefined_targets: bool,
    pub target_details: Option<serde_json::Value>,
    pub tool_settings: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScanConfiguration {
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub has_predefined_targets: bool,
    pub target_details: Option<serde_json::Value>,
    pub tool_settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateScanConfiguration {
    pub name: Option<String>,
    pub description: Option<String>,
    pub has_predefined_targets: Option<bool>,
    pub target_details: Option<serde_json::Value>,
    pub tool_settings: Option<serde_json::Value>,
}
