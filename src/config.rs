//! Engine configuration, read from JSON.

use serde::{Deserialize, Serialize};

use crate::{
    graphics::{Color, MaterialConfig},
    message::DEFAULT_MESSAGE_LIMIT,
    resources::load_string,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: u32,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: Color,
    /// Normal priority messages handled per frame.
    pub message_limit: usize,
    pub start_zone: Option<u32>,
    pub zones: Vec<ZoneConfig>,
    pub materials: Vec<MaterialConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear_color: Color::new(0x1D, 0x2B, 0x53, 0xFF),
            message_limit: DEFAULT_MESSAGE_LIMIT,
            start_zone: Some(0),
            zones: vec![ZoneConfig {
                id: 0,
                path: "zones/test-zone.json".to_string(),
            }],
            materials: vec![MaterialConfig {
                name: "default".to_string(),
                diffuse: None,
                tint: None,
            }],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `file` from the assets directory.
    pub async fn load(file: &str) -> anyhow::Result<Self> {
        let json = load_string(file).await?;
        Self::from_json_str(&json)
    }
}
