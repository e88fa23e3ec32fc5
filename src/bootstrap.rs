use leptos::logging::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::reorder_core::{Block, BlockId, BlockOrder, CoreError, Dashboard, Region, RegionId};

pub const BOOTSTRAP_GLOBAL: &str = "__DASHBOARD__";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoint: String,
    pub id_prefix_len: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: "/update_index".to_string(),
            id_prefix_len: 3,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PageBootstrap {
    pub config: DashboardConfig,
    pub regions: Vec<RegionSeed>,
    pub saved_order: Vec<BlockId>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RegionSeed {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<BlockSeed>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BlockSeed {
    pub dom_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("malformed dashboard bootstrap: {0}")]
    Malformed(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PageBootstrap {
    pub fn from_json(raw: &str) -> Result<Self, BootstrapError> {
        serde_json::from_str(raw).map_err(|e| BootstrapError::Malformed(e.to_string()))
    }

    /// Reads `window.__DASHBOARD__`. A page without it gets an empty dashboard.
    pub fn from_window() -> Result<Self, BootstrapError> {
        let window = web_sys::window()
            .ok_or_else(|| BootstrapError::Malformed("window is unavailable".to_string()))?;
        let value = js_sys::Reflect::get(&window, &JsValue::from_str(BOOTSTRAP_GLOBAL))
            .map_err(|e| BootstrapError::Malformed(format!("{e:?}")))?;
        if value.is_undefined() || value.is_null() {
            warn!("window.{} is not set, rendering an empty dashboard", BOOTSTRAP_GLOBAL);
            return Ok(Self::default());
        }
        if let Some(raw) = value.as_string() {
            return Self::from_json(&raw);
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| BootstrapError::Malformed(e.to_string()))
    }

    /// Builds the dashboard. Blocks whose element id yields no entity id are
    /// dropped with a warning; duplicates are an error.
    pub fn into_dashboard(self) -> Result<(DashboardConfig, Dashboard), BootstrapError> {
        let prefix_len = self.config.id_prefix_len;
        let mut regions = Vec::with_capacity(self.regions.len());
        for seed in self.regions {
            let mut blocks = Vec::with_capacity(seed.blocks.len());
            for block in seed.blocks {
                match Block::from_dom_id(block.dom_id, block.title, prefix_len) {
                    Ok(block) => blocks.push(block),
                    Err(err) => warn!("skipping block in region {}: {}", seed.id, err),
                }
            }
            let blocks = BlockOrder::new(blocks)?;
            if blocks.is_empty() {
                warn!("region {} has no blocks", seed.id);
            }
            regions.push(Region {
                id: RegionId::new(seed.id),
                title: seed.title,
                blocks,
            });
        }
        let mut dashboard = Dashboard::new(regions)?;
        dashboard.apply_saved_order(&self.saved_order);
        Ok((self.config, dashboard))
    }
}
