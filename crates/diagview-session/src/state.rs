use crate::Result;
use diagview_core::ContainerId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a viewer remembers between runs: the last case file and the displayed containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<ContainerId>,
    #[serde(default)]
    pub checked: Vec<ContainerId>,
}

impl ViewerState {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
