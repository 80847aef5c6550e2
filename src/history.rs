use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-step log of one agent run. Serialized as `{"history": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub model_output: Option<ModelOutput>,
    #[serde(default)]
    pub result: Vec<ActionResult>,
    #[serde(default)]
    pub state: PageState,
    pub metadata: Option<StepMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub current_state: AgentBrain,
    #[serde(default)]
    pub action: Vec<serde_json::Value>,
}

/// The model's own account of where it is and what it will do next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentBrain {
    #[serde(default)]
    pub evaluation_previous_goal: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub next_goal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub is_done: bool,
    pub extracted_content: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub step_number: usize,
    /// Seconds since the Unix epoch.
    pub step_start_time: f64,
    pub step_end_time: f64,
}

impl AgentHistory {
    pub fn push(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn is_done(&self) -> bool {
        self.last_result().is_some_and(|r| r.is_done)
    }

    /// Content of the terminal `done` action, if the run finished.
    pub fn final_result(&self) -> Option<&str> {
        self.last_result()
            .filter(|r| r.is_done)
            .and_then(|r| r.extracted_content.as_deref())
    }

    pub fn errors(&self) -> Vec<&str> {
        self.history
            .iter()
            .flat_map(|entry| entry.result.iter())
            .filter_map(|r| r.error.as_deref())
            .collect()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn last_result(&self) -> Option<&ActionResult> {
        self.history.last().and_then(|entry| entry.result.last())
    }
}
