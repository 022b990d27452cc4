//! Knitting library document: saved patterns and active projects.
//!
//! This is the shape the tracker syncs. The sync layer itself never looks
//! inside it; callers pass it to `save` and read it back with `fetch_as`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current document layout version
pub const LIBRARY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Library {
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
    pub saved_patterns: Vec<Pattern>,
    pub active_projects: Vec<Project>,
}

impl Default for Library {
    fn default() -> Self {
        Self {
            version: LIBRARY_VERSION,
            updated_at: None,
            saved_patterns: Vec::new(),
            active_projects: Vec::new(),
        }
    }
}

impl Library {
    /// Stamp `updatedAt` before a save
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.saved_patterns.iter().find(|p| p.id == id)
    }

    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.active_projects.iter_mut().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: PatternKind,
}

/// Chart patterns are a grid of stitch symbols, text patterns a list of row instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PatternKind {
    Chart { rows: Vec<Vec<String>> },
    Text { instructions: Vec<String> },
}

impl Pattern {
    pub fn row_count(&self) -> usize {
        match &self.kind {
            PatternKind::Chart { rows } => rows.len(),
            PatternKind::Text { instructions } => instructions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub current_row: u32,
    #[serde(default)]
    pub total_rows: u32,
}

impl Project {
    /// Whole-number progress, 0 for a project without rows
    pub fn progress_percent(&self) -> u8 {
        if self.total_rows == 0 {
            return 0;
        }
        let pct = u64::from(self.current_row) * 100 / u64::from(self.total_rows);
        pct.min(100) as u8
    }

    /// Move forward `rows`, stopping at the last row
    pub fn advance(&mut self, rows: u32) {
        self.current_row = self.current_row.saturating_add(rows).min(self.total_rows);
    }

    pub fn is_finished(&self) -> bool {
        self.total_rows > 0 && self.current_row >= self.total_rows
    }
}
