//! JSON-serializable views of solver results, for machine consumers of the
//! CLI (`--json`).

use serde::{Deserialize, Serialize};

use crate::solver::SolveOutcome;
use crate::Table;

/// One table snapshot: each group as its tiles in text notation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableJson {
    pub groups: Vec<Vec<String>>,
}

impl TableJson {
    pub fn from_table(table: &Table) -> Self {
        TableJson {
            groups: table
                .groups()
                .iter()
                .map(|g| g.tiles().map(|t| t.to_string()).collect())
                .collect(),
        }
    }
}

/// The full result of a solve run.
#[derive(Debug, Serialize, Deserialize)]
pub struct SolveReport {
    pub success: bool,
    /// The hand tile that was placed, in text notation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile: Option<String>,
    /// Moves between the seeded state and the winning state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<usize>,
    /// Table snapshots from seeded to winning state, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<TableJson>>,
    /// Nodes expanded across all per-tile searches.
    pub expansions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SolveReport {
    pub fn from_outcome(outcome: &SolveOutcome) -> Self {
        match &outcome.solution {
            Some(solution) => SolveReport {
                success: true,
                tile: Some(solution.tile.to_string()),
                moves: Some(solution.move_count()),
                steps: Some(solution.steps.iter().map(TableJson::from_table).collect()),
                expansions: outcome.expansions,
                error: None,
            },
            None => SolveReport {
                success: false,
                tile: None,
                moves: None,
                steps: None,
                expansions: outcome.expansions,
                error: Some("no legal placement exists for any hand tile within the search budget".to_string()),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"serialization error: {}"}}"#, e))
    }
}
