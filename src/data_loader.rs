//! # Data Loading Module
//!
//! This module is responsible for loading the external data the engine needs:
//! question catalogs and engine configuration. A default catalog is embedded
//! in the binary at compile time using `include_str!`; alternative catalogs
//! and configs are read from JSON files on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::config::EngineConfig;
use crate::question::QuestionRecord;

/// Supplies the question pool for a game.
///
/// Implementations may return an empty list; the controller reports that as
/// `NoQuestionsAvailable`. Ordering is not significant, the engine shuffles.
pub trait QuestionProvider {
    fn get_questions(&self, game_id: &str) -> Vec<QuestionRecord>;
}

/// Represents the structure of a catalog file.
///
/// `{ "games": { "<game id>": [ <question record>, ... ] } }`
#[derive(Deserialize, Debug, Default)]
pub struct Catalog {
    #[serde(default)]
    games: BTreeMap<String, Vec<QuestionRecord>>,
}

/// Question provider backed by a JSON catalog held in memory.
#[derive(Debug, Default)]
pub struct JsonQuestionProvider {
    catalog: Catalog,
}

impl JsonQuestionProvider {
    /// Parses a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json).context("Failed to parse question catalog")?;
        debug!("Loaded catalog with {} games", catalog.games.len());
        Ok(JsonQuestionProvider { catalog })
    }

    /// Reads and parses a catalog file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read question catalog {}", path.display()))?;
        Self::from_json(&json)
    }

    /// The catalog shipped inside the binary.
    pub fn embedded() -> Result<Self> {
        let json = include_str!("../data/questions.json");
        Self::from_json(json)
    }

    /// Game ids present in the catalog, sorted.
    pub fn game_ids(&self) -> Vec<&str> {
        self.catalog.games.keys().map(String::as_str).collect()
    }
}

impl QuestionProvider for JsonQuestionProvider {
    fn get_questions(&self, game_id: &str) -> Vec<QuestionRecord> {
        self.catalog.games.get(game_id).cloned().unwrap_or_default()
    }
}

/// Loads engine settings from a JSON file. Missing fields take their defaults.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read engine config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse engine config {}", path.display()))?;
    Ok(config)
}
