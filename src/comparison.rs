//! Side-by-side engine comparison.

use log::debug;
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::catalog_model::{Engine, SpecField};

/// Engines a non-premium account may compare at once.
pub const FREE_COMPARISON_LIMIT: usize = 2;

/// One spec line of the table: a label plus one cell per compared engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub field: SpecField,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonTable {
    engines: Vec<Engine>,
}

impl ComparisonTable {
    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Appends an engine. Returns false when it is already in the table.
    pub fn add(&mut self, engine: &Engine, premium: bool) -> Result<bool, AppResponse> {
        if self.engines.iter().any(|e| e.matches(&engine.key())) {
            return Ok(false);
        }

        if !premium && self.engines.len() >= FREE_COMPARISON_LIMIT {
            return Err(AppResponse::QuotaExceeded(format!(
                "Free Tier Limited: You can compare up to {FREE_COMPARISON_LIMIT} engines. \
                 Upgrade to Pro for unlimited comparisons."
            )));
        }

        debug!("Comparing {}", engine.key());
        self.engines.push(engine.clone());
        Ok(true)
    }

    /// Removes the engine at `index`; out of range is ignored.
    pub fn remove(&mut self, index: usize) -> Option<Engine> {
        (index < self.engines.len()).then(|| self.engines.remove(index))
    }

    pub fn clear(&mut self) {
        self.engines.clear();
    }

    pub fn rows(&self) -> Vec<ComparisonRow> {
        SpecField::ALL
            .iter()
            .map(|&field| ComparisonRow {
                field,
                label: field.label(),
                unit: field.unit(),
                cells: self.engines.iter().map(|engine| cell(engine, field)).collect(),
            })
            .collect()
    }
}

fn cell(engine: &Engine, field: SpecField) -> String {
    match (engine.spec_value(field), field.unit()) {
        (Some(value), Some(unit)) => format!("{value} {unit}"),
        (Some(value), None) => value.to_string(),
        (None, _) => String::new(),
    }
}
