//! Make → model → engine drill-down.
//!
//! Each step clears everything below it. Resolving an engine code against the
//! catalog is the only way into [`Selection::EngineSelected`]; a triple that no
//! longer resolves drops the selection back to the start without an error.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::catalog::ReferenceCatalog;
use crate::catalog_model::{Engine, EngineKey};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    NoMakeSelected,
    MakeSelected {
        make: String,
    },
    ModelSelected {
        make: String,
        model: String,
    },
    EngineSelected {
        key: EngineKey,
    },
}

/// Result of picking an engine code.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResolution {
    Resolved(Engine),
    /// The triple matched nothing; the selection has been reset.
    Unresolved,
}

impl Selection {
    pub fn make(&self) -> Option<&str> {
        match self {
            Selection::NoMakeSelected => None,
            Selection::MakeSelected { make } | Selection::ModelSelected { make, .. } => Some(make),
            Selection::EngineSelected { key } => Some(&key.make),
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Selection::ModelSelected { model, .. } => Some(model),
            Selection::EngineSelected { key } => Some(&key.model),
            _ => None,
        }
    }

    pub fn engine_key(&self) -> Option<&EngineKey> {
        match self {
            Selection::EngineSelected { key } => Some(key),
            _ => None,
        }
    }

    /// Picks a make. An empty make clears the selection entirely.
    pub fn select_make(&mut self, make: &str) {
        *self = if make.is_empty() {
            Selection::NoMakeSelected
        } else {
            Selection::MakeSelected { make: make.to_string() }
        };
    }

    /// Picks a model under the current make. An empty model steps back to
    /// [`Selection::MakeSelected`].
    pub fn select_model(&mut self, model: &str) -> Result<(), AppResponse> {
        let make = self
            .make()
            .ok_or_else(|| {
                AppResponse::ValidationError("Select a make before choosing a model".to_string())
            })?
            .to_string();

        *self = if model.is_empty() {
            Selection::MakeSelected { make }
        } else {
            Selection::ModelSelected {
                make,
                model: model.to_string(),
            }
        };
        Ok(())
    }

    /// Picks an engine code under the current make and model and resolves it.
    pub fn select_engine(
        &mut self,
        engine_code: &str,
        catalog: &ReferenceCatalog,
    ) -> Result<EngineResolution, AppResponse> {
        let (make, model) = match (self.make(), self.model()) {
            (Some(make), Some(model)) => (make.to_string(), model.to_string()),
            _ => {
                return Err(AppResponse::ValidationError(
                    "Select a make and model before choosing an engine".to_string(),
                ))
            }
        };

        let key = EngineKey::new(make, model, engine_code);
        match catalog.find_engine(&key) {
            Some(engine) => {
                let engine = engine.clone();
                *self = Selection::EngineSelected { key };
                Ok(EngineResolution::Resolved(engine))
            }
            None => {
                *self = Selection::NoMakeSelected;
                Ok(EngineResolution::Unresolved)
            }
        }
    }
}
