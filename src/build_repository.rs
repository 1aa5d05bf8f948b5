//! The user's garage: build records plus the premium entitlement.
//!
//! Every mutation rewrites the whole build list under [`BUILDS_KEY`]. There is
//! exactly one writer (the local session); two sessions writing the same store
//! race and the last write wins, which can drop likes or edits made by the
//! other session.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::build_model::{
    non_blank, or_default, BuildDraft, BuildPatch, UserConfiguration, DEFAULT_TITLE, NOT_AVAILABLE,
    STOCK, STOCK_ECU,
};
use crate::catalog::ReferenceCatalog;
use crate::catalog_model::Engine;
use crate::kv_store::{KeyValueStore, BUILDS_KEY, PREMIUM_KEY};

/// Builds a non-premium account may hold.
pub const FREE_BUILD_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub used: usize,
    /// `None` for premium accounts.
    pub limit: Option<usize>,
}

pub struct BuildRepository<S: KeyValueStore> {
    store: S,
    builds: Vec<UserConfiguration>,
    premium: bool,
}

impl<S: KeyValueStore> BuildRepository<S> {
    /// Loads builds and entitlement from the store. Missing or unreadable
    /// values start empty / free rather than failing.
    pub fn load(store: S) -> Self {
        let builds = match store.get(BUILDS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<UserConfiguration>>(&json) {
                Ok(builds) => builds,
                Err(e) => {
                    warn!("Stored builds are unreadable, starting with an empty garage: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Error loading garage builds: {e}");
                Vec::new()
            }
        };

        let premium = match store.get(PREMIUM_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("Error loading premium flag: {e}");
                false
            }
        };

        info!("Garage loaded: {} builds, premium={}", builds.len(), premium);

        Self { store, builds, premium }
    }

    pub fn builds(&self) -> &[UserConfiguration] {
        &self.builds
    }

    pub fn get_by_id(&self, id: &str) -> Option<&UserConfiguration> {
        self.builds.iter().find(|b| b.id == id)
    }

    pub fn is_premium(&self) -> bool {
        self.premium
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Changes the entitlement. Existing builds are never removed when it is
    /// turned off; the limit only applies to later creations.
    pub fn set_premium(&mut self, premium: bool) -> Result<(), AppResponse> {
        self.premium = premium;
        self.store
            .set(PREMIUM_KEY, if premium { "true" } else { "false" })
            .map_err(|e| {
                warn!("Error saving premium flag: {e}");
                AppResponse::DatabaseError(format!(
                    "Premium status changed but may not have been saved: {e}"
                ))
            })
    }

    pub fn quota_usage(&self) -> QuotaUsage {
        QuotaUsage {
            used: self.builds.len(),
            limit: (!self.premium).then_some(FREE_BUILD_LIMIT),
        }
    }

    /// Saves a new build for the currently selected engine.
    pub fn create(
        &mut self,
        draft: &BuildDraft,
        current_engine: Option<&Engine>,
        catalog: &ReferenceCatalog,
    ) -> Result<UserConfiguration, AppResponse> {
        let engine = current_engine.ok_or_else(|| {
            AppResponse::ValidationError(
                "Please select an engine before saving a configuration.".to_string(),
            )
        })?;

        if !self.premium && self.builds.len() >= FREE_BUILD_LIMIT {
            return Err(AppResponse::QuotaExceeded(format!(
                "Free Tier Limit Reached! You can save up to {FREE_BUILD_LIMIT} builds. \
                 Upgrade to Pro to save unlimited builds."
            )));
        }

        let shop_id = non_blank(&draft.shop_id);
        let shop_name = shop_id
            .as_deref()
            .and_then(|id| catalog.shop(id))
            .map(|shop| shop.name.clone());

        let build = UserConfiguration {
            id: self.next_id(),
            engine_code: engine.engine_code.clone(),
            engine_make: engine.make.clone(),
            engine_model: engine.model.clone(),
            title: or_default(&draft.title, DEFAULT_TITLE),
            description: draft.description.clone().unwrap_or_default(),
            photos: draft.photos.as_ref().map(|p| p.normalize()).unwrap_or_default(),
            dyno_link: draft.dyno_link.clone().unwrap_or_default(),
            is_public: draft.is_public.unwrap_or(false),
            likes: 0,
            pistons: or_default(&draft.pistons, NOT_AVAILABLE),
            rods: or_default(&draft.rods, NOT_AVAILABLE),
            crankshaft: or_default(&draft.crankshaft, NOT_AVAILABLE),
            compression_ratio: or_default(&draft.compression_ratio, NOT_AVAILABLE),
            horsepower: or_default(&draft.horsepower, NOT_AVAILABLE),
            torque: or_default(&draft.torque, NOT_AVAILABLE),
            shop_id,
            shop_name,
            induction_type: draft.induction_type.unwrap_or_default(),
            injector_size: or_default(&draft.injector_size, STOCK),
            fuel_pump: or_default(&draft.fuel_pump, STOCK),
            engine_management: or_default(&draft.engine_management, STOCK_ECU),
            head_gasket_mod: draft.head_gasket_mod.unwrap_or_default(),
            intake_manifold_type: draft.intake_manifold_type.unwrap_or_default(),
        };

        self.builds.push(build.clone());
        info!("Build {} saved for {}", build.id, engine.key());
        self.persist("save build")?;
        Ok(build)
    }

    /// Applies an edit. `Ok(None)` when no build has that id.
    pub fn update(
        &mut self,
        id: &str,
        patch: &BuildPatch,
        catalog: &ReferenceCatalog,
    ) -> Result<Option<UserConfiguration>, AppResponse> {
        let Some(build) = self.builds.iter_mut().find(|b| b.id == id) else {
            warn!("Update skipped, no build with id {id}");
            return Ok(None);
        };

        if build.apply_patch(patch) {
            build.shop_name = build
                .shop_id
                .as_deref()
                .and_then(|shop_id| catalog.shop(shop_id))
                .map(|shop| shop.name.clone());
        }
        let updated = build.clone();

        self.persist("save changes")?;
        Ok(Some(updated))
    }

    /// Removes a build. Deleting an unknown id is a no-op that returns false.
    pub fn delete(&mut self, id: &str) -> Result<bool, AppResponse> {
        let before = self.builds.len();
        self.builds.retain(|b| b.id != id);
        if self.builds.len() == before {
            return Ok(false);
        }

        self.persist("delete build")?;
        Ok(true)
    }

    /// Flips the public flag. Returns the new value, `None` for an unknown id.
    pub fn toggle_visibility(&mut self, id: &str) -> Result<Option<bool>, AppResponse> {
        let Some(build) = self.builds.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        build.is_public = !build.is_public;
        let is_public = build.is_public;

        self.persist("update build visibility")?;
        Ok(Some(is_public))
    }

    /// Adds one like. Returns the new count, `None` for an unknown id.
    pub fn like(&mut self, id: &str) -> Result<Option<u32>, AppResponse> {
        let Some(build) = self.builds.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        build.likes = build.likes.saturating_add(1);
        let likes = build.likes;

        self.persist("like build")?;
        Ok(Some(likes))
    }

    /// Builds shown in the community showcase.
    pub fn public_builds(&self) -> Vec<&UserConfiguration> {
        self.builds.iter().filter(|b| b.is_public).collect()
    }

    pub fn builds_for_engine(&self, engine_code: &str) -> Vec<&UserConfiguration> {
        self.builds.iter().filter(|b| b.engine_code == engine_code).collect()
    }

    /// Public builds credited to a shop.
    pub fn verified_builds_for_shop(&self, shop_id: &str) -> Vec<&UserConfiguration> {
        self.builds
            .iter()
            .filter(|b| b.is_public && b.shop_id.as_deref() == Some(shop_id))
            .collect()
    }

    /// Millisecond timestamp, bumped until it is unused.
    fn next_id(&self) -> String {
        let mut candidate = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        while self.builds.iter().any(|b| b.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    /// Writes the whole list. On failure the in-memory change is kept and the
    /// caller gets a notice that it may not have been saved.
    fn persist(&mut self, operation: &str) -> Result<(), AppResponse> {
        let json = serde_json::to_string(&self.builds)?;
        self.store.set(BUILDS_KEY, &json).map_err(|e| {
            warn!("Failed to {operation}: {e}");
            AppResponse::DatabaseError(format!(
                "Failed to {operation}; the change may not have been saved ({e})"
            ))
        })
    }
}
