//! Immutable in-memory reference catalog.
//!
//! Loaded once from the JSON dataset and then only read. Lookups cover the
//! make → model → engine drill-down, per-engine aftermarket data and the shop
//! network.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::catalog_model::{AftermarketPart, Engine, EngineKey, ProvenConfiguration, Review, Shop};

/// Raw dataset layout as shipped with the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogData {
    pub engines: Vec<Engine>,
    /// engine code → category → parts
    pub aftermarket_parts: HashMap<String, BTreeMap<String, Vec<AftermarketPart>>>,
    /// engine code → configurations
    pub proven_configurations: HashMap<String, Vec<ProvenConfiguration>>,
    pub shops: Vec<Shop>,
    pub reviews: Vec<Review>,
}

/// One aftermarket category as seen by a given entitlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartCategoryView {
    pub category: String,
    pub parts: Vec<AftermarketPart>,
    /// Entries hidden behind the premium entitlement.
    pub locked: usize,
}

#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    data: CatalogData,
}

impl ReferenceCatalog {
    /// Builds a catalog, rejecting datasets where two engines share a key.
    pub fn new(data: CatalogData) -> Result<Self, AppResponse> {
        let mut seen = HashSet::new();
        for engine in &data.engines {
            let key = engine.key();
            if !seen.insert(key.clone()) {
                warn!("Duplicate engine key in catalog: {key}");
                return Err(AppResponse::ValidationError(format!(
                    "Duplicate engine in catalog: {key}"
                )));
            }
        }

        if let Some(review) = data.reviews.iter().find(|r| r.rating > 5) {
            return Err(AppResponse::ValidationError(format!(
                "Review {} has rating {} (expected 0-5)",
                review.id, review.rating
            )));
        }

        info!(
            "Catalog loaded: {} engines, {} shops, {} reviews",
            data.engines.len(),
            data.shops.len(),
            data.reviews.len()
        );

        Ok(Self { data })
    }

    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let data: CatalogData = serde_json::from_str(json)?;
        Self::new(data)
    }

    pub fn engines(&self) -> &[Engine] {
        &self.data.engines
    }

    /// Distinct makes, sorted.
    pub fn makes(&self) -> Vec<String> {
        let mut makes: Vec<String> = self
            .data
            .engines
            .iter()
            .map(|e| e.make.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        makes.sort();
        makes
    }

    /// Distinct models of a make, in dataset order.
    pub fn models(&self, make: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.data
            .engines
            .iter()
            .filter(|e| e.make == make)
            .filter(|e| seen.insert(e.model.as_str()))
            .map(|e| e.model.clone())
            .collect()
    }

    pub fn engines_for(&self, make: &str, model: &str) -> Vec<&Engine> {
        self.data
            .engines
            .iter()
            .filter(|e| e.make == make && e.model == model)
            .collect()
    }

    pub fn find_engine(&self, key: &EngineKey) -> Option<&Engine> {
        self.data.engines.iter().find(|e| e.matches(key))
    }

    pub fn parts_for(&self, engine_code: &str) -> Option<&BTreeMap<String, Vec<AftermarketPart>>> {
        self.data.aftermarket_parts.get(engine_code)
    }

    /// Aftermarket parts with the free tier limited to the first entry of each
    /// category.
    pub fn visible_parts(&self, engine_code: &str, premium: bool) -> Vec<PartCategoryView> {
        let Some(categories) = self.parts_for(engine_code) else {
            return Vec::new();
        };

        categories
            .iter()
            .map(|(category, parts)| {
                let shown = if premium { parts.len() } else { parts.len().min(1) };
                PartCategoryView {
                    category: category.clone(),
                    parts: parts[..shown].to_vec(),
                    locked: parts.len() - shown,
                }
            })
            .collect()
    }

    pub fn configurations_for(&self, engine_code: &str) -> &[ProvenConfiguration] {
        self.data
            .proven_configurations
            .get(engine_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the catalog has any upgrade data for the engine code.
    pub fn has_upgrade_data(&self, engine_code: &str) -> bool {
        self.parts_for(engine_code).is_some() || !self.configurations_for(engine_code).is_empty()
    }

    pub fn shops(&self) -> &[Shop] {
        &self.data.shops
    }

    pub fn shop(&self, id: &str) -> Option<&Shop> {
        self.data.shops.iter().find(|s| s.id == id)
    }

    pub fn search_shops(&self, term: &str) -> Vec<&Shop> {
        self.data.shops.iter().filter(|s| s.matches_term(term)).collect()
    }

    pub fn reviews_for(&self, shop_id: &str) -> Vec<&Review> {
        self.data.reviews.iter().filter(|r| r.shop_id == shop_id).collect()
    }

    /// Mean review rating for a shop, `None` when it has no reviews.
    pub fn average_rating(&self, shop_id: &str) -> Option<f64> {
        let reviews = self.reviews_for(shop_id);
        if reviews.is_empty() {
            return None;
        }
        let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(total) / reviews.len() as f64)
    }
}
