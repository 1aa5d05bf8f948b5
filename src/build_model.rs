//! Garage build records and the inputs used to create and edit them.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "My Custom Build";
pub const NOT_AVAILABLE: &str = "N/A";
pub const STOCK: &str = "Stock";
pub const STOCK_ECU: &str = "Stock ECU";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InductionType {
    #[default]
    #[serde(rename = "Naturally Aspirated")]
    NaturallyAspirated,
    Turbocharged,
    Supercharged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntakeManifoldType {
    #[default]
    Stock,
    Aftermarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeadGasketMod {
    Yes,
    #[default]
    No,
}

/// A user-authored engine build.
///
/// `engine_code`, `engine_make` and `engine_model` are copied from the catalog
/// when the build is created; the engine may later disappear from the catalog
/// without affecting the record.
///
/// `shop_name` is a snapshot of the shop's display name taken whenever the
/// build is saved with a new shop id. It is not refreshed when the shop record
/// changes, so it can go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfiguration {
    pub id: String,
    pub engine_code: String,
    pub engine_make: String,
    pub engine_model: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub dyno_link: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub likes: u32,
    pub pistons: String,
    pub rods: String,
    pub crankshaft: String,
    pub compression_ratio: String,
    pub horsepower: String,
    pub torque: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub induction_type: InductionType,
    #[serde(default)]
    pub injector_size: String,
    #[serde(default)]
    pub fuel_pump: String,
    #[serde(default)]
    pub engine_management: String,
    #[serde(default)]
    pub head_gasket_mod: HeadGasketMod,
    #[serde(default)]
    pub intake_manifold_type: IntakeManifoldType,
}

/// Photo URLs as typed by the user: either a list or one comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoInput {
    List(Vec<String>),
    Csv(String),
}

impl PhotoInput {
    /// Trims every entry and drops empty ones.
    pub fn normalize(&self) -> Vec<String> {
        let trimmed = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        match self {
            PhotoInput::List(items) => items.iter().filter_map(|p| trimmed(p)).collect(),
            PhotoInput::Csv(raw) => raw.split(',').filter_map(trimmed).collect(),
        }
    }
}

impl Default for PhotoInput {
    fn default() -> Self {
        PhotoInput::List(Vec::new())
    }
}

/// Fields supplied when a build is created. Anything absent or blank takes
/// its documented default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub photos: Option<PhotoInput>,
    pub dyno_link: Option<String>,
    pub is_public: Option<bool>,
    pub pistons: Option<String>,
    pub rods: Option<String>,
    pub crankshaft: Option<String>,
    pub compression_ratio: Option<String>,
    pub horsepower: Option<String>,
    pub torque: Option<String>,
    pub shop_id: Option<String>,
    pub induction_type: Option<InductionType>,
    pub injector_size: Option<String>,
    pub fuel_pump: Option<String>,
    pub engine_management: Option<String>,
    pub head_gasket_mod: Option<HeadGasketMod>,
    pub intake_manifold_type: Option<IntakeManifoldType>,
}

/// Partial edit of an existing build. `None` leaves a field untouched.
///
/// Identity, engine reference and likes are not editable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub photos: Option<PhotoInput>,
    pub dyno_link: Option<String>,
    pub is_public: Option<bool>,
    pub pistons: Option<String>,
    pub rods: Option<String>,
    pub crankshaft: Option<String>,
    pub compression_ratio: Option<String>,
    pub horsepower: Option<String>,
    pub torque: Option<String>,
    /// A blank id detaches the build from its shop.
    pub shop_id: Option<String>,
    pub induction_type: Option<InductionType>,
    pub injector_size: Option<String>,
    pub fuel_pump: Option<String>,
    pub engine_management: Option<String>,
    pub head_gasket_mod: Option<HeadGasketMod>,
    pub intake_manifold_type: Option<IntakeManifoldType>,
}

/// `Some(trimmed)` for non-blank text.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn or_default(value: &Option<String>, default: &str) -> String {
    non_blank(value).unwrap_or_else(|| default.to_string())
}

impl UserConfiguration {
    /// Applies an edit in place. Returns true when the shop id changed, so the
    /// caller knows to take a new shop name snapshot.
    pub(crate) fn apply_patch(&mut self, patch: &BuildPatch) -> bool {
        fn set(slot: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        set(&mut self.title, &patch.title);
        set(&mut self.description, &patch.description);
        set(&mut self.dyno_link, &patch.dyno_link);
        set(&mut self.pistons, &patch.pistons);
        set(&mut self.rods, &patch.rods);
        set(&mut self.crankshaft, &patch.crankshaft);
        set(&mut self.compression_ratio, &patch.compression_ratio);
        set(&mut self.horsepower, &patch.horsepower);
        set(&mut self.torque, &patch.torque);
        set(&mut self.injector_size, &patch.injector_size);
        set(&mut self.fuel_pump, &patch.fuel_pump);
        set(&mut self.engine_management, &patch.engine_management);

        if let Some(photos) = &patch.photos {
            self.photos = photos.normalize();
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(induction) = patch.induction_type {
            self.induction_type = induction;
        }
        if let Some(head_gasket) = patch.head_gasket_mod {
            self.head_gasket_mod = head_gasket;
        }
        if let Some(intake) = patch.intake_manifold_type {
            self.intake_manifold_type = intake;
        }

        match &patch.shop_id {
            Some(_) => {
                let new_shop = non_blank(&patch.shop_id);
                let changed = new_shop != self.shop_id;
                self.shop_id = new_shop;
                changed
            }
            None => false,
        }
    }
}
