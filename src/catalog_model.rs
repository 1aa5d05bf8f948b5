//! Reference data definitions for the engine catalog.
//!
//! Everything in this module is read-only once loaded: engines, aftermarket
//! parts, proven configurations, shops and reviews. The JSON layout mirrors the
//! dataset shipped with the application (camelCase field names).

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Composite identity of an engine inside the catalog.
///
/// `(make, model, engine_code)` is unique across the catalog; builds and
/// comparison entries refer to engines through this key, never by pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineKey {
    pub make: String,
    pub model: String,
    pub engine_code: String,
}

impl EngineKey {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        engine_code: impl Into<String>,
    ) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            engine_code: engine_code.into(),
        }
    }
}

impl Display for EngineKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.make, self.model, self.engine_code)
    }
}

/// Factory specification of one engine.
///
/// Every numeric field is optional: `None` means the value is unknown, which is
/// different from zero. Lengths are millimeters, volumes cubic centimeters,
/// displacement liters, weight kilograms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Engine {
    pub make: String,
    pub model: String,
    pub engine_code: String,

    pub engine_bore: Option<f64>,
    pub engine_stroke: Option<f64>,
    pub rod_length: Option<f64>,
    pub piston_compression_height: Option<f64>,
    pub piston_volume: Option<f64>,
    pub combustion_chamber_volume: Option<f64>,
    pub block_deck_height: Option<f64>,
    pub head_gasket_thickness: Option<f64>,
    pub rod_big_end_bore: Option<f64>,
    pub rod_small_end_bore: Option<f64>,
    pub crankshaft_diameter: Option<f64>,

    pub horsepower: Option<f64>,
    pub torque: Option<f64>,
    pub compression_ratio: Option<f64>,
    pub displacement: Option<f64>,
    pub num_cylinders: Option<u32>,
    #[serde(rename = "redlineRPM")]
    pub redline_rpm: Option<f64>,
    pub engine_weight: Option<f64>,

    pub valvetrain: Option<String>,
    pub induction_type: Option<String>,
    pub fuel_system: Option<String>,
    pub block_material: Option<String>,
    pub head_material: Option<String>,
    pub connecting_rod_material: Option<String>,
    pub crankshaft_material: Option<String>,
    pub piston_material: Option<String>,
    pub common_weaknesses_strengths: Option<String>,
}

impl Engine {
    pub fn key(&self) -> EngineKey {
        EngineKey::new(self.make.clone(), self.model.clone(), self.engine_code.clone())
    }

    pub fn matches(&self, key: &EngineKey) -> bool {
        self.make == key.make && self.model == key.model && self.engine_code == key.engine_code
    }

    /// Reads one of the tabulated specification fields.
    pub fn spec_value(&self, field: SpecField) -> Option<SpecValue> {
        use SpecField::*;

        let number = |v: Option<f64>| v.map(SpecValue::Number);
        let text = |v: &Option<String>| v.clone().map(SpecValue::Text);

        match field {
            Displacement => number(self.displacement),
            Horsepower => number(self.horsepower),
            Torque => number(self.torque),
            CompressionRatio => number(self.compression_ratio),
            Cylinders => self.num_cylinders.map(|c| SpecValue::Number(f64::from(c))),
            Valvetrain => text(&self.valvetrain),
            Induction => text(&self.induction_type),
            FuelSystem => text(&self.fuel_system),
            Redline => number(self.redline_rpm),
            Weight => number(self.engine_weight),
            BlockMaterial => text(&self.block_material),
            HeadMaterial => text(&self.head_material),
            Bore => number(self.engine_bore),
            Stroke => number(self.engine_stroke),
            RodLength => number(self.rod_length),
            PistonCompressionHeight => number(self.piston_compression_height),
            PistonVolume => number(self.piston_volume),
            CombustionChamberVolume => number(self.combustion_chamber_volume),
            BlockDeckHeight => number(self.block_deck_height),
            HeadGasketThickness => number(self.head_gasket_thickness),
            RodBigEndBore => number(self.rod_big_end_bore),
            RodSmallEndBore => number(self.rod_small_end_bore),
            ConnectingRodMaterial => text(&self.connecting_rod_material),
            PistonMaterial => text(&self.piston_material),
            CrankshaftMaterial => text(&self.crankshaft_material),
            CrankshaftDiameter => number(self.crankshaft_diameter),
        }
    }
}

/// A tabulated engine specification, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecField {
    Displacement,
    Horsepower,
    Torque,
    CompressionRatio,
    Cylinders,
    Valvetrain,
    Induction,
    FuelSystem,
    Redline,
    Weight,
    BlockMaterial,
    HeadMaterial,
    Bore,
    Stroke,
    RodLength,
    PistonCompressionHeight,
    PistonVolume,
    CombustionChamberVolume,
    BlockDeckHeight,
    HeadGasketThickness,
    RodBigEndBore,
    RodSmallEndBore,
    ConnectingRodMaterial,
    PistonMaterial,
    CrankshaftMaterial,
    CrankshaftDiameter,
}

impl SpecField {
    /// Fixed order used by the comparison table.
    pub const ALL: [SpecField; 26] = [
        SpecField::Displacement,
        SpecField::Horsepower,
        SpecField::Torque,
        SpecField::CompressionRatio,
        SpecField::Cylinders,
        SpecField::Valvetrain,
        SpecField::Induction,
        SpecField::FuelSystem,
        SpecField::Redline,
        SpecField::Weight,
        SpecField::BlockMaterial,
        SpecField::HeadMaterial,
        SpecField::Bore,
        SpecField::Stroke,
        SpecField::RodLength,
        SpecField::PistonCompressionHeight,
        SpecField::PistonVolume,
        SpecField::CombustionChamberVolume,
        SpecField::BlockDeckHeight,
        SpecField::HeadGasketThickness,
        SpecField::RodBigEndBore,
        SpecField::RodSmallEndBore,
        SpecField::ConnectingRodMaterial,
        SpecField::PistonMaterial,
        SpecField::CrankshaftMaterial,
        SpecField::CrankshaftDiameter,
    ];

    pub fn label(self) -> &'static str {
        use SpecField::*;
        match self {
            Displacement => "Displacement",
            Horsepower => "Horsepower",
            Torque => "Torque",
            CompressionRatio => "Compression Ratio",
            Cylinders => "Cylinders",
            Valvetrain => "Valvetrain",
            Induction => "Induction",
            FuelSystem => "Fuel System",
            Redline => "Redline",
            Weight => "Weight",
            BlockMaterial => "Block Material",
            HeadMaterial => "Head Material",
            Bore => "Bore",
            Stroke => "Stroke",
            RodLength => "Rod Length",
            PistonCompressionHeight => "Piston Comp. Height",
            PistonVolume => "Piston Volume",
            CombustionChamberVolume => "Combustion Chamber Vol.",
            BlockDeckHeight => "Block Deck Height",
            HeadGasketThickness => "Head Gasket Thickness",
            RodBigEndBore => "Rod Big End Bore",
            RodSmallEndBore => "Rod Small End Bore",
            ConnectingRodMaterial => "Connecting Rod Material",
            PistonMaterial => "Piston Material",
            CrankshaftMaterial => "Crankshaft Material",
            CrankshaftDiameter => "Crankshaft Diameter",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        use SpecField::*;
        match self {
            Displacement => Some("L"),
            Horsepower => Some("hp"),
            Torque => Some("lb-ft"),
            CompressionRatio => Some(":1"),
            Redline => Some("RPM"),
            Weight => Some("kg"),
            Bore | Stroke | RodLength | PistonCompressionHeight | BlockDeckHeight
            | HeadGasketThickness | RodBigEndBore | RodSmallEndBore | CrankshaftDiameter => {
                Some("mm")
            }
            PistonVolume | CombustionChamberVolume => Some("cc"),
            Cylinders | Valvetrain | Induction | FuelSystem | BlockMaterial | HeadMaterial
            | ConnectingRodMaterial | PistonMaterial | CrankshaftMaterial => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Text(String),
}

impl Display for SpecValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecValue::Number(n) => write!(f, "{}", n),
            SpecValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AftermarketPart {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub link: String,
}

/// A dyno-verified recipe for an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenConfiguration {
    pub name: String,
    pub description: String,
    pub power_output: String,
    #[serde(default)]
    pub key_components: Vec<String>,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShopContact {
    pub phone: String,
    pub email: String,
    pub website: String,
}

/// A tuning shop in the verified network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub contact: ShopContact,
}

impl Shop {
    /// Case-insensitive substring match over name, location and specialties.
    pub fn matches_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.location.to_lowercase().contains(&needle)
            || self.specialties.iter().any(|s| s.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub shop_id: String,
    #[serde(default)]
    pub author: String,
    /// Out of 5.
    pub rating: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: String,
}
