//! Compression ratio and deck clearance calculators.
//!
//! Inputs are kept as the raw text the user typed and parsed on every
//! evaluation. A field that is empty or not a finite decimal yields no result;
//! the calculators never report zero or NaN for insufficient data.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::catalog_model::Engine;

const MM_PER_CM: f64 = 10.0;
const CUBIC_INCHES_PER_LITER: f64 = 61.0237;

/// Parses one calculator field. Surrounding whitespace is ignored.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rounds to `decimals` places. Non-finite input gives `None`. Magnitudes
/// too large to scale have no fractional digits and are returned as is.
fn round_to(value: f64, decimals: i32) -> Option<f64> {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let rounded = if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    };
    Some(rounded).filter(|v| v.is_finite())
}

fn cylinder_volume_cc(bore_cm: f64, height_cm: f64) -> f64 {
    PI * (bore_cm / 2.0).powi(2) * height_cm
}

/// Static compression ratio, rounded to 2 decimals.
///
/// `piston_volume_cc` is signed: negative for a dome, positive for a dish.
/// `deck_clearance_mm` is positive when the piston sits below the deck at TDC.
/// Returns `None` when the clearance volume is not strictly positive.
pub fn compression_ratio(
    bore_mm: f64,
    stroke_mm: f64,
    gasket_thickness_mm: f64,
    chamber_volume_cc: f64,
    piston_volume_cc: f64,
    deck_clearance_mm: f64,
) -> Option<f64> {
    let bore_cm = bore_mm / MM_PER_CM;

    let swept = cylinder_volume_cc(bore_cm, stroke_mm / MM_PER_CM);
    let gasket = cylinder_volume_cc(bore_cm, gasket_thickness_mm / MM_PER_CM);
    let deck = cylinder_volume_cc(bore_cm, deck_clearance_mm / MM_PER_CM);

    let clearance = chamber_volume_cc + piston_volume_cc + gasket + deck;
    if clearance <= 0.0 {
        return None;
    }

    round_to((swept + clearance) / clearance, 2)
}

/// Piston-to-deck clearance at TDC in millimeters, rounded to 3 decimals.
///
/// Negative means the crown protrudes above the deck surface. Inputs whose
/// sum overflows give `None`.
pub fn deck_clearance(
    deck_height_mm: f64,
    stroke_mm: f64,
    rod_length_mm: f64,
    compression_height_mm: f64,
) -> Option<f64> {
    round_to(deck_height_mm - (stroke_mm / 2.0 + rod_length_mm + compression_height_mm), 3)
}

/// Displacement in cubic inches, 2 decimals. Unknown or zero liters give `None`.
pub fn cubic_inches(liters: Option<f64>) -> Option<f64> {
    liters
        .filter(|l| *l != 0.0 && l.is_finite())
        .and_then(|l| round_to(l * CUBIC_INCHES_PER_LITER, 2))
}

fn seed(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculatorField {
    EngineBore,
    EngineStroke,
    HeadGasketThickness,
    CombustionChamberVolume,
    PistonVolume,
    DeckClearance,
}

impl CalculatorField {
    /// The catalog value a field can be loaded from. Deck clearance has no
    /// catalog counterpart.
    pub fn engine_value(self, engine: &Engine) -> Option<f64> {
        match self {
            CalculatorField::EngineBore => engine.engine_bore,
            CalculatorField::EngineStroke => engine.engine_stroke,
            CalculatorField::HeadGasketThickness => engine.head_gasket_thickness,
            CalculatorField::CombustionChamberVolume => engine.combustion_chamber_volume,
            CalculatorField::PistonVolume => engine.piston_volume,
            CalculatorField::DeckClearance => None,
        }
    }
}

/// Compression ratio calculator fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorInput {
    pub engine_bore: String,
    pub engine_stroke: String,
    pub head_gasket_thickness: String,
    pub combustion_chamber_volume: String,
    pub piston_volume: String,
    pub deck_clearance: String,
}

impl Default for CalculatorInput {
    fn default() -> Self {
        Self {
            engine_bore: String::new(),
            engine_stroke: String::new(),
            head_gasket_thickness: String::new(),
            combustion_chamber_volume: String::new(),
            piston_volume: String::new(),
            deck_clearance: "0".to_string(),
        }
    }
}

impl CalculatorInput {
    /// Baseline for an engine: its own specs, deck clearance 0.
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            engine_bore: seed(engine.engine_bore),
            engine_stroke: seed(engine.engine_stroke),
            head_gasket_thickness: seed(engine.head_gasket_thickness),
            combustion_chamber_volume: seed(engine.combustion_chamber_volume),
            piston_volume: seed(engine.piston_volume),
            deck_clearance: "0".to_string(),
        }
    }

    pub fn get(&self, field: CalculatorField) -> &str {
        match field {
            CalculatorField::EngineBore => &self.engine_bore,
            CalculatorField::EngineStroke => &self.engine_stroke,
            CalculatorField::HeadGasketThickness => &self.head_gasket_thickness,
            CalculatorField::CombustionChamberVolume => &self.combustion_chamber_volume,
            CalculatorField::PistonVolume => &self.piston_volume,
            CalculatorField::DeckClearance => &self.deck_clearance,
        }
    }

    pub fn set(&mut self, field: CalculatorField, value: impl Into<String>) {
        let slot = match field {
            CalculatorField::EngineBore => &mut self.engine_bore,
            CalculatorField::EngineStroke => &mut self.engine_stroke,
            CalculatorField::HeadGasketThickness => &mut self.head_gasket_thickness,
            CalculatorField::CombustionChamberVolume => &mut self.combustion_chamber_volume,
            CalculatorField::PistonVolume => &mut self.piston_volume,
            CalculatorField::DeckClearance => &mut self.deck_clearance,
        };
        *slot = value.into();
    }

    /// Current compression ratio, or `None` for insufficient data.
    pub fn compression_ratio(&self) -> Option<f64> {
        compression_ratio(
            parse_decimal(&self.engine_bore)?,
            parse_decimal(&self.engine_stroke)?,
            parse_decimal(&self.head_gasket_thickness)?,
            parse_decimal(&self.combustion_chamber_volume)?,
            parse_decimal(&self.piston_volume)?,
            parse_decimal(&self.deck_clearance)?,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeckField {
    DeckHeight,
    Stroke,
    RodLength,
    PistonCompressionHeight,
}

/// Deck clearance calculator fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckCalcInput {
    pub deck_height: String,
    pub stroke: String,
    pub rod_length: String,
    pub piston_compression_height: String,
}

impl DeckCalcInput {
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            deck_height: seed(engine.block_deck_height),
            stroke: seed(engine.engine_stroke),
            rod_length: seed(engine.rod_length),
            piston_compression_height: seed(engine.piston_compression_height),
        }
    }

    pub fn set(&mut self, field: DeckField, value: impl Into<String>) {
        let slot = match field {
            DeckField::DeckHeight => &mut self.deck_height,
            DeckField::Stroke => &mut self.stroke,
            DeckField::RodLength => &mut self.rod_length,
            DeckField::PistonCompressionHeight => &mut self.piston_compression_height,
        };
        *slot = value.into();
    }

    pub fn deck_clearance(&self) -> Option<f64> {
        deck_clearance(
            parse_decimal(&self.deck_height)?,
            parse_decimal(&self.stroke)?,
            parse_decimal(&self.rod_length)?,
            parse_decimal(&self.piston_compression_height)?,
        )
    }
}

/// Both calculators plus the last explicitly computed deck clearance.
///
/// The compression ratio is always derived from the current inputs; the deck
/// clearance only changes when [`Calculators::compute_deck_clearance`] runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculators {
    pub input: CalculatorInput,
    pub deck_input: DeckCalcInput,
    pub deck_result: Option<f64>,
}

impl Calculators {
    pub fn for_engine(engine: &Engine) -> Self {
        Self {
            input: CalculatorInput::from_engine(engine),
            deck_input: DeckCalcInput::from_engine(engine),
            deck_result: None,
        }
    }

    pub fn compression_ratio(&self) -> Option<f64> {
        self.input.compression_ratio()
    }

    pub fn compute_deck_clearance(&mut self) -> Option<f64> {
        self.deck_result = self.deck_input.deck_clearance();
        self.deck_result
    }

    /// Copies the last deck clearance into the compression calculator.
    ///
    /// Returns false (and changes nothing) when no result has been computed.
    pub fn apply_deck_clearance(&mut self) -> bool {
        match self.deck_result {
            Some(clearance) => {
                self.input.deck_clearance = format!("{:.3}", clearance);
                true
            }
            None => false,
        }
    }

    /// Fills one compression field from another engine's spec, if it has one.
    pub fn load_field_from(&mut self, field: CalculatorField, engine: &Engine) -> bool {
        match field.engine_value(engine) {
            Some(value) => {
                self.input.set(field, value.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_decimal_rejects_non_numbers() {
        assert_eq!(parse_decimal(" 81.5 "), Some(81.5));
        assert_eq!(parse_decimal("-6"), Some(-6.0));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_compression_ratio_reference_values() {
        let cr = compression_ratio(80.0, 79.0, 1.0, 25.0, 0.0, 0.0).unwrap();
        assert_relative_eq!(cr, 14.22);

        // A dished piston adds clearance volume and lowers the ratio.
        let dished = compression_ratio(80.0, 79.0, 1.0, 25.0, 5.0, 0.0).unwrap();
        assert!(dished < cr);
    }

    #[test]
    fn test_compression_ratio_requires_positive_clearance() {
        assert_eq!(compression_ratio(80.0, 79.0, 0.0, 10.0, -10.0, 0.0), None);
        assert_eq!(compression_ratio(80.0, 79.0, 0.0, 5.0, -10.0, 0.0), None);
    }

    #[test]
    fn test_deck_clearance_sign_convention() {
        assert_relative_eq!(deck_clearance(20.0, 79.0, 140.0, 30.5).unwrap(), -190.0);
        assert_relative_eq!(deck_clearance(211.0, 79.0, 140.0, 30.5).unwrap(), 1.0);
    }

    #[test]
    fn test_results_stay_finite() {
        assert_eq!(deck_clearance(1e306, 0.0, 0.0, 0.0), Some(1e306));
        assert_eq!(deck_clearance(0.0, 0.0, 1.7e308, 1.7e308), None);
        assert_eq!(compression_ratio(1e300, 1e300, 1.0, 25.0, 0.0, 0.0), None);
        assert_eq!(round_to(f64::INFINITY, 2), None);
    }

    #[test]
    fn test_cubic_inches() {
        assert_eq!(cubic_inches(Some(2.0)), Some(122.05));
        assert_eq!(cubic_inches(Some(0.0)), None);
        assert_eq!(cubic_inches(None), None);
    }
}
