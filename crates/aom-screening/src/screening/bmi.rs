use serde::{Deserialize, Serialize};

use super::domain::ClinicalProfile;

const KG_PER_LB: f64 = 0.45359237;
const METERS_PER_INCH: f64 = 0.0254;

/// BMI bracket. Variants are declared from lowest to highest so `Ord` follows the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    OverweightWithComorbidityRisk,
    Obese,
}

impl BmiCategory {
    pub fn for_value(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 27.0 {
            Self::Overweight
        } else if bmi < 30.0 {
            Self::OverweightWithComorbidityRisk
        } else {
            Self::Obese
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "underweight",
            BmiCategory::Normal => "normal",
            BmiCategory::Overweight => "overweight",
            BmiCategory::OverweightWithComorbidityRisk => "overweight with comorbidity risk",
            BmiCategory::Obese => "obese",
        }
    }
}

/// Computed BMI and the category derived from it. The category can only be
/// produced from the value, so the two never disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmiReading {
    value: f64,
    category: BmiCategory,
}

impl BmiReading {
    /// Round to two decimals, then derive the category from the rounded value.
    pub fn from_value(raw: f64) -> Self {
        let value = (raw * 100.0).round() / 100.0;
        Self {
            value,
            category: BmiCategory::for_value(value),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn category(&self) -> BmiCategory {
        self.category
    }
}

pub fn calculate(height_ft: u8, height_in: u8, weight_lb: f64) -> BmiReading {
    let total_inches = f64::from(height_ft) * 12.0 + f64::from(height_in);
    let height_m = total_inches * METERS_PER_INCH;
    let weight_kg = weight_lb * KG_PER_LB;
    BmiReading::from_value(weight_kg / (height_m * height_m))
}

pub fn for_profile(profile: &ClinicalProfile) -> BmiReading {
    calculate(profile.height_ft, profile.height_in, profile.weight_lb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_reference_value() {
        // 5'4", 200 lb
        let reading = calculate(5, 4, 200.0);
        assert!((reading.value() - 34.33).abs() < 0.01, "got {}", reading.value());
        assert_eq!(reading.category(), BmiCategory::Obese);
        assert_eq!(reading.category().label(), "obese");
    }

    #[test]
    fn category_thresholds_are_half_open() {
        assert_eq!(BmiCategory::for_value(18.49), BmiCategory::Underweight);
        assert_eq!(BmiCategory::for_value(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::for_value(24.99), BmiCategory::Normal);
        assert_eq!(BmiCategory::for_value(25.0), BmiCategory::Overweight);
        assert_eq!(BmiCategory::for_value(26.99), BmiCategory::Overweight);
        assert_eq!(
            BmiCategory::for_value(27.0),
            BmiCategory::OverweightWithComorbidityRisk
        );
        assert_eq!(
            BmiCategory::for_value(29.99),
            BmiCategory::OverweightWithComorbidityRisk
        );
        assert_eq!(BmiCategory::for_value(30.0), BmiCategory::Obese);
    }

    #[test]
    fn rounding_happens_before_categorising() {
        let reading = BmiReading::from_value(29.996);
        assert_eq!(reading.value(), 30.0);
        assert_eq!(reading.category(), BmiCategory::Obese);
    }

    #[test]
    fn heavier_never_lowers_bmi_or_category() {
        for (feet, inches) in [(4, 11), (5, 4), (6, 2), (7, 0)] {
            let mut previous = calculate(feet, inches, 80.0);
            let mut weight = 80.0;
            while weight <= 450.0 {
                weight += 0.7;
                let next = calculate(feet, inches, weight);
                assert!(next.value() >= previous.value());
                assert!(next.category() >= previous.category());
                previous = next;
            }
        }
    }
}
