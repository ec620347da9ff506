//! Chart series for a diagnosis result.

use crate::models::Diagnosis;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Varroa,
    DeformedWingVirus,
    FoulBrood,
    ChalkBrood,
    Healthy,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Varroa => "Varroa mite",
            Condition::DeformedWingVirus => "Deformed wing virus",
            Condition::FoulBrood => "Foulbrood",
            Condition::ChalkBrood => "Chalkbrood",
            Condition::Healthy => "Healthy",
        }
    }

    /// Chart colour.
    pub fn color(&self) -> &'static str {
        match self {
            Condition::Varroa => "#E57373",
            Condition::DeformedWingVirus => "#FFB74D",
            Condition::FoulBrood => "#64B5F6",
            Condition::ChalkBrood => "#81C784",
            Condition::Healthy => "#E6E6E6",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub condition: Condition,
    pub value: i64,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisBreakdown {
    pub imago_count: u64,
    pub larva_count: u64,
    pub imago: Vec<Slice>,
    pub larva: Vec<Slice>,
}

impl DiagnosisBreakdown {
    pub fn has_disease(&self) -> bool {
        self.imago
            .iter()
            .chain(self.larva.iter())
            .any(|s| s.condition != Condition::Healthy && s.value > 0)
    }
}

// The healthy ratio is 100 minus the varroa ratio only; other diseases
// are not subtracted.
impl From<&Diagnosis> for DiagnosisBreakdown {
    fn from(d: &Diagnosis) -> Self {
        let imago = &d.result.imago;
        let larva = &d.result.larva;

        let imago_healthy = d.imago_count as i64 - imago.varroa_count as i64 - imago.dwv_count as i64;
        let larva_healthy = d.larva_count as i64
            - larva.varroa_count as i64
            - larva.foul_brood_count as i64
            - larva.chalk_brood_count as i64;

        Self {
            imago_count: d.imago_count,
            larva_count: d.larva_count,
            imago: vec![
                Slice { condition: Condition::Varroa, value: imago.varroa_count as i64, ratio: imago.varroa_ratio },
                Slice { condition: Condition::DeformedWingVirus, value: imago.dwv_count as i64, ratio: imago.dwv_ratio },
                Slice { condition: Condition::Healthy, value: imago_healthy, ratio: 100.0 - imago.varroa_ratio },
            ],
            larva: vec![
                Slice { condition: Condition::Varroa, value: larva.varroa_count as i64, ratio: larva.varroa_ratio },
                Slice { condition: Condition::FoulBrood, value: larva.foul_brood_count as i64, ratio: larva.foul_brood_ratio },
                Slice { condition: Condition::ChalkBrood, value: larva.chalk_brood_count as i64, ratio: larva.chalk_brood_ratio },
                Slice { condition: Condition::Healthy, value: larva_healthy, ratio: 100.0 - larva.varroa_ratio },
            ],
        }
    }
}
