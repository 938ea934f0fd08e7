use std::collections::BTreeMap;

use super::domain::{Criterion, ImportanceLabel, PreferenceSet};

/// Weight assigned to each importance tier.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    pub very_important: f64,
    pub important: f64,
    pub low_preference: f64,
    pub not_important: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            very_important: 0.30,
            important: 0.15,
            low_preference: 0.05,
            not_important: 0.05,
        }
    }
}

impl WeightTable {
    pub fn weight_for(&self, label: ImportanceLabel) -> f64 {
        match label {
            ImportanceLabel::VeryImportant => self.very_important,
            ImportanceLabel::Important => self.important,
            ImportanceLabel::LowPreference => self.low_preference,
            ImportanceLabel::NotImportant => self.not_important,
        }
    }

    /// Weight per criterion for a preference set, with overrides folded in.
    ///
    /// Every criterion receives a weight, even when the user left it blank.
    pub fn resolve(&self, preferences: &PreferenceSet) -> BTreeMap<Criterion, f64> {
        Criterion::ALL
            .iter()
            .map(|criterion| {
                let base = self.weight_for(preferences.importance_of(*criterion));
                let multiplier = preferences
                    .weight_overrides
                    .get(criterion)
                    .copied()
                    .filter(|value| value.is_finite())
                    .unwrap_or(1.0)
                    .max(0.0);
                (*criterion, base * multiplier)
            })
            .collect()
    }
}

/// Maps a raw importance label onto the default weight table.
pub fn resolve_weight(label: &str) -> f64 {
    WeightTable::default().weight_for(ImportanceLabel::parse(label))
}
