use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::matching::domain::{
    Criterion, ImportanceLabel, PreferenceSet, SoftAction, SoftPreference,
};

/// Free-text interpretation collaborator, typically backed by a language model.
pub trait TextInterpreter: Send + Sync {
    fn interpret(
        &self,
        text: &str,
        current: &PreferenceSet,
    ) -> Result<Interpretation, InterpretError>;
}

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("text interpreter unavailable: {0}")]
    Unavailable(String),
    #[error("text interpreter returned unparseable output: {0}")]
    Malformed(String),
    #[error("text interpreter timed out")]
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(
            match raw.as_str().map(|value| value.trim().to_ascii_lowercase()).as_deref() {
                Some("high") => Confidence::High,
                Some("medium") => Confidence::Medium,
                _ => Confidence::Low,
            },
        )
    }
}

/// Structured reading of a user's free-text request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default, deserialize_with = "lenient_updates")]
    pub preference_updates: BTreeMap<Criterion, ImportanceLabel>,
    #[serde(default, deserialize_with = "lenient_soft_preferences")]
    pub soft_preferences: Vec<SoftPreference>,
    #[serde(default)]
    pub clarifications_needed: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub safety_concern: bool,
    #[serde(default)]
    pub safety_message: Option<String>,
}

/// What the refinement flow should do with an interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Proceed(PreferenceSet),
    Clarify(Vec<String>),
    Decline(String),
}

const DEFAULT_SAFETY_MESSAGE: &str = "This request cannot be processed.";

impl Interpretation {
    /// Parses raw model output: a fenced ```json block or a bare JSON object.
    pub fn from_model_output(raw: &str) -> Result<Self, InterpretError> {
        let payload = extract_json(raw)
            .ok_or_else(|| InterpretError::Malformed("no JSON object found".to_string()))?;
        serde_json::from_str(payload).map_err(|err| InterpretError::Malformed(err.to_string()))
    }

    /// Safety concerns win over clarifications, which win over re-scoring.
    pub fn verdict(&self, current: &PreferenceSet) -> Verdict {
        if self.safety_concern {
            let message = self
                .safety_message
                .clone()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SAFETY_MESSAGE.to_string());
            return Verdict::Decline(message);
        }

        let questions: Vec<String> = self
            .clarifications_needed
            .iter()
            .map(|question| question.trim())
            .filter(|question| !question.is_empty())
            .map(str::to_string)
            .collect();
        if !questions.is_empty() {
            return Verdict::Clarify(questions);
        }

        Verdict::Proceed(self.apply_to(current))
    }

    /// Merges importance updates and replaces the soft preferences.
    pub fn apply_to(&self, current: &PreferenceSet) -> PreferenceSet {
        let mut updated = current.clone();
        for (criterion, label) in &self.preference_updates {
            updated.importance.insert(*criterion, *label);
        }
        updated.soft_preferences = self.soft_preferences.clone();
        updated
    }
}

fn extract_json(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find("```json") {
        let body = &raw[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return Some(body[..end].trim());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn lenient_updates<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<Criterion, ImportanceLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut updates = BTreeMap::new();

    for (key, value) in raw {
        let Some(criterion) = Criterion::parse(&key) else {
            warn!(key = %key, "ignoring update for unknown criterion");
            continue;
        };
        let Some(label) = value.as_str() else {
            warn!(key = %key, value = %value, "ignoring non-text importance update");
            continue;
        };
        updates.insert(criterion, ImportanceLabel::parse(label));
    }

    Ok(updates)
}

fn lenient_soft_preferences<'de, D>(deserializer: D) -> Result<Vec<SoftPreference>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.iter().filter_map(parse_soft_preference).collect())
}

/// Accepts `"boost_banks:KBC, ING"` strings and `{action, banks}` objects.
pub fn parse_soft_preference(raw: &Value) -> Option<SoftPreference> {
    let (action, banks) = match raw {
        Value::String(text) => {
            let (action, banks) = text.split_once(':')?;
            (action.to_string(), split_banks(banks))
        }
        Value::Object(object) => {
            let action = object.get("action")?.as_str()?.to_string();
            let banks = match object.get("banks") {
                Some(Value::String(text)) => split_banks(text),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|bank| !bank.is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            (action, banks)
        }
        _ => return None,
    };

    let Some(action) = SoftAction::parse(&action) else {
        warn!(action = %action, "ignoring unknown soft preference action");
        return None;
    };
    if banks.is_empty() {
        return None;
    }

    Some(SoftPreference { action, banks })
}

fn split_banks(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|bank| !bank.is_empty())
        .map(str::to_string)
        .collect()
}

/// Answer to a clarification question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarificationAnswer {
    /// Favour one named provider.
    BoostSpecific { target: String },
    Other(String),
}

impl ClarificationAnswer {
    /// Accepts a bare action string or an `{action, target}` object.
    pub fn from_value(raw: &Value) -> Self {
        let (action, target) = match raw {
            Value::String(action) => (action.as_str(), None),
            Value::Object(object) => (
                object.get("action").and_then(Value::as_str).unwrap_or_default(),
                object.get("target").and_then(Value::as_str),
            ),
            _ => ("", None),
        };

        match (action.trim(), target.map(str::trim)) {
            ("boost_specific", Some(target)) if !target.is_empty() => {
                ClarificationAnswer::BoostSpecific {
                    target: target.to_string(),
                }
            }
            (action, _) => ClarificationAnswer::Other(action.to_string()),
        }
    }

    pub fn apply_to(&self, current: &PreferenceSet) -> PreferenceSet {
        let mut updated = current.clone();
        if let ClarificationAnswer::BoostSpecific { target } = self {
            updated.soft_preferences.push(SoftPreference {
                action: SoftAction::BoostBanks,
                banks: vec![target.clone()],
            });
        } else {
            warn!(answer = ?self, "clarification answer has no preference effect");
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fenced_model_output() {
        let raw = r#"Here you go:
```json
{
  "preference_updates": {"duurzaamheid": "heel_belangrijk", "vibes": "high"},
  "soft_preferences": [
    "boost_banks:KBC, Belfius",
    {"action": "exclude_banks", "banks": ["ING"]},
    "teleport:Mars"
  ],
  "reasoning": "user cares about sustainability",
  "confidence": "HIGH"
}
```
anything after"#;

        let interpretation = Interpretation::from_model_output(raw).expect("parses");

        assert_eq!(
            interpretation.preference_updates.get(&Criterion::Sustainability),
            Some(&ImportanceLabel::VeryImportant)
        );
        assert_eq!(interpretation.preference_updates.len(), 1);
        assert_eq!(interpretation.soft_preferences.len(), 2);
        assert_eq!(interpretation.soft_preferences[0].action, SoftAction::BoostBanks);
        assert_eq!(interpretation.soft_preferences[0].banks, vec!["KBC", "Belfius"]);
        assert_eq!(interpretation.soft_preferences[1].action, SoftAction::ExcludeBanks);
        assert_eq!(interpretation.confidence, Confidence::High);
        assert!(!interpretation.safety_concern);
    }

    #[test]
    fn parses_bare_json_and_rejects_prose() {
        let bare = Interpretation::from_model_output("ok {\"confidence\": \"certain\"} done")
            .expect("bare json parses");
        assert_eq!(bare.confidence, Confidence::Low);

        assert!(matches!(
            Interpretation::from_model_output("I could not help with that"),
            Err(InterpretError::Malformed(_))
        ));
    }

    #[test]
    fn safety_concern_declines_before_clarifying() {
        let interpretation = Interpretation {
            clarifications_needed: vec!["Which bank?".to_string()],
            safety_concern: true,
            ..Interpretation::default()
        };
        assert_eq!(
            interpretation.verdict(&PreferenceSet::default()),
            Verdict::Decline(DEFAULT_SAFETY_MESSAGE.to_string())
        );
    }

    #[test]
    fn clarifications_stop_rescoring() {
        let interpretation = Interpretation {
            clarifications_needed: vec![" ".to_string(), "Do you mean Triodos?".to_string()],
            ..Interpretation::default()
        };
        assert_eq!(
            interpretation.verdict(&PreferenceSet::default()),
            Verdict::Clarify(vec!["Do you mean Triodos?".to_string()])
        );
    }

    #[test]
    fn proceed_merges_updates_into_preferences() {
        let current = PreferenceSet::default()
            .with_importance(Criterion::Cost, ImportanceLabel::Important)
            .with_importance(Criterion::Return, ImportanceLabel::LowPreference);
        let interpretation: Interpretation = serde_json::from_value(json!({
            "preference_updates": { "kosten": "very_important" },
            "soft_preferences": ["include_banks:Bolero"]
        }))
        .expect("deserializes");

        let Verdict::Proceed(updated) = interpretation.verdict(&current) else {
            panic!("expected to proceed");
        };
        assert_eq!(
            updated.importance_of(Criterion::Cost),
            ImportanceLabel::VeryImportant
        );
        assert_eq!(
            updated.importance_of(Criterion::Return),
            ImportanceLabel::LowPreference
        );
        assert_eq!(updated.soft_preferences.len(), 1);
        assert_eq!(updated.soft_preferences[0].action, SoftAction::IncludeBanks);
    }

    #[test]
    fn boost_specific_clarification_becomes_soft_boost() {
        let answer = ClarificationAnswer::from_value(&json!({
            "action": "boost_specific",
            "target": " Triodos "
        }));
        assert_eq!(
            answer,
            ClarificationAnswer::BoostSpecific {
                target: "Triodos".to_string()
            }
        );

        let updated = answer.apply_to(&PreferenceSet::default());
        assert_eq!(
            updated.soft_preferences,
            vec![SoftPreference {
                action: SoftAction::BoostBanks,
                banks: vec!["Triodos".to_string()],
            }]
        );

        let other = ClarificationAnswer::from_value(&json!("branches_nearby"));
        assert_eq!(other, ClarificationAnswer::Other("branches_nearby".to_string()));
        assert_eq!(other.apply_to(&PreferenceSet::default()), PreferenceSet::default());

        let missing_target =
            ClarificationAnswer::from_value(&json!({ "action": "boost_specific" }));
        assert_eq!(
            missing_target,
            ClarificationAnswer::Other("boost_specific".to_string())
        );
    }
}
