use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::debug;

use crate::matching::domain::{
    parse_strengths, parse_weaknesses, Candidate, CandidateId, CandidateMetrics, CandidateStatus,
};

pub(crate) fn parse_candidates<R: Read>(reader: R) -> Result<Vec<Candidate>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut candidates = Vec::new();

    for record in csv_reader.deserialize::<CandidateRow>() {
        let row = record?;
        let minimum_investment = row.minimum_investment();

        candidates.push(Candidate {
            id: CandidateId(row.id),
            provider: row.provider,
            category: row.category,
            status: CandidateStatus::parse(&row.status),
            minimum_investment,
            strengths: parse_strengths(row.strengths.as_deref().unwrap_or_default()),
            weaknesses: parse_weaknesses(row.weaknesses.as_deref().unwrap_or_default()),
        });
    }

    Ok(candidates)
}

pub(crate) fn parse_metrics<R: Read>(reader: R) -> Result<Vec<CandidateMetrics>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut metrics = Vec::new();

    for record in csv_reader.deserialize::<MetricRow>() {
        let row = record?;
        let candidate_id = CandidateId(row.candidate_id);

        metrics.push(CandidateMetrics {
            total_cost_ratio: parse_number(&candidate_id, "total_cost_ratio", row.total_cost_ratio),
            expected_return: parse_number(&candidate_id, "expected_return", row.expected_return),
            sustainability: parse_number(&candidate_id, "sustainability", row.sustainability),
            guidance: parse_number(&candidate_id, "guidance", row.guidance),
            features: parse_number(&candidate_id, "features", row.features),
            candidate_id,
        });
    }

    Ok(metrics)
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    id: String,
    provider: String,
    category: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    minimum_investment: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    strengths: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    weaknesses: Option<String>,
}

impl CandidateRow {
    fn minimum_investment(&self) -> Option<u64> {
        let raw = self.minimum_investment.as_deref()?;
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Some(value.ceil() as u64),
            Ok(_) => None,
            Err(_) => {
                debug!(
                    candidate = %self.id,
                    value = raw,
                    "ignoring unparseable minimum investment"
                );
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetricRow {
    candidate_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    total_cost_ratio: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expected_return: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    sustainability: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    guidance: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    features: Option<String>,
}

fn parse_number(candidate: &CandidateId, column: &str, raw: Option<String>) -> Option<f64> {
    let raw = raw?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            debug!(%candidate, column, value = %raw, "treating non-numeric metric as absent");
            None
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
