use tracing::debug;

use crate::catalog::{CandidateQuery, PredicateField, PredicateOp};

use super::domain::{BankFilter, BankFilterMode, Candidate, CandidateStatus};

/// Expands a user-facing cluster label into the internal categories it covers.
///
/// Labels outside the known clusters are taken as a literal category.
pub fn category_cluster(label: &str) -> Vec<String> {
    let normalized = label.trim().to_ascii_lowercase();
    let categories: &[&str] = match normalized.as_str() {
        "self_directed" | "zelf_beleggen" => &["broker", "execution_only"],
        "guided" | "advised" | "advies" => &["advisory"],
        "managed" | "vermogensbeheer" => &["discretionary"],
        "pension" | "pensioensparen" => &["pension_savings"],
        _ => return vec![normalized],
    };
    categories.iter().map(|category| category.to_string()).collect()
}

/// Status and category constraints that can be pushed down to the catalog.
pub fn candidate_query(type_filter: Option<&str>) -> CandidateQuery {
    let query = CandidateQuery::new().with(
        PredicateField::Status,
        PredicateOp::Eq(CandidateStatus::Active.label().to_string()),
    );

    match type_filter.map(str::trim).filter(|label| !label.is_empty()) {
        Some(label) => query.with(
            PredicateField::Category,
            PredicateOp::In(category_cluster(label)),
        ),
        None => query,
    }
}

/// Keeps candidates that pass every filter. Filters are conjunctive, so the
/// order they run in does not change the surviving set.
pub fn filter_candidates(
    candidates: Vec<Candidate>,
    type_filter: Option<&str>,
    amount: u64,
    bank_filter: Option<&BankFilter>,
) -> Vec<Candidate> {
    let query = candidate_query(type_filter);
    let before = candidates.len();

    let eligible: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| query.matches(candidate))
        .filter(|candidate| amount_eligible(candidate, amount))
        .filter(|candidate| passes_bank_filter(candidate, bank_filter))
        .collect();

    debug!(before, after = eligible.len(), "applied candidate filters");
    eligible
}

/// No minimum means every amount qualifies.
pub fn amount_eligible(candidate: &Candidate, amount: u64) -> bool {
    candidate
        .minimum_investment
        .map_or(true, |minimum| amount >= minimum)
}

fn passes_bank_filter(candidate: &Candidate, bank_filter: Option<&BankFilter>) -> bool {
    let Some(filter) = bank_filter else {
        return true;
    };

    let listed = filter
        .banks
        .iter()
        .any(|bank| bank.trim().eq_ignore_ascii_case(candidate.provider.trim()));

    match filter.mode {
        BankFilterMode::Include => listed,
        BankFilterMode::Exclude => !listed,
        BankFilterMode::Boost => true,
    }
}

/// Whether a boost-mode bank filter names this candidate's provider.
pub fn is_boosted(candidate: &Candidate, bank_filter: Option<&BankFilter>) -> bool {
    let Some(filter) = bank_filter.filter(|filter| filter.mode == BankFilterMode::Boost) else {
        return false;
    };

    let provider = candidate.provider.to_lowercase();
    filter.banks.iter().any(|bank| {
        let bank = bank.trim().to_lowercase();
        !bank.is_empty() && provider.contains(&bank)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::domain::CandidateId;

    fn candidate(id: &str, provider: &str, category: &str, minimum: Option<u64>) -> Candidate {
        Candidate {
            id: CandidateId::from(id),
            provider: provider.to_string(),
            category: category.to_string(),
            status: CandidateStatus::Active,
            minimum_investment: minimum,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    fn population() -> Vec<Candidate> {
        vec![
            candidate("a", "A", "broker", None),
            candidate("b", "B", "execution_only", None),
            candidate("c", "C", "advisory", None),
        ]
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates
            .iter()
            .map(|candidate| candidate.id.0.as_str())
            .collect()
    }

    #[test]
    fn clusters_expand_to_internal_categories() {
        assert_eq!(category_cluster("self_directed"), vec!["broker", "execution_only"]);
        assert_eq!(category_cluster("Managed"), vec!["discretionary"]);
        assert_eq!(category_cluster("crypto"), vec!["crypto"]);
    }

    #[test]
    fn type_filter_uses_or_within_cluster() {
        let eligible = filter_candidates(population(), Some("self_directed"), 0, None);
        assert_eq!(ids(&eligible), vec!["a", "b"]);
    }

    #[test]
    fn inactive_candidates_never_survive() {
        let mut candidates = population();
        candidates[0].status = CandidateStatus::Inactive;
        let eligible = filter_candidates(candidates, None, 0, None);
        assert_eq!(ids(&eligible), vec!["b", "c"]);
    }

    #[test]
    fn amount_threshold_is_inclusive() {
        let open = candidate("open", "Open", "broker", None);
        let gated = candidate("gated", "Gated", "broker", Some(1_000));

        assert!(amount_eligible(&open, 0));
        assert!(amount_eligible(&open, u64::MAX));
        assert!(!amount_eligible(&gated, 999));
        assert!(amount_eligible(&gated, 1_000));
        assert!(amount_eligible(&gated, 5_000));
    }

    #[test]
    fn include_and_exclude_are_complementary() {
        let include = BankFilter {
            mode: BankFilterMode::Include,
            banks: vec!["a".to_string()],
        };
        let exclude = BankFilter {
            mode: BankFilterMode::Exclude,
            banks: vec!["A".to_string()],
        };

        assert_eq!(
            ids(&filter_candidates(population(), None, 0, Some(&include))),
            vec!["a"]
        );
        assert_eq!(
            ids(&filter_candidates(population(), None, 0, Some(&exclude))),
            vec!["b", "c"]
        );
    }

    #[test]
    fn boost_mode_keeps_everyone_and_flags_substring_matches() {
        let boost = BankFilter {
            mode: BankFilterMode::Boost,
            banks: vec!["keytrade".to_string()],
        };
        let keytrade = candidate("k", "Keytrade Bank", "broker", None);
        let bolero = candidate("b", "Bolero", "broker", None);

        let eligible = filter_candidates(
            vec![keytrade.clone(), bolero.clone()],
            None,
            0,
            Some(&boost),
        );
        assert_eq!(eligible.len(), 2);
        assert!(is_boosted(&keytrade, Some(&boost)));
        assert!(!is_boosted(&bolero, Some(&boost)));
        assert!(!is_boosted(&keytrade, None));
    }
}
