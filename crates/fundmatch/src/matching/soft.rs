use tracing::debug;

use super::domain::{ScoredMatch, SoftAction, SoftPreference};

const BOOST_FACTOR: f64 = 1.4;
/// Boosted matches stop short of a perfect score.
const BOOST_CAP: f64 = 99.0;
const SIMILARITY_THRESHOLD: f64 = 0.75;
const NAME_NOISE: [&str; 6] = ["bank", "belgium", "belgie", "belgique", "nv", "sa"];

/// Lowercases a provider name and strips common suffix and country words.
pub fn normalize_bank_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '.' || c == ',')
        .filter(|word| !word.is_empty() && !NAME_NOISE.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fuzzy provider match used by the soft preferences. A target also matches
/// when it equals a whole-word run of the provider name.
pub fn bank_matches(provider: &str, target: &str) -> bool {
    let provider = normalize_bank_name(provider);
    let target = normalize_bank_name(target);
    if provider.is_empty() || target.is_empty() {
        return false;
    }

    contains_words(&provider, &target)
        || strsim::normalized_levenshtein(&provider, &target) >= SIMILARITY_THRESHOLD
}

fn contains_words(name: &str, words: &str) -> bool {
    format!(" {name} ").contains(&format!(" {words} "))
}

/// Applies soft preferences in order and re-sorts by percentage.
pub fn apply_soft_preferences(
    mut matches: Vec<ScoredMatch>,
    preferences: &[SoftPreference],
) -> Vec<ScoredMatch> {
    for preference in preferences {
        let banks: Vec<&str> = preference
            .banks
            .iter()
            .map(|bank| bank.trim())
            .filter(|bank| !bank.is_empty())
            .collect();
        if banks.is_empty() {
            continue;
        }

        match preference.action {
            SoftAction::BoostBanks => {
                for entry in matches.iter_mut() {
                    if banks.iter().any(|bank| bank_matches(&entry.provider, bank)) {
                        let boosted = (f64::from(entry.match_percentage) * BOOST_FACTOR)
                            .min(BOOST_CAP)
                            .round();
                        debug!(
                            provider = %entry.provider,
                            from = entry.match_percentage,
                            to = boosted,
                            "applied soft boost"
                        );
                        entry.match_percentage = boosted as u8;
                    }
                }
            }
            SoftAction::ExcludeBanks => {
                let lowered: Vec<String> = banks.iter().map(|bank| bank.to_lowercase()).collect();
                matches.retain(|entry| {
                    let provider = entry.provider.to_lowercase();
                    !lowered.iter().any(|bank| provider.contains(bank.as_str()))
                });
            }
            SoftAction::IncludeBanks => {
                matches.retain(|entry| {
                    banks
                        .iter()
                        .any(|bank| bank_matches(&entry.provider, bank))
                });
            }
        }
    }

    matches.sort_by(|left, right| right.match_percentage.cmp(&left.match_percentage));
    matches
}
