use std::fmt::Write as _;

use super::analysis::{join_criteria, ComparisonVerdict};
use super::{ExplanationContext, Highlights};

/// Templated markdown report used when no narrative generator answers.
pub fn fallback_summary(context: &ExplanationContext) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "## Your investment partner matches\n");
    let _ = writeln!(report, "{}.\n", context.profile.summary);

    if context.matches.is_empty() {
        let _ = writeln!(
            report,
            "No offerings matched your answers. Try widening the investment type or amount."
        );
        return report;
    }

    for breakdown in &context.matches {
        let _ = writeln!(
            report,
            "### {}. {} ({}% match)",
            breakdown.rank, breakdown.provider, breakdown.match_percentage
        );
        if let Some(ratio) = breakdown.total_cost_ratio {
            let _ = writeln!(report, "- Yearly costs: {:.2}%", ratio * 100.0);
        }
        if !breakdown.strengths.is_empty() {
            let _ = writeln!(report, "- Strengths: {}", breakdown.strengths.join(", "));
        }
        if !breakdown.weaknesses.is_empty() {
            let _ = writeln!(report, "- Watch out for: {}", breakdown.weaknesses.join(", "));
        }
        for analysis in &breakdown.priority_analysis {
            let _ = writeln!(
                report,
                "- {}: {:.1}/10 ({})",
                capitalize(analysis.criterion.display_name()),
                analysis.score,
                analysis.level.label()
            );
        }
        for insight in &breakdown.insights {
            let _ = writeln!(report, "- {}", insight.describe());
        }
        report.push('\n');
    }

    if let Some(comparison) = &context.comparison {
        let _ = writeln!(report, "### Comparison\n{}", comparison_sentence(context));
        if let Some(difference) = comparison.cost_difference {
            let _ = writeln!(
                report,
                "{} costs {:.2} percentage points per year {} than {}.",
                comparison.runner_up,
                difference.abs(),
                if difference > 0.0 { "more" } else { "less" },
                comparison.leader
            );
        }
    }

    report
}

/// Templated highlights used when no narrative generator answers.
pub fn fallback_highlights(context: &ExplanationContext) -> Highlights {
    let key_insight = match context.matches.first() {
        Some(top) => {
            let mut sentence = format!(
                "{} is your best match at {}%",
                top.provider, top.match_percentage
            );
            if !top.strongest.is_empty() {
                let _ = write!(
                    sentence,
                    ", scoring strongly on {}",
                    join_criteria(&top.strongest)
                );
            }
            sentence.push('.');
            sentence
        }
        None => "No offerings matched your answers.".to_string(),
    };

    let trade_offs = if context.patterns.trade_offs.is_empty() {
        comparison_sentence(context)
    } else {
        context.patterns.trade_offs.join(". ")
    };

    let priority_analysis = if context.patterns.priority_leaders.is_empty() {
        format!(
            "{}. None of the matches stands out on your priorities.",
            context.profile.summary
        )
    } else {
        context
            .patterns
            .priority_leaders
            .iter()
            .map(|leader| {
                format!(
                    "{} leads on {} ({:.1}/10)",
                    leader.provider,
                    leader.criterion.display_name(),
                    leader.score
                )
            })
            .collect::<Vec<_>>()
            .join(". ")
    };

    Highlights {
        key_insight,
        trade_offs,
        priority_analysis,
    }
}

fn comparison_sentence(context: &ExplanationContext) -> String {
    match &context.comparison {
        Some(comparison) => match comparison.verdict {
            ComparisonVerdict::CloseRace => format!(
                "{} and {} are nearly tied ({} points apart).",
                comparison.leader, comparison.runner_up, comparison.gap
            ),
            ComparisonVerdict::ClearWinner => format!(
                "{} is a clear winner, {} points ahead of {}.",
                comparison.leader, comparison.gap, comparison.runner_up
            ),
            ComparisonVerdict::LargeGap => format!(
                "{} is far ahead of {} ({} points).",
                comparison.leader, comparison.runner_up, comparison.gap
            ),
        },
        None => "Not enough matches to compare.".to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
