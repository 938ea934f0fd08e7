use clap::Args;
use fundmatch::catalog::{CatalogError, InMemoryCatalog};
use fundmatch::error::AppError;
use fundmatch::matching::domain::{Criterion, ImportanceLabel, MatchOutcome, PreferenceSet};
use fundmatch::matching::explain::{fallback_summary, follow_up_questions, ExplanationContext};
use fundmatch::matching::{
    parse_impacts, recalculate, MatchingEngine, RecalculationOutcome, ScoredMatch, WeightTable,
};
use std::path::PathBuf;

const SAMPLE_CANDIDATES: &str = "\
id,provider,category,status,minimum_investment,strengths,weaknesses
bolero,Bolero,broker,active,,\"Low trading fees, Wide market access, Research tools\",No personal advice
keytrade,Keytrade Bank,execution_only,active,250,\"Cheap ETF plans, Good mobile app\",Limited guidance
saxo,Saxo Bank,broker,active,1000,\"Professional platform, Many markets\",Complex for beginners
kbc-advice,KBC Bank,advisory,active,5000,\"Personal advisor, Local branches, Sustainable funds\",Higher costs
ing-advice,ING Belgium,advisory,active,2500,\"Hybrid advice, Clear reporting\",Average returns
belfius-managed,Belfius Bank,discretionary,active,25000,\"Fully managed portfolio, Quarterly reviews\",\"High fees, Lock-in period\"
argenta-pension,Argenta,pension_savings,active,,\"Tax benefit, Low entry amount\",Conservative returns
crelan-pension,Crelan,pension_savings,inactive,,Tax benefit,Closed for new clients
";

const SAMPLE_METRICS: &str = "\
candidate_id,total_cost_ratio,expected_return,sustainability,guidance,features
bolero,0.004,0.061,5,3,8
keytrade,0.006,0.058,6,2,9
saxo,0.005,0.064,4,3,10
kbc-advice,0.012,0.055,8,9,6
ing-advice,0.010,0.052,7,7,7
belfius-managed,0.018,0.063,8,8,5
argenta-pension,0.009,0.045,6,5,4
crelan-pension,0.008,0.047,6,5,4
";

/// Bundled catalog used by the demo and by the server when no CSV export is configured.
pub(crate) fn sample_catalog() -> Result<InMemoryCatalog, CatalogError> {
    let candidates = InMemoryCatalog::read_candidates(SAMPLE_CANDIDATES.as_bytes())?;
    let metrics = InMemoryCatalog::read_metrics(SAMPLE_METRICS.as_bytes())?;
    Ok(InMemoryCatalog::new(candidates, metrics))
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Candidate CSV export
    #[arg(long)]
    pub(crate) candidates: PathBuf,
    /// Metrics CSV export keyed by candidate id
    #[arg(long)]
    pub(crate) metrics: Option<PathBuf>,
    /// Investment type cluster (self_directed, guided, managed, pension) or a literal category
    #[arg(long)]
    pub(crate) category: Option<String>,
    /// Amount the user wants to invest
    #[arg(long, default_value_t = 0)]
    pub(crate) amount: u64,
    /// Criterion importance as CRITERION=LABEL, repeatable
    #[arg(long = "importance", value_parser = crate::infra::parse_importance)]
    pub(crate) importance: Vec<(Criterion, ImportanceLabel)>,
    /// Number of matches to return
    #[arg(long, default_value_t = 3)]
    pub(crate) top: usize,
    /// Print the outcome as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Investment type cluster used for the sample answers
    #[arg(long, default_value = "self_directed")]
    pub(crate) category: String,
    /// Amount used for the sample answers
    #[arg(long, default_value_t = 5_000)]
    pub(crate) amount: u64,
    /// Follow-up option to answer, by position (1-based)
    #[arg(long)]
    pub(crate) answer: Option<usize>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            category: "self_directed".to_string(),
            amount: 5_000,
            answer: None,
        }
    }
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        candidates,
        metrics,
        category,
        amount,
        importance,
        top,
        json,
    } = args;

    let catalog = InMemoryCatalog::from_csv_paths(&candidates, metrics.as_deref())?;
    let preferences = importance.into_iter().fold(
        PreferenceSet {
            category,
            amount,
            ..PreferenceSet::default()
        },
        |preferences, (criterion, label)| preferences.with_importance(criterion, label),
    );

    let outcome = MatchingEngine::new(WeightTable::default(), top).rank(&catalog, &preferences)?;

    if json {
        let rendered = serde_json::to_string_pretty(&outcome).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        render_outcome(&outcome);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let catalog = sample_catalog()?;
    let preferences = demo_preferences(&args);
    let engine = MatchingEngine::default();

    println!("Investment partner matching demo");
    println!(
        "Answers: {} | amount {} | costs very important, features important",
        args.category, args.amount
    );

    let outcome = engine.rank(&catalog, &preferences)?;
    render_outcome(&outcome);
    let matches = outcome.into_matches();
    if matches.is_empty() {
        return Ok(());
    }

    let context = ExplanationContext::build(&matches, &preferences);
    println!("\nScenario: {:?}", context.scenario.kind);
    if let Some(description) = &context.scenario.description {
        println!("  {description}");
    }

    let questions = follow_up_questions(&context.scenario, &matches);
    for question in &questions {
        println!("\nFollow-up: {}", question.prompt);
        for (index, option) in question.options.iter().enumerate() {
            println!("  {}. {}", index + 1, option.label);
        }
    }

    let chosen = args.answer.and_then(|position| {
        questions
            .first()
            .and_then(|question| question.options.get(position.checked_sub(1)?))
    });
    if let Some(option) = chosen {
        println!("\nAnswering: {}", option.label);
        let impacts = parse_impacts(std::slice::from_ref(&option.impact));
        let recalculated = recalculate(&preferences, matches.clone(), &impacts, |loosened| {
            engine.rank(&catalog, loosened).map(MatchOutcome::into_matches)
        })?;
        match recalculated {
            RecalculationOutcome::Reranked {
                matches,
                thresholds_lowered,
            } => {
                if thresholds_lowered {
                    println!("Thresholds lowered, catalog re-scored.");
                }
                render_matches(&matches);
            }
            RecalculationOutcome::RestartRequested => {
                println!("Restart requested, the quiz would start over.");
            }
        }
    }

    println!("\n{}", fallback_summary(&context));
    Ok(())
}

fn demo_preferences(args: &DemoArgs) -> PreferenceSet {
    PreferenceSet {
        category: Some(args.category.clone()),
        amount: args.amount,
        ..PreferenceSet::default()
    }
    .with_importance(Criterion::Cost, ImportanceLabel::VeryImportant)
    .with_importance(Criterion::Features, ImportanceLabel::Important)
    .with_importance(Criterion::Sustainability, ImportanceLabel::LowPreference)
}

fn render_outcome(outcome: &MatchOutcome) {
    match outcome {
        MatchOutcome::Ranked {
            matches,
            total_found,
            ..
        } => {
            println!(
                "\n{} of {} eligible offerings",
                matches.len(),
                total_found
            );
            render_matches(matches);
        }
        MatchOutcome::NoMatches { reason, .. } => println!("\n{reason}"),
    }
}

fn render_matches(matches: &[ScoredMatch]) {
    for (index, entry) in matches.iter().enumerate() {
        let cost = entry
            .total_cost_ratio
            .map(|ratio| format!("{:.2}%/yr", ratio * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:>2}. {:<20} {:>3}% | {} | {}",
            index + 1,
            entry.provider,
            entry.match_percentage,
            cost,
            entry.strengths.join(", ")
        );
    }
}
