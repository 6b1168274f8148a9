//! Nourish - Browse anti-inflammatory foods and build a meal plan
//!
//! Headless front end over the `nourish` engine: filtered listings, detail
//! cards, the catalog vocabulary, plan aggregates and a catalog lint report.

use anyhow::{Context, Result};
use argh::FromArgs;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use nourish::aggregate::{PlanAggregates, PlanAggregator};
use nourish::cache::CatalogCache;
use nourish::config::Config;
use nourish::data::Catalog;
use nourish::error::EngineError;
use nourish::filter::{FilterCriteria, SortKey};
use nourish::lint::Linter;
use nourish::model::{FoodItem, TextField, NOT_AVAILABLE};
use nourish::narrator::{narrate_with_timeout, CommandNarrator, TemplateNarrator};
use nourish::plan::{PlanAction, PlanNotice};
use nourish::session::Session;
use nourish::tokens::TokenSet;

/// Environment variable holding the log filter (e.g. `nourish=debug`).
const LOG_ENV: &str = "NOURISH_LOG";

/// Nourish - anti-inflammatory food finder and meal planner
#[derive(FromArgs)]
struct Args {
    /// path to a TOML config file (default: ./nourish.toml if present)
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// path to the food catalog CSV, or - for stdin (overrides config)
    #[argh(option, short = 'd')]
    data: Option<PathBuf>,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    List(ListArgs),
    Show(ShowArgs),
    Vocab(VocabArgs),
    Plan(PlanArgs),
    Lint(LintArgs),
}

/// list foods matching the given filters
#[derive(FromArgs)]
#[argh(subcommand, name = "list")]
struct ListArgs {
    /// include this category (repeatable)
    #[argh(option)]
    category: Vec<String>,

    /// include foods tagged with this health flag (repeatable)
    #[argh(option)]
    flag: Vec<String>,

    /// minimum score, 0-10 (default 0); unscored foods are always excluded
    #[argh(option, default = "0.0")]
    min_score: f64,

    /// case-insensitive search over name, mechanism, nutrients and flags
    #[argh(option, short = 's')]
    search: Option<String>,

    /// sort order: score-desc, score-asc or name-asc
    #[argh(option, default = "SortKey::default()")]
    sort: SortKey,

    /// show at most this many foods
    #[argh(option, short = 'n')]
    limit: Option<usize>,

    /// print JSON instead of a table
    #[argh(switch)]
    json: bool,
}

/// show every detail of one food
#[derive(FromArgs)]
#[argh(subcommand, name = "show")]
struct ShowArgs {
    /// food name, as listed
    #[argh(positional)]
    name: String,
}

/// list the categories, health flags and nutrients in the catalog
#[derive(FromArgs)]
#[argh(subcommand, name = "vocab")]
struct VocabArgs {
    /// print JSON instead of text
    #[argh(switch)]
    json: bool,
}

/// build a plan and print its nutrients, cautions and recipes
#[derive(FromArgs)]
#[argh(subcommand, name = "plan")]
struct PlanArgs {
    /// add a food to the plan (repeatable)
    #[argh(option, short = 'a')]
    add: Vec<String>,

    /// remove a food from the plan (repeatable, applied after adds)
    #[argh(option, short = 'r')]
    remove: Vec<String>,

    /// generate a meal plan text for the selection
    #[argh(switch)]
    narrate: bool,

    /// print JSON instead of text; a narration goes in its "narration" field
    #[argh(switch)]
    json: bool,
}

/// report rows and fields the loader had to repair or skip
#[derive(FromArgs)]
#[argh(subcommand, name = "lint")]
struct LintArgs {}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data) = &args.data {
        config.dataset.path = data.clone();
    }

    let catalog = open_catalog(&config)?;

    match args.command {
        Command::List(list) => run_list(&catalog, &list),
        Command::Show(show) => run_show(&catalog, &show.name),
        Command::Vocab(vocab) => run_vocab(&catalog, vocab.json),
        Command::Plan(plan) => run_plan(catalog, &config, &plan).await,
        Command::Lint(_) => run_lint(&catalog),
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_catalog(config: &Config) -> Result<Arc<Catalog>> {
    let path = &config.dataset.path;
    if path.as_os_str() == nourish::data::STDIN_PATH {
        eprintln!("📂 Reading catalog from stdin...");
    } else {
        eprintln!("📂 Opening {}...", path.display());
    }

    let mut cache = CatalogCache::new(config.columns.clone(), config.dataset.cache_capacity);
    match cache.get_or_load(path) {
        Ok(catalog) => {
            eprintln!(
                "✓ Loaded {} foods ({}, {})",
                catalog.len(),
                catalog.size_human(),
                catalog.encoding.label()
            );
            if !catalog.issues().is_empty() {
                eprintln!(
                    "⚠ {} row issue(s) absorbed; run `nourish lint` for details",
                    catalog.issues().len()
                );
            }
            Ok(catalog)
        }
        Err(e @ EngineError::DataUnavailable { .. }) => {
            eprintln!("❌ The food catalog could not be loaded. Nothing can be shown without it.");
            Err(e).context("Dataset unavailable")
        }
        Err(e) => Err(e).context("Failed to open dataset"),
    }
}

fn run_list(catalog: &Arc<Catalog>, args: &ListArgs) -> Result<()> {
    let mut criteria = FilterCriteria::new()
        .with_categories(&args.category)
        .with_flags(&args.flag)
        .with_min_score(args.min_score)
        .with_sort(args.sort);
    if let Some(search) = &args.search {
        criteria = criteria.with_search(search);
    }

    for value in criteria.unknown_values(catalog.vocabulary()) {
        eprintln!("⚠ Unknown {} matches nothing", value);
    }

    let session = Session::new(Arc::clone(catalog));
    let results = session.query(&criteria);
    let shown = args.limit.unwrap_or(results.len()).min(results.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results[..shown])?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No foods match these filters. Try widening the score or clearing the search.");
        return Ok(());
    }

    let name_width = results[..shown]
        .iter()
        .map(|item| item.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let category_width = results[..shown]
        .iter()
        .map(|item| item.category_or_placeholder().chars().count())
        .max()
        .unwrap_or(8)
        .max(8);

    println!(
        "{:<nw$}  {:<cw$}  {:>5}  Flags",
        "Food",
        "Category",
        "Score",
        nw = name_width,
        cw = category_width
    );
    for item in &results[..shown] {
        println!(
            "{:<nw$}  {:<cw$}  {:>5}  {}",
            item.name,
            item.category_or_placeholder(),
            item.score_label(),
            tokens_or_placeholder(&item.flags),
            nw = name_width,
            cw = category_width
        );
    }

    if shown < results.len() {
        println!("\nShowing {} of {} foods", shown, results.len());
    } else {
        println!("\nShowing {} foods", results.len());
    }
    Ok(())
}

fn run_show(catalog: &Catalog, name: &str) -> Result<()> {
    let Some(item) = catalog.get(name) else {
        let needle = name.to_lowercase();
        let similar: Vec<&str> = catalog
            .items()
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .map(|i| i.name.as_str())
            .take(5)
            .collect();
        if !similar.is_empty() {
            eprintln!("  Did you mean: {}?", similar.join(", "));
        }
        anyhow::bail!("No food named '{}' in the catalog", name);
    };

    print_detail(item);
    Ok(())
}

fn print_detail(item: &FoodItem) {
    println!("🥗 {}", item.name);
    println!("   Category:      {}", item.category_or_placeholder());
    println!("   Sub-category:  {}", item.text(TextField::SubCategory));
    match item.score {
        Some(score) => println!("   Score:         {}/10", score),
        None => println!("   Score:         {}", NOT_AVAILABLE),
    }
    if let Some(justification) = item.text_opt(TextField::ScoreJustification) {
        println!("                  {}", justification);
    }
    println!();
    println!("   Why anti-inflammatory: {}", item.text(TextField::Mechanism));
    println!("   Health flags:          {}", tokens_or_placeholder(&item.flags));
    println!("   Key nutrients:         {}", tokens_or_placeholder(&item.nutrients));
    println!("   Best type/form:        {}", item.text(TextField::BestForm));
    println!("   Best for:              {}", item.text(TextField::BestFor));
    println!("   Sample recipe/usage:   {}", item.text(TextField::Recipe));
    println!("   Cautions:              {}", item.text(TextField::Cautions));
    println!("   Regional availability: {}", item.text(TextField::Regional));
}

fn run_vocab(catalog: &Catalog, json: bool) -> Result<()> {
    let vocabulary = catalog.vocabulary();
    if json {
        println!("{}", serde_json::to_string_pretty(&vocabulary)?);
        return Ok(());
    }

    println!("📂 Categories ({}):", vocabulary.categories.len());
    for category in &vocabulary.categories {
        println!("   {}", category);
    }
    println!("\n🚩 Health flags ({}):", vocabulary.flags.len());
    for flag in vocabulary.flags.iter() {
        println!("   {}", flag);
    }
    println!("\n💊 Nutrients ({}):", vocabulary.nutrients.len());
    for nutrient in vocabulary.nutrients.iter() {
        println!("   {}", nutrient);
    }
    Ok(())
}

async fn run_plan(catalog: Arc<Catalog>, config: &Config, args: &PlanArgs) -> Result<()> {
    let mut session = Session::new(catalog);

    let actions = args
        .add
        .iter()
        .map(|name| PlanAction::Add(name.clone()))
        .chain(args.remove.iter().map(|name| PlanAction::Remove(name.clone())));
    for action in actions {
        let notice = session.dispatch(action);
        let icon = match notice {
            PlanNotice::UnknownItem(_) => "⚠",
            _ if notice.is_change() => "✓",
            _ => "ℹ",
        };
        eprintln!("{} {}", icon, notice);
    }

    let aggregator = PlanAggregator::new(&config.dataset.no_caution_sentinel);

    if args.narrate {
        let request = session.narration_request(&aggregator);
        let limit = config.narrator_timeout();
        eprintln!("✨ Generating your meal plan...");

        let result = match CommandNarrator::from_argv(&config.narrator.command) {
            Some(narrator) => narrate_with_timeout(&narrator, &request, limit).await,
            None => narrate_with_timeout(&TemplateNarrator, &request, limit).await,
        };

        match result {
            Ok(text) => session.record_narration(text),
            Err(e) if e.is_retryable() => {
                eprintln!("⚠ {}. Your plan is unchanged; try again.", e);
            }
            Err(e) => {
                eprintln!("⚠ {}", e);
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.report(&aggregator))?);
        return Ok(());
    }

    print_aggregates(&session.aggregates(&aggregator));
    if let Some(text) = session.narration() {
        println!("\n{}", text);
    }
    Ok(())
}

fn print_aggregates(aggregates: &PlanAggregates) {
    if aggregates.is_empty() {
        println!("Your meal plan is empty. Add foods with `nourish plan --add <name>`.");
        return;
    }

    println!("🍽️  Your plan ({} foods)", aggregates.items.len());
    for row in &aggregates.items {
        let score = row
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        println!("   {} ({}, score {}): {}", row.name, row.category, score, row.best_for);
    }
    if let Some(average) = aggregates.average_score {
        println!("   Average score: {:.1}", average);
    }

    println!("\n💊 Nutrients covered:");
    println!("   {}", tokens_or_placeholder(&aggregates.nutrients));

    println!("\n🚩 Concerns addressed:");
    println!("   {}", tokens_or_placeholder(&aggregates.flags));

    println!("\n⚠️  Cautions:");
    if aggregates.cautions.is_empty() {
        println!("   No specific cautions for these foods.");
    }
    for caution in &aggregates.cautions {
        println!("   - {}", caution);
    }

    println!("\n🥣 Recipe ideas:");
    for line in &aggregates.recipes {
        println!("   {}: {}", line.name, line.recipe);
    }
}

fn run_lint(catalog: &Catalog) -> Result<()> {
    eprintln!("🔍 Running linter...");
    let results = Linter::new().lint_catalog(catalog);

    let mut by_severity: BTreeMap<&str, usize> = BTreeMap::new();
    for result in &results {
        *by_severity.entry(result.error.severity()).or_default() += 1;
        println!(
            "{:<7} {}: {}",
            result.error.severity(),
            result.location(),
            result.error.message()
        );
    }

    if results.is_empty() {
        eprintln!("✅ No issues found in {} foods", catalog.len());
    } else {
        eprintln!("\n📊 Lint Summary:");
        for (severity, count) in &by_severity {
            eprintln!("   {:<8} {}", severity, count);
        }
    }
    Ok(())
}

fn tokens_or_placeholder(tokens: &TokenSet) -> String {
    if tokens.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        tokens.join()
    }
}
