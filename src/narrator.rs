//! Nourish - Plan narration
//!
//! Hands the selected foods to a text generator and gets back one block of
//! Markdown to show verbatim. Generators are slow and may fail, so every call
//! goes through [`narrate_with_timeout`]; a failure is reported as a
//! [`NarrationError`] and never touches the plan or the filters.

use anyhow::{bail, Context};
use serde::Serialize;
use std::fmt::Write as _;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::aggregate::{PlanAggregates, PlanAggregator};
use crate::data::Catalog;
use crate::model::{Score, NOT_AVAILABLE};
use crate::plan::PlanSelection;
use crate::tokens::TokenSet;

const PROMPT_INSTRUCTIONS: &str = "\
You are a nutritionist specializing in anti-inflammatory diets for women's health.
Using ONLY the foods listed below, write a one-day meal plan with Breakfast, Lunch,
Dinner and optionally one or two snacks. For each meal suggest a dish that uses one to
three of the listed foods and briefly explain why it helps, referring to the foods'
anti-inflammatory properties. Reuse the sample recipes where they fit.
Answer in clear Markdown.";

/// One plan member as sent to a generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationItem {
    pub name: String,
    pub category: Option<String>,
    pub score: Option<Score>,
    pub best_for: Option<String>,
    pub recipe: Option<String>,
    pub nutrients: TokenSet,
    pub flags: TokenSet,
    pub cautions: Option<String>,
}

/// Structured plan handed to a [`PlanNarrator`]
///
/// Only `items` is sent to external generators; `aggregates` backs the
/// built-in template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NarrationRequest {
    pub items: Vec<NarrationItem>,
    #[serde(skip)]
    pub aggregates: PlanAggregates,
}

impl NarrationRequest {
    /// Plan members in plan order, with default aggregates.
    pub fn from_plan(catalog: &Catalog, plan: &PlanSelection) -> Self {
        Self::with_aggregator(catalog, plan, &PlanAggregator::default())
    }

    /// Entries missing from the catalog are skipped.
    pub fn with_aggregator(
        catalog: &Catalog,
        plan: &PlanSelection,
        aggregator: &PlanAggregator,
    ) -> Self {
        let items = plan
            .iter()
            .filter_map(|name| catalog.get(name))
            .map(|item| NarrationItem {
                name: item.name.clone(),
                category: item.category.clone(),
                score: item.score,
                best_for: item.best_for.clone(),
                recipe: item.recipe.clone(),
                nutrients: item.nutrients.clone(),
                flags: item.flags.clone(),
                cautions: item.cautions.clone(),
            })
            .collect();
        Self {
            items,
            aggregates: aggregator.compute(catalog, plan),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Instructions followed by the plan as pretty-printed JSON.
    pub fn prompt(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        let json = serde_json::to_string_pretty(&self.items).unwrap_or_default();
        format!(
            "{}\n\nSelected anti-inflammatory foods (with their properties):\n{}\n\nPlease write the meal plan:\n",
            PROMPT_INSTRUCTIONS, json
        )
    }
}

/// A text generator for plans
pub trait PlanNarrator {
    fn name(&self) -> &str;

    fn narrate(
        &self,
        request: &NarrationRequest,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Built-in generator: renders the plan aggregates as Markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(&self, request: &NarrationRequest) -> String {
        let aggregates = &request.aggregates;
        let mut out = String::new();
        let _ = writeln!(out, "## Your Plan ({} foods)\n", aggregates.items.len());

        for row in &aggregates.items {
            let score = row
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let _ = writeln!(
                out,
                "- **{}** ({}, score {}): {}",
                row.name, row.category, score, row.best_for
            );
        }

        out.push_str("\n### Recipe Ideas\n\n");
        for line in &aggregates.recipes {
            let _ = writeln!(out, "- **{}**: {}", line.name, line.recipe);
        }

        if !aggregates.nutrients.is_empty() {
            let _ = writeln!(
                out,
                "\n### Nutrients Covered\n\n{}",
                aggregates.nutrients.join()
            );
        }

        if !aggregates.cautions.is_empty() {
            out.push_str("\n### Cautions\n\n");
            for caution in &aggregates.cautions {
                let _ = writeln!(out, "- {}", caution);
            }
        }

        out
    }
}

impl PlanNarrator for TemplateNarrator {
    fn name(&self) -> &str {
        "template"
    }

    async fn narrate(&self, request: &NarrationRequest) -> anyhow::Result<String> {
        Ok(self.render(request))
    }
}

/// External generator: runs a command, writes the prompt to its stdin and
/// reads the text from its stdout.
///
/// The child is killed if the pending narration is dropped.
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    program: String,
    args: Vec<String>,
}

impl CommandNarrator {
    /// `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl PlanNarrator for CommandNarrator {
    fn name(&self) -> &str {
        &self.program
    }

    async fn narrate(&self, request: &NarrationRequest) -> anyhow::Result<String> {
        debug!("Spawning narrator: {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run {}", self.program))?;

        let mut stdin = child.stdin.take().context("Narrator stdin not captured")?;
        let prompt = request.prompt();
        // Feed stdin while stdout drains, or a chatty child fills its pipe and stalls.
        let write_prompt = async move {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write_prompt, child.wait_with_output());

        let output = output.with_context(|| format!("Failed to wait for {}", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }
        match written {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                return Err(e).context("Failed to write prompt");
            }
            _ => {}
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            bail!("{} returned no text", self.program);
        }
        Ok(text)
    }
}

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("add some foods to your plan first")]
    EmptyPlan,

    #[error("narrator '{narrator}' timed out after {}s", .after.as_secs_f64())]
    Timeout { narrator: String, after: Duration },

    #[error("narrator '{narrator}' failed: {reason}")]
    Failed { narrator: String, reason: String },
}

impl NarrationError {
    /// Whether trying again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NarrationError::Timeout { .. } | NarrationError::Failed { .. }
        )
    }
}

/// Run `narrator` on `request`, giving up after `limit`.
pub async fn narrate_with_timeout<N: PlanNarrator>(
    narrator: &N,
    request: &NarrationRequest,
    limit: Duration,
) -> Result<String, NarrationError> {
    if request.is_empty() {
        return Err(NarrationError::EmptyPlan);
    }

    info!(
        "Narrating {} plan items with '{}'",
        request.items.len(),
        narrator.name()
    );

    match timeout(limit, narrator.narrate(request)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => {
            warn!("Narrator '{}' failed: {:#}", narrator.name(), e);
            Err(NarrationError::Failed {
                narrator: narrator.name().to_string(),
                reason: format!("{:#}", e),
            })
        }
        Err(_) => {
            warn!("Narrator '{}' timed out after {:?}", narrator.name(), limit);
            Err(NarrationError::Timeout {
                narrator: narrator.name().to_string(),
                after: limit,
            })
        }
    }
}
