use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use agent_flow::{
    build_plan, builtin_handlers, session_channel, AgentReply, FlowError, Navigator, StdinHandoff,
    StepExecutor, TracingSink,
};
use anyhow::{bail, Context};
use browser_adapter::{BrowserDriver, ChromeDriver, ChromeDriverConfig};
use clap::Args;
use formpilot_core_types::IntentId;
use formpilot_recipes::{classify_intent, Sitemap};
use serde_json::{Map, Value};
use tracing::info;

use super::CommonArgs;
use crate::server::{decision_provider, visual_locator};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// What to do, in plain words ("apply for crop insurance in Punjab")
    pub prompt: String,

    /// Skip keyword classification and force this intent
    #[arg(long)]
    pub intent: Option<String>,

    /// JSON file with known profile fields (name, mobile, district, ...)
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run one plan interactively: questions arrive on stdout, answers are read
/// from stdin, and the final result map is printed as JSON.
pub async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.common.to_config();
    let recipe = config.load_recipe()?;

    let (intent, params) = match (args.intent, classify_intent(&args.prompt)) {
        (Some(forced), Some(c)) => (forced, c.params),
        (Some(forced), None) => (forced, BTreeMap::new()),
        (None, Some(c)) => (c.intent, c.params),
        (None, None) => bail!("could not determine an intent from the prompt; pass --intent"),
    };
    if !recipe.intents.contains_key(&intent) {
        bail!("unknown intent: {intent}");
    }
    info!(intent, ?params, "prompt classified");

    let params: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    let profile = match &args.profile {
        Some(path) => load_profile(path)?,
        None => Map::new(),
    };

    let handlers = builtin_handlers();
    let plan = build_plan(&recipe, &intent, &params, &handlers);
    let form_hint = recipe.form_hint(&intent).map(str::to_string);
    let sitemap = Arc::new(Sitemap::new(recipe.as_ref().clone()));

    let driver_config = ChromeDriverConfig {
        headless: config.headless,
        screenshots_dir: config.screenshots_dir.clone(),
        ..Default::default()
    };
    let driver: Arc<dyn BrowserDriver> = Arc::new(
        tokio::task::spawn_blocking(move || ChromeDriver::launch(driver_config))
            .await
            .context("browser launch task")??,
    );

    let mut executor = StepExecutor::new(
        driver,
        Navigator::new(sitemap, IntentId::from(intent.as_str())),
        handlers,
        Arc::new(StdinHandoff),
        decision_provider(),
        visual_locator(),
        Arc::new(TracingSink),
        IntentId::from(intent.as_str()),
    )
    .with_form_hint(form_hint);

    let (mut handle, queues) = session_channel();
    let worker = tokio::spawn(async move {
        let mut queues = queues;
        match executor.execute(&plan, profile, &mut queues).await {
            Ok(results) => {
                queues
                    .push(AgentReply::Success {
                        results: results.into_map(),
                    })
                    .await
            }
            // Exhaustion is already on the queue as an error reply.
            Err(FlowError::IterationLimitExceeded(_)) => {}
            Err(e) => {
                queues
                    .push(AgentReply::Error {
                        error: e.to_string(),
                    })
                    .await
            }
        }
    });

    while let Some(reply) = handle.output_rx.recv().await {
        match reply {
            AgentReply::RequiresInput { question, options } => {
                println!("\n{question}");
                if !options.is_empty() {
                    println!("  options: {}", options.join(", "));
                }
                let answer = read_line().await?;
                if handle.input_tx.send(answer).await.is_err() {
                    break;
                }
            }
            AgentReply::ReadyToSubmit { summary } => {
                println!("{}", summary_block(&summary));
                let answer = read_line().await?;
                if handle.input_tx.send(answer).await.is_err() {
                    break;
                }
            }
            AgentReply::Success { results } => {
                println!("{}", serde_json::to_string_pretty(&Value::Object(results))?);
                break;
            }
            AgentReply::Error { error } => {
                worker.await.ok();
                bail!("agent failed: {error}");
            }
        }
    }

    worker.await.context("session task")?;
    Ok(())
}

/// Any reply confirms submission, so the prompt must not suggest the agent
/// will act on a typed correction.
fn summary_block(summary: &BTreeMap<String, String>) -> String {
    let mut lines = vec!["\nReady to submit:".to_string()];
    for (field, value) in summary {
        lines.push(format!("  {field}: {value}"));
    }
    lines.push("Review the form in the browser window, then press Enter to submit.".to_string());
    lines.join("\n")
}

fn load_profile(path: &PathBuf) -> anyhow::Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing profile {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("profile {} must be a JSON object", path.display()),
    }
}

async fn read_line() -> anyhow::Result<String> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("stdin task")??;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prompt_asks_for_enter_only() {
        let mut summary = BTreeMap::new();
        summary.insert("farmerName".to_string(), "Asha Patil".to_string());
        summary.insert("mobile".to_string(), "9876543210".to_string());

        let block = summary_block(&summary);
        assert!(block.contains("farmerName: Asha Patil"));
        assert!(block.contains("press Enter to submit"));
        assert!(!block.to_lowercase().contains("correction"));
    }
}
