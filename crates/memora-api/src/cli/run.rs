//! `memora run`: execute an agent and print its result.

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use serde_json::{Map, Value, json};
use tracing::Instrument;
use tracing::field::Empty;

use memora_observe::genai_attrs::{
    GEN_AI_REQUEST_MODEL, MEMORA_CACHE_HIT, MEMORA_SNAPSHOT_ID, OP_INVOKE_AGENT,
};
use memora_types::error::RuntimeError;
use memora_types::execution::{ExecuteOptions, ExecutionResult, LlmOverrides};

use crate::state::AppState;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent id (directory name under the definitions root).
    pub agent: String,

    /// Operation to run, for agents that support several.
    #[arg(long)]
    pub operation: Option<String>,

    /// Input as a JSON object.
    #[arg(long, default_value = "{}")]
    pub input: String,

    /// User the call runs on behalf of.
    #[arg(long)]
    pub user: Option<String>,

    /// Conversation the call is about.
    #[arg(long)]
    pub conversation: Option<String>,

    /// Neither read nor write the snapshot cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Skip the cache read but store the fresh result.
    #[arg(long)]
    pub force_refresh: bool,

    /// Bypass capability handlers and run the generic pipeline.
    #[arg(long)]
    pub skip_routing: bool,

    /// Model override.
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature override.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Output token limit override.
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl RunArgs {
    fn options(&self) -> ExecuteOptions {
        let llm = (self.model.is_some() || self.temperature.is_some() || self.max_tokens.is_some())
            .then(|| LlmOverrides {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            });
        ExecuteOptions {
            use_cache: !self.no_cache,
            force_refresh: self.force_refresh,
            user_id: self.user.clone(),
            conversation_id: self.conversation.clone(),
            llm,
            skip_routing: self.skip_routing,
            ..Default::default()
        }
    }
}

/// Parse `--input`, which must be a JSON object.
pub fn parse_input(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--input is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("--input must be a JSON object, got {}", type_name(&other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub async fn run_agent(state: &AppState, args: RunArgs, json: bool) -> Result<()> {
    let input = parse_input(&args.input)?;
    let options = args.options();

    let span = tracing::info_span!(
        "memora.run",
        gen_ai.operation.name = OP_INVOKE_AGENT,
        gen_ai.agent.id = %args.agent,
        gen_ai.request.model = Empty,
        memora.cache.hit = Empty,
        memora.snapshot.id = Empty,
    );
    if let Some(model) = options.model() {
        span.record(GEN_AI_REQUEST_MODEL, model);
    }

    let outcome = state
        .executor
        .execute(&args.agent, args.operation.as_deref(), input, options)
        .instrument(span.clone())
        .await;

    match outcome {
        Ok(result) => {
            span.record(MEMORA_CACHE_HIT, result.cached);
            if let Some(id) = result.snapshot_id {
                span.record(MEMORA_SNAPSHOT_ID, tracing::field::display(id));
            }
            print_result(&result, json)
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&error_json(&e))?);
            } else {
                print_error(&e);
            }
            let code = e.code();
            Err(anyhow::Error::new(e).context(format!("agent '{}' failed ({code})", args.agent)))
        }
    }
}

fn error_json(e: &RuntimeError) -> Value {
    let mut error = json!({
        "code": e.code(),
        "status": e.status_code(),
        "retryable": e.is_retryable(),
        "message": e.to_string(),
    });
    if let RuntimeError::OutputValidationFailed { issues, .. } = e {
        error["issues"] = json!(issues);
    }
    json!({ "error": error })
}

fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let source = if result.cached {
        style("cached").green()
    } else {
        style("generated").cyan()
    };
    println!();
    println!("  {} {}", style("✓").green().bold(), source);
    if let Some(id) = result.snapshot_id {
        println!("  {} {}", style("snapshot").dim(), id);
    }
    println!("  {} {}", style("run").dim(), result.run_id);
    println!();
    println!("{}", serde_json::to_string_pretty(&result.data)?);
    Ok(())
}

fn print_error(e: &RuntimeError) {
    eprintln!();
    eprintln!("  {} {}", style("✗").red().bold(), style(e.code()).red());
    if let RuntimeError::OutputValidationFailed { issues, .. } = e {
        for issue in issues {
            eprintln!("    {} {}", style("-").dim(), issue);
        }
    }
    eprintln!();
}
