use crate::output::print_json;
use actionflow_core::{
    config::Config, context::Context, controller::Controllers, expr::ExprEvaluator,
    handler::ActionHandler, registry::Registry, types::RunState,
};
use anyhow::Context as _;
use serde_json::Value;
use std::path::Path;

pub fn run(
    root: &Path,
    names: &str,
    context_file: Option<&Path>,
    sets: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry = Registry::load(root, &config).context("failed to load action files")?;
    let mut context = initial_context(context_file, sets)?;

    // No controllers are linked into the binary; method actions fail with
    // "controller not found".
    let controllers = Controllers::new();
    let evaluation = ActionHandler::new(&registry, &controllers, &ExprEvaluator, &mut context)
        .with_config(&config)
        .execute(names)
        .with_context(|| format!("failed to run '{names}'"))?;

    let state = evaluation.state();
    let pending = evaluation.pending().map(str::to_string);
    let response = evaluation.into_response();

    if json {
        print_json(&response)?;
    } else if response.is_success() {
        for (i, item) in response.data.iter().enumerate() {
            println!("{:>3}  {}", i + 1, serde_json::to_string(item)?);
        }
        match (state, pending) {
            (Some(state), Some(pending)) if state != RunState::Done => {
                println!("\n{}: resume with '{pending}'", state.as_str());
            }
            (Some(state), _) => println!("\n{}", state.as_str()),
            (None, _) => {}
        }
        if !context.is_empty() {
            println!("\ncontext: {}", serde_json::to_string(context.as_map())?);
        }
    }

    if !response.is_success() {
        anyhow::bail!(
            "action failed: {}",
            response.message().unwrap_or("no message")
        );
    }
    Ok(())
}

/// Context from `--context FILE`, then each `--set KEY=VALUE` on top.
fn initial_context(file: Option<&Path>, sets: &[String]) -> anyhow::Result<Context> {
    let mut context = match file {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let value: Value = serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON in {}", path.display()))?;
            Context::from_json(value)?
        }
        None => Context::new(),
    };

    for set in sets {
        let (key, raw) = set
            .split_once('=')
            .with_context(|| format!("invalid --set '{set}': expected KEY=VALUE"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        context.set(key.trim(), value);
    }

    Ok(context)
}
