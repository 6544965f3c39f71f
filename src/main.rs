// marginalia - Ask a large language model about text selected in an e-book reader
// Author: kelexine (https://github.com/kelexine)

use anyhow::{anyhow, Result};
use clap::Parser;
use marginalia::api::ApiClient;
use marginalia::cache::{CacheConfig, ResponseCache};
use marginalia::cli::{Args, CacheAction, Command};
use marginalia::config::AppConfig;
use marginalia::session::Conversation;
use marginalia::settings::SettingsStore;
use marginalia::utils::logging;
use marginalia::{AssistError, QueryEngine};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting marginalia v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Load user settings and the response cache
    let settings = Arc::new(SettingsStore::from_config(&config.settings));
    settings.load()?;
    let cache = Arc::new(ResponseCache::load(CacheConfig::from(&config.cache)));

    // Phase 4: Build the query engine
    let client = ApiClient::from_config(&config.api)?;
    let engine = QueryEngine::new(client, settings.clone(), cache.clone());

    let outcome = run(args.command, &engine).await;

    if args.metrics {
        print!("{}", marginalia::metrics::gather_metrics());
    }

    outcome.map_err(|e| {
        // Query failures are shown the way a reader would see them
        if e.is_query_failure() {
            anyhow!(e.user_message())
        } else {
            anyhow!(e)
        }
    })
}

async fn run(command: Command, engine: &QueryEngine) -> marginalia::Result<()> {
    let settings = engine.settings();

    match command {
        Command::Ask { task, follow_ups, text } => {
            let task = settings
                .task_prompt(&task)?
                .ok_or(AssistError::UnknownTask(task))?;

            if engine.cached_single(&text, &task).is_some() {
                info!("Answer for '{}' is cached", task.name);
            }

            let mut conversation = Conversation::new(settings.system_prompt()?);
            let answer = engine.start_task(&mut conversation, &text, &task).await?;
            println!("{}", answer);

            for question in follow_ups {
                println!("\n> {}\n", question);
                let answer = engine.follow_up(&mut conversation, &question).await?;
                println!("{}", answer);
            }
        }
        Command::Tasks => {
            for task in settings.task_prompts()? {
                println!("{:<12} {}", task.name, task.prompt);
            }
        }
        Command::Models { refresh } => {
            let models = if refresh {
                engine.refresh_models().await?
            } else {
                settings.models()?
            };
            let selected = settings.selected_model()?;
            for model in models {
                let marker = if model.id == selected { "*" } else { " " };
                println!(
                    "{} {:<48} {:>8} ctx  prompt {} / completion {}",
                    marker,
                    model.id,
                    model.context_length,
                    model.pricing.prompt,
                    model.pricing.completion
                );
            }
        }
        Command::SetKey { key } => {
            settings.set_api_key(key)?;
            println!("API key saved");
        }
        Command::SetModel { id } => {
            settings.set_selected_model(id.clone())?;
            println!("Selected model: {}", id);
        }
        Command::Cache { action } => match action {
            CacheAction::Stats => {
                let cache = engine.cache();
                println!("{} / {} entries", cache.len(), cache.max_entries());
            }
            CacheAction::Clear => {
                engine.cache().clear();
                println!("Cache cleared");
            }
        },
    }

    Ok(())
}
