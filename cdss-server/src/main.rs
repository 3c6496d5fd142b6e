use std::sync::Arc;

use cdss_graph::GraphInput;
use cdss_rag::NoOpCompressor;
use cdss_server::config::{Cli, Command, Settings};
use cdss_server::pipeline::{build_context, build_graph};
use cdss_server::server::{AppState, run_server};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;

    match cli.command {
        Command::Serve { warm } => serve(&settings, warm).await,
        Command::Ask { question, thread } => {
            let graph = build_graph(&settings)?;
            let answer =
                graph.ask(&thread, GraphInput::new(question, &settings.guideline_path)).await?;
            println!("{answer}");
            Ok(())
        }
        Command::Index => {
            let context = build_context(&settings, Arc::new(NoOpCompressor))?;
            let index = context.warm(&settings.guideline_path).await?;
            println!(
                "collection '{}': {} chunks, {} dimensions, {:?} (fingerprint {})",
                index.collection(),
                index.chunk_count(),
                index.dimensions(),
                index.origin(),
                index.fingerprint()
            );
            Ok(())
        }
        Command::Chat { backend, thread } => cdss_server::chat::run(&backend, &thread).await,
    }
}

async fn serve(settings: &Settings, warm: bool) -> anyhow::Result<()> {
    let state = match build_graph(settings) {
        Ok(graph) => {
            let graph = Arc::new(graph);
            if warm {
                let context = graph.context().clone();
                let path = settings.guideline_path.clone();
                tokio::spawn(async move {
                    match context.warm(&path).await {
                        Ok(index) => info!(chunk_count = index.chunk_count(), "guideline index warm"),
                        Err(e) => error!(error = %e, "failed to warm guideline index"),
                    }
                });
            }
            AppState::new(graph, &settings.guideline_path)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "pipeline not initialized, serving 503");
            AppState::unavailable(format!("{e:#}"), &settings.guideline_path)
        }
    };

    run_server(settings.server_config(), state.with_frontend_url(settings.frontend_url.clone()))
        .await
}
