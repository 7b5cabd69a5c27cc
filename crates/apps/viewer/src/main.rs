use std::env;
use std::sync::Arc;
use std::time::Duration;

use canvas::{Canvas, CanvasConfig, CanvasDriver, CellState, HttpIdentifierSource, Input};
use clap::Parser;
use foundation::time::Millis;
use serde_json::json;
use streaming::fetch::HttpFetcher;
use streaming::protocol::UrlTemplate;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless mosaic canvas: mounts, pans and reports")]
struct Args {
    /// JSON config file (defaults apply to missing fields)
    #[arg(long)]
    config: Option<String>,

    /// Content URL template with an {id} placeholder (env: MOSAIC_CONTENT_URL)
    #[arg(long)]
    content_url: Option<String>,

    /// Identifier source endpoint (env: MOSAIC_IDENTIFIER_URL)
    #[arg(long)]
    identifier_url: Option<String>,

    /// Show the signed-in links on the origin cell
    #[arg(long)]
    authenticated: bool,

    /// Screen-space drag per step: dx,dy
    #[arg(long, default_value = "0,0", value_parser = parse_pan)]
    pan: (f64, f64),

    /// Number of pan steps to replay
    #[arg(long, default_value_t = 0)]
    steps: u32,

    /// Delay between pan steps in milliseconds
    #[arg(long, default_value_t = 50)]
    step_ms: u64,
}

fn parse_pan(s: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected dx,dy, got {s:?}"))?;
    let dx = dx.trim().parse::<f64>().map_err(|e| format!("dx: {e}"))?;
    let dy = dy.trim().parse::<f64>().map_err(|e| format!("dy: {e}"))?;
    Ok((dx, dy))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => CanvasConfig::from_path(path)?,
        None => CanvasConfig::default(),
    };
    if let Some(url) = args
        .content_url
        .clone()
        .or_else(|| env::var("MOSAIC_CONTENT_URL").ok())
    {
        config.content_url = UrlTemplate::new(url);
    }
    let identifier_url = args
        .identifier_url
        .clone()
        .or_else(|| env::var("MOSAIC_IDENTIFIER_URL").ok())
        .ok_or("missing --identifier-url (or MOSAIC_IDENTIFIER_URL)")?;

    if !config.content_url.has_placeholder() {
        info!(template = config.content_url.as_str(), "content url has no {{id}}, appending");
    }

    let fetcher = Arc::new(HttpFetcher::new(config.content_url.clone()));
    let source = Arc::new(HttpIdentifierSource::new(identifier_url.clone()));
    let canvas = Canvas::mount(config, args.authenticated, Millis::ZERO)?;
    info!(
        content_url = fetcher.url_template().as_str(),
        identifier_url = %identifier_url,
        steps = args.steps,
        "viewer starting"
    );

    let (nav_tx, mut nav_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(url) = nav_rx.recv().await {
            info!(url = %url, "navigation requested");
        }
    });

    let (input_tx, input_rx) = mpsc::channel::<Input>(64);
    let (dx, dy) = args.pan;
    let steps = args.steps;
    let step = Duration::from_millis(args.step_ms);
    tokio::spawn(async move {
        for _ in 0..steps {
            tokio::time::sleep(step).await;
            if input_tx.send(Input::PanBy { dx, dy }).await.is_err() {
                error!("driver stopped before the pan script finished");
                return;
            }
        }
    });

    let canvas = CanvasDriver::new(canvas, fetcher, source)
        .with_navigation(nav_tx)
        .run(input_rx)
        .await;

    let store = canvas.store();
    let center = canvas.viewport().visual_center();
    let pool = store.renderer().stats();
    let summary = json!({
        "center": [center.x, center.y],
        "cells": {
            "placeholder": store.count(CellState::Placeholder),
            "loading": store.count(CellState::Loading),
            "loaded": store.count(CellState::Loaded),
            "errored": store.count(CellState::Errored),
        },
        "cache_entries": store.cache().len(),
        "pool": {
            "allocated": pool.allocated,
            "reused": pool.reused,
            "live": pool.live,
        },
        "metrics": canvas.metrics().snapshot().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_pan;

    #[test]
    fn parses_pan_pairs() {
        assert_eq!(parse_pan("-400, 12.5"), Ok((-400.0, 12.5)));
        assert!(parse_pan("400").is_err());
        assert!(parse_pan("a,1").is_err());
    }
}
