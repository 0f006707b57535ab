mod app;
mod config;
mod feed;
mod util;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML file with stream, metrics, synthetic, graph and render sections.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    /// Never connect; run on synthetic articles and mock metrics.
    #[arg(long)]
    demo: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_leaf_nodes: Option<usize>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(base_url) = self.base_url {
            config.stream.base_url = base_url;
        }
        if self.demo {
            config.stream.demo = true;
        }
        if let Some(seed) = self.seed {
            config.render.seed = Some(seed);
        }
        if let Some(max_leaf_nodes) = self.max_leaf_nodes {
            config.graph.max_leaf_nodes = max_leaf_nodes;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("neural_feed=info,warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    info!(
        base_url = %config.stream.base_url,
        demo = config.stream.demo,
        max_leaf_nodes = config.graph.max_leaf_nodes,
        "starting neural feed"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Neural Feed",
        options,
        Box::new(move |cc| Ok(Box::new(app::NeuralFeedApp::new(cc, config)))),
    )
    .map_err(|error| anyhow!("eframe exited with an error: {error}"))
}
