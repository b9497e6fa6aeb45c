use clap::{Parser, Subcommand};
use edu_choropleth::config::AppConfig;
use edu_choropleth::{data, pipeline, server};
use edu_choropleth::scale::{Legend, QuantileScale};
use edu_choropleth::stats::StatIndex;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth page, SVG and data exports
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the map, then serve it with the county lookup API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the percentage range, quantile thresholds and legend breakpoints
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

async fn generate(app_config: &AppConfig) -> anyhow::Result<pipeline::ChoroplethMap> {
    let map = match pipeline::run(app_config).await {
        Ok(map) => map,
        Err(err) => {
            // leave something visible behind instead of a blank or stale page
            if let Ok(path) = pipeline::write_error_page(app_config, &err) {
                eprintln!("Wrote error page to {:?}", path);
            }
            return Err(err);
        }
    };
    for path in pipeline::write_outputs(app_config, &map)? {
        println!("Wrote {:?}", path);
    }
    Ok(map)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            println!("Generating map with config: {:?}", config);
            let app_config = AppConfig::load(config)?;
            generate(&app_config).await?;
            println!("Generation complete!");
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = AppConfig::load(config)?;
            let map = generate(&app_config).await?;
            server::start_server(map, app_config.output.dir.clone(), app_config.server.port).await?;
        }
        Commands::Inspect { config } => {
            let app_config = AppConfig::load(config)?;
            let datasets = data::load_datasets(&app_config.input).await?;
            let index = StatIndex::from_raw(datasets.education)?;
            let scale = QuantileScale::new(index.values(), &app_config.map.palette)?;
            let legend = Legend::new(index.bounds(), &scale)?;

            let bounds = index.bounds();
            println!("counties:   {} ({} duplicate rows)", index.len(), index.duplicates());
            println!("range:      {} .. {}", bounds.min, bounds.max);
            println!("thresholds: {:?}", scale.thresholds());
            let counts = scale.bucket_counts(index.values());
            for (block, count) in legend.blocks.iter().zip(counts) {
                println!(
                    "{}  legend {:>6.2} .. {:>6.2}  counties {}",
                    block.color, block.lower, block.upper, count
                );
            }
        }
    }

    Ok(())
}
