use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use serde_json::Value;

use site_router::config::load_config;
use site_router::{Collaborators, RequestContext, Router};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect and exercise the site router", long_about = None)]
struct Cli {
    /// Base URL of a running site-router service.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a URL locally against a configuration file
    Resolve {
        /// Absolute request URL
        target: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
    },
    /// Show cache status of a running service
    Status,
    /// List sites known to a running service
    Sites,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            target,
            method,
            config,
        } => {
            let config = load_config(&config)?;
            let deadline = Instant::now() + Duration::from_secs(config.timeouts.request_secs);
            let collaborators = Collaborators::from_config(&config);
            let router = Router::new(config, collaborators);
            let ctx = RequestContext::from_url(&method, &target)?;
            let resolution = router.resolve(&ctx, Some(deadline))?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            let res = client.get(format!("{}/_router/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Sites => {
            let client = reqwest::Client::new();
            let res = client.get(format!("{}/_router/sites", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
