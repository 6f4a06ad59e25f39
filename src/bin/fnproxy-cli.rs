use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "fnproxy-cli")]
#[command(about = "Management CLI for fnproxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a node address
    AddNode {
        /// Node address (host:port)
        address: String,
    },
    /// Remove a node address
    RemoveNode {
        /// Node address (host:port)
        address: String,
    },
    /// List tracked nodes and whether they are routable
    ListNodes,
    /// Show recent per-node throughput
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::AddNode { address } => {
            let res = client
                .put(format!("{}/1/lb/nodes", cli.url))
                .json(&json!({ "node": address }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::RemoveNode { address } => {
            let res = client
                .delete(format!("{}/1/lb/nodes", cli.url))
                .json(&json!({ "node": address }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::ListNodes => {
            let res = client.get(format!("{}/1/lb/nodes", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Stats => {
            let res = client.get(format!("{}/1/lb/stats", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: management API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
