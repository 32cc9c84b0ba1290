use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the ledger gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite health of ledger, store and contract configuration
    Health,
    /// Read the stored value
    Get,
    /// Write a new value and wait for it to be mined
    Set {
        /// Non-negative integer
        value: String,
    },
    /// Audit history, newest first
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },
    /// Contract, network and account details
    Info,
    /// Compare the newest audit record with the on-chain value
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Get => client.get(format!("{}/simple-storage", base)).send().await?,
        Commands::Set { value } => {
            client
                .post(format!("{}/simple-storage", base))
                .json(&json!({ "value": value }))
                .send()
                .await?
        }
        Commands::History { limit, offset } => {
            client
                .get(format!("{}/simple-storage/history", base))
                .query(&[("limit", limit), ("offset", offset)])
                .send()
                .await?
        }
        Commands::Info => client.get(format!("{}/simple-storage/info", base)).send().await?,
        Commands::Check => client.get(format!("{}/simple-storage/check", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        if status.as_u16() == 206 {
            eprintln!("Warning: transaction mined but audit record is pending");
        }
        println!("{}", rendered);
        Ok(())
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
}
