use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "blacklister-cli")]
#[command(about = "Management CLI for the blacklister config store", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8085")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a raw config value
    Get { key: String },
    /// Write a raw JSON config value
    Set { key: String, json: String },
    /// List forbidden hostnames
    Forbidden,
    /// Show the blacklist threshold, or change it
    Threshold { value: Option<i64> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Get { key } => {
            let res = client.get(format!("{}/config/{}", base, key)).send().await?;
            print_response(res).await?;
        }
        Commands::Set { key, json } => {
            let value: Value = serde_json::from_str(&json)?;
            let res = client
                .put(format!("{}/config/{}", base, key))
                .json(&value)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Forbidden => {
            let res = client
                .get(format!("{}/config/forbidden-hostnames", base))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Threshold { value: None } => {
            let res = client
                .get(format!("{}/config/blacklist-threshold", base))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Threshold { value: Some(threshold) } => {
            let res = client
                .put(format!("{}/config/blacklist-threshold", base))
                .json(&json!({ "threshold": threshold }))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: config store returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
