use anyhow::Context;
use clap::{Parser, Subcommand};
use incident_flow::models::IncidentSource;
use reqwest::{Client, Response};
use serde_json::json;

#[derive(Parser)]
#[command(name = "incident-flow-cli")]
#[command(about = "Incident Flow CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a new incident
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// user, monitoring or webhook
        #[arg(short, long, default_value_t = IncidentSource::User)]
        source: IncidentSource,
    },

    /// Get incident details
    Get {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// Resolve an incident
    Resolve {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// List incidents awaiting escalation
    Pending,

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    let response = match cli.command {
        Commands::Create {
            title,
            description,
            source,
        } => {
            client
                .post(format!("{}/v1/incidents", cli.endpoint))
                .json(&json!({
                    "title": title,
                    "description": description,
                    "source": source,
                }))
                .send()
                .await?
        }

        Commands::Get { id } => {
            client
                .get(format!("{}/v1/incidents/{}", cli.endpoint, id))
                .send()
                .await?
        }

        Commands::Resolve { id } => {
            client
                .post(format!("{}/v1/incidents/{}/resolve", cli.endpoint, id))
                .send()
                .await?
        }

        Commands::Pending => {
            client
                .get(format!("{}/v1/escalations/pending", cli.endpoint))
                .send()
                .await?
        }

        Commands::Health => {
            client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?
        }
    };

    print_response(response).await
}

async fn print_response(response: Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("server returned a non-JSON body")?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        anyhow::bail!("request failed with status {}", status);
    }
    Ok(())
}
