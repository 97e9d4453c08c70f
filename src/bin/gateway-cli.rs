use clap::{Parser, Subcommand};
use reqwest::RequestBuilder;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the gateway core admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081", env = "GATEWAY_ADMIN_URL")]
    url: String,

    /// Access token sent as a bearer credential.
    #[arg(short, long, env = "GATEWAY_ACCESS_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show circuit breaker and refresh token status
    Status,
    /// Check that the admin API is up
    Health,
    /// Exchange a refresh token for a new token pair
    Refresh { refresh_token: String },
    /// Revoke a refresh token
    Logout { refresh_token: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Health => client.get(format!("{base}/health")),
        Commands::Refresh { refresh_token } => client
            .post(format!("{base}/auth/refresh"))
            .json(&json!({ "refreshToken": refresh_token })),
        Commands::Logout { refresh_token } => client
            .post(format!("{base}/auth/logout"))
            .json(&json!({ "refreshToken": refresh_token })),
    };

    let res = with_token(request, cli.token.as_deref()).send().await?;
    print_response(res).await
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
