//! AbandonAuth developer application management CLI.
//!
//! Drives the `/developer_application` API of a running AbandonAuth server. Every command
//! except `login` needs a long-lived AbandonAuth token, which can be taken from the
//! `Authorization` cookie after signing in through `/ui`.
//!
//! ```bash
//! export ABANDONAUTH_BASE_URL=https://auth.example.com
//! export ABANDONAUTH_TOKEN=eyJ...
//!
//! abandonauth-app-management create --name "My App"
//! abandonauth-app-management set-callback-uris <APP_ID> \
//!   --uri https://app.example.com/callback --uri http://localhost:3000/callback
//! abandonauth-app-management reset-token <APP_ID>
//! abandonauth-app-management login <APP_ID> --refresh-token <TOKEN>
//! ```
//!
//! Exit codes: 0 success, 1 general error, 2 application management error,
//! 3 authentication error.

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::process;

#[derive(Parser)]
#[command(
    name = "abandonauth-app-management",
    about = "Manage AbandonAuth developer applications",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Base URL of the AbandonAuth server
    #[arg(long, env = "ABANDONAUTH_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// Long-lived AbandonAuth token
    #[arg(long, env = "ABANDONAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Json,
    JsonPretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new developer application
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// Show an application and its callback URIs
    Get { application_id: String },
    /// List the applications you own
    List,
    /// Rotate an application's refresh token
    ResetToken { application_id: String },
    /// Replace an application's callback URIs
    SetCallbackUris {
        application_id: String,
        /// Callback URI, repeat for several; none clears the list
        #[arg(long = "uri")]
        uris: Vec<String>,
    },
    /// Delete an application
    Delete {
        application_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Trade application credentials for a short-lived application token
    Login {
        application_id: String,
        #[arg(long, env = "ABANDONAUTH_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Application management error: {0}")]
    Management(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Error: {0}")]
    General(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Management(_) => 2,
            AppError::Authentication(_) => 3,
            AppError::Network(_) | AppError::Json(_) | AppError::General(_) => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("{err}");
            process::exit(err.exit_code());
        }
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let client = Client::new();

    match &cli.command {
        Commands::Create { name } => {
            let request = authorized(cli, client.post(url(cli, "/developer_application")))?;
            execute(cli, request.json(&json!({ "name": name })), "create application").await
        }
        Commands::Get { application_id } => {
            let path = format!("/developer_application/{application_id}");
            let request = authorized(cli, client.get(url(cli, &path)))?;
            execute(cli, request, "get application").await
        }
        Commands::List => {
            let request = authorized(cli, client.get(url(cli, "/user/applications")))?;
            execute(cli, request, "list applications").await
        }
        Commands::ResetToken { application_id } => {
            let path = format!("/developer_application/{application_id}/reset_token");
            let request = authorized(cli, client.patch(url(cli, &path)))?;
            execute(cli, request, "reset token").await
        }
        Commands::SetCallbackUris {
            application_id,
            uris,
        } => {
            let path = format!("/developer_application/{application_id}/callback_uris");
            let request = authorized(cli, client.patch(url(cli, &path)))?;
            execute(cli, request.json(uris), "update callback URIs").await
        }
        Commands::Delete {
            application_id,
            yes,
        } => delete_application(cli, &client, application_id, *yes).await,
        Commands::Login {
            application_id,
            refresh_token,
        } => {
            let body = json!({ "id": application_id, "refresh_token": refresh_token });
            let request = client
                .post(url(cli, "/developer_application/login"))
                .json(&body);
            execute(cli, request, "application login").await
        }
    }
}

fn url(cli: &Cli, path: &str) -> String {
    format!("{}{}", cli.base_url.trim_end_matches('/'), path)
}

fn authorized(cli: &Cli, request: RequestBuilder) -> Result<RequestBuilder, AppError> {
    match &cli.token {
        Some(token) => Ok(request.bearer_auth(token)),
        None => Err(AppError::Authentication(
            "an AbandonAuth token is required (--token or ABANDONAUTH_TOKEN)".to_string(),
        )),
    }
}

/// Send a request and print the JSON response body
async fn execute(cli: &Cli, request: RequestBuilder, action: &str) -> Result<(), AppError> {
    if cli.verbose {
        eprintln!("Sending {action} request to {}", cli.base_url);
    }

    let response = request.send().await?;
    let status = response.status();

    if cli.verbose {
        eprintln!("Response status: {status}");
    }

    if status.is_success() {
        let body: Value = response.json().await?;
        return output_response(&cli.format, &body);
    }

    let error_text = response.text().await?;
    Err(status_error(status, action, &error_text))
}

fn status_error(status: StatusCode, action: &str, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Authentication(format!("{action} rejected with status {status}: {body}"))
        }
        StatusCode::NOT_FOUND => AppError::Management(format!("{action}: application not found")),
        _ => AppError::Management(format!("{action} failed with status {status}: {body}")),
    }
}

async fn delete_application(
    cli: &Cli,
    client: &Client,
    application_id: &str,
    yes: bool,
) -> Result<(), AppError> {
    if !yes {
        println!("Are you sure you want to delete application '{application_id}'? (y/N)");
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::General(format!("Failed to read confirmation: {e}")))?;

        let input = input.trim().to_lowercase();
        if input != "y" && input != "yes" {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let path = format!("/developer_application/{application_id}");
    let request = authorized(cli, client.delete(url(cli, &path)))?;
    execute(cli, request, "delete application").await
}

/// Output response data in the requested format
fn output_response<T: Serialize>(format: &OutputFormat, data: &T) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(data)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Table => print_table(&serde_json::to_value(data)?, 0),
    }
    Ok(())
}

/// Print data as indented key-value pairs
fn print_table(value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) => {
                        println!("{prefix}{key}:");
                        print_table(val, indent + 1);
                    }
                    Value::Array(arr) => {
                        println!("{prefix}{key}:");
                        for item in arr {
                            print_table(item, indent + 1);
                        }
                    }
                    _ => println!("{prefix}{key}: {}", format_value(val)),
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{prefix}[{i}]:");
                print_table(item, indent + 1);
            }
        }
        _ => println!("{prefix}{}", format_value(value)),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_else(|_| "invalid".to_string()),
    }
}
