use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use quantum_components::{assemble, ComponentCatalog};
use quantum_intents::default_next_intents;
use quantum_types::{HistoryPage, QuantumRequest};
use reqwest::StatusCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "quantum", about = "QuantumRequest API client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Endpoint {
    /// Base URL of the API, without the `/quantum` path.
    #[arg(long, env = "QUANTUM_API_URL", default_value = "http://localhost:8000")]
    url: String,
    #[arg(long, env = "QUANTUM_API_KEY", hide_env_values = true)]
    api_key: String,
    /// Send the key in this header instead of `Authorization: Bearer`.
    #[arg(long, env = "QUANTUM_API_KEY_HEADER")]
    api_key_header: Option<String>,
}

impl Endpoint {
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key_header.as_deref().filter(|h| !h.is_empty()) {
            Some(header) => req.header(header, &self.api_key),
            None => req.bearer_auth(&self.api_key),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Send a request and print the response.
    Send {
        #[command(flatten)]
        endpoint: Endpoint,
        #[arg(long, default_value = "refreshSession")]
        intent: String,
        #[arg(long, default_value_t = 1)]
        user_id: i64,
        /// Comma separated.
        #[arg(long, value_delimiter = ',', default_value = "")]
        cache_keys: Vec<String>,
        /// Comma separated.
        #[arg(long, value_delimiter = ',', default_value = "profile,permissions,notifications")]
        components: Vec<String>,
    },
    /// List recorded requests, newest first.
    History {
        #[command(flatten)]
        endpoint: Endpoint,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Resolve components locally against the built-in catalog.
    Resolve {
        #[arg(long, value_delimiter = ',', default_value = "")]
        cache_keys: Vec<String>,
        #[arg(long, value_delimiter = ',', default_value = "profile,permissions,notifications")]
        components: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.command {
        Command::Send {
            endpoint,
            intent,
            user_id,
            cache_keys,
            components,
        } => {
            let req = QuantumRequest {
                intent,
                user_id,
                cache_keys: clean(cache_keys),
                requested_components: clean(components),
            };
            req.validate()?;

            let url = format!("{}/quantum", endpoint.url.trim_end_matches('/'));
            debug!(%url, "sending quantum request");
            let resp = endpoint
                .authorize(reqwest::Client::new().post(&url))
                .json(&req)
                .send()
                .await
                .with_context(|| format!("POST {url}"))?;
            let body = check(resp).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::History {
            endpoint,
            limit,
            offset,
        } => {
            let url = format!("{}/quantum/history", endpoint.url.trim_end_matches('/'));
            let resp = endpoint
                .authorize(reqwest::Client::new().get(&url))
                .query(&[("limit", limit), ("offset", offset)])
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;
            let page: HistoryPage = serde_json::from_value(check(resp).await?)?;
            println!("{} row(s)", page.count);
            for row in page.history {
                println!(
                    "#{} {} user={} intent={} components={}",
                    row.id,
                    row.created_at,
                    row.user_id,
                    row.intent,
                    row.requested_components.join(",")
                );
            }
        }
        Command::Resolve {
            cache_keys,
            components,
        } => {
            let catalog = ComponentCatalog::default();
            let req = QuantumRequest {
                intent: "local".into(),
                user_id: 1,
                cache_keys: clean(cache_keys),
                requested_components: clean(components),
            };
            let resp = assemble(
                catalog.resolve_all(&req),
                catalog.micro_functions(),
                default_next_intents(),
            );
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
    }

    Ok(())
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn check(resp: reqwest::Response) -> anyhow::Result<serde_json::Value> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
    if status == StatusCode::UNAUTHORIZED {
        bail!("unauthorized: invalid API key ({})", detail(&body));
    }
    if !status.is_success() {
        bail!("error {}: {}", status.as_u16(), detail(&body));
    }
    Ok(body)
}

fn detail(body: &serde_json::Value) -> String {
    body.get("detail")
        .and_then(|d| d.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
