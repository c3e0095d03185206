//! Studio CLI - Command-line interface for the Studio generation queue

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9631";
const PROMPT_COLUMN_WIDTH: usize = 48;

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Studio generation queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "STUDIO_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a prompt to the queue
    Submit {
        /// Prompt text
        prompt: String,

        /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)
        #[arg(short, long)]
        aspect_ratio: Option<String>,

        /// Number of images to request
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Extra parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Cancel the generating item
    Cancel {
        /// Item ID
        item_id: String,
    },

    /// Remove a queued or finished item
    Remove {
        /// Item ID
        item_id: String,
    },

    /// Remove every item except the one generating
    Clear,

    /// Show the queue
    List,

    /// Show recently generated images
    Gallery {
        /// Number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show the usage counter
    Usage {
        /// Feature name (default: the daemon's configured feature)
        #[arg(short, long)]
        feature: Option<String>,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct SubmitResult {
    item_id: String,
    status: String,
}

#[derive(Deserialize)]
struct Artifact {
    uri: String,
}

#[derive(Deserialize)]
struct QueueItem {
    id: String,
    prompt: String,
    status: String,
    result: Option<Artifact>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct CurrentResult {
    item_id: String,
    artifact: Artifact,
}

#[derive(Deserialize)]
struct QueueSnapshot {
    items: Vec<QueueItem>,
    current_result: Option<CurrentResult>,
    last_error: Option<String>,
    capacity: usize,
}

#[derive(Deserialize)]
struct GalleryEntry {
    item_id: String,
    prompt: String,
    artifact: Artifact,
    created_at: i64,
}

#[derive(Deserialize)]
struct GalleryList {
    entries: Vec<GalleryEntry>,
}

#[derive(Tabled)]
struct ItemRow {
    id: String,
    status: String,
    prompt: String,
    detail: String,
}

#[derive(Tabled)]
struct GalleryRow {
    item_id: String,
    prompt: String,
    image: String,
    created_at: i64,
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

// data: URIs are huge; show just the scheme
fn display_uri(uri: &str) -> String {
    if uri.starts_with("data:") {
        "<inline image data>".to_string()
    } else {
        uri.to_string()
    }
}

fn build_params(
    aspect_ratio: Option<String>,
    count: Option<u32>,
    params: Option<String>,
) -> Result<serde_json::Value> {
    let mut value = match params {
        Some(raw) => serde_json::from_str(&raw).context("Invalid JSON params")?,
        None => json!({}),
    };
    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("--params must be a JSON object"))?;

    if let Some(ratio) = aspect_ratio {
        object.insert("aspect_ratio".to_string(), json!(ratio));
    }
    if let Some(count) = count {
        object.insert("count".to_string(), json!(count));
    }
    Ok(value)
}

fn colored_status(status: &str) -> String {
    match status {
        "DONE" => status.green().to_string(),
        "ERROR" => status.red().to_string(),
        "GENERATING" => status.cyan().bold().to_string(),
        "CANCELLED" => status.yellow().to_string(),
        _ => status.to_string(),
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            prompt,
            aspect_ratio,
            count,
            params,
        } => {
            let params = json!({
                "prompt": prompt,
                "parameters": build_params(aspect_ratio, count, params)?,
            });

            let result = call_rpc(&cli.rpc_url, "queue.submit.v1", params).await?;
            let submit_result: SubmitResult = serde_json::from_value(result)?;

            println!("{}", "✓ Prompt queued".green().bold());
            println!();

            let table = Table::new(vec![submit_result]).to_string();
            println!("{}", table);
        }

        Commands::Cancel { item_id } => {
            let result =
                call_rpc(&cli.rpc_url, "queue.cancel.v1", json!({ "item_id": item_id })).await?;

            if result["cancelled"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Item {} cancelled", item_id).green().bold());
            } else {
                println!("{}", format!("○ Item {} is not generating", item_id).yellow());
            }
        }

        Commands::Remove { item_id } => {
            let result =
                call_rpc(&cli.rpc_url, "queue.remove.v1", json!({ "item_id": item_id })).await?;

            if result["removed"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Item {} removed", item_id).green().bold());
            } else {
                println!(
                    "{}",
                    format!("○ Item {} is generating; cancel it first", item_id).yellow()
                );
            }
        }

        Commands::Clear => {
            let result = call_rpc(&cli.rpc_url, "queue.clear.v1", json!({})).await?;
            println!(
                "{}",
                format!("✓ {} item(s) removed", result["removed"]).green().bold()
            );
        }

        Commands::List => {
            let result = call_rpc(&cli.rpc_url, "queue.list.v1", json!({})).await?;
            let snapshot: QueueSnapshot = serde_json::from_value(result)?;

            println!(
                "{} {}/{}",
                "Queue".cyan().bold(),
                snapshot.items.len(),
                snapshot.capacity
            );
            println!();

            if snapshot.items.is_empty() {
                println!("{}", "Queue is empty".yellow());
            } else {
                let rows: Vec<ItemRow> = snapshot
                    .items
                    .into_iter()
                    .map(|item| ItemRow {
                        detail: match (&item.result, &item.error) {
                            (Some(artifact), _) => display_uri(&artifact.uri),
                            (None, Some(error)) => error.clone(),
                            (None, None) => String::new(),
                        },
                        id: item.id,
                        status: colored_status(&item.status),
                        prompt: truncate(&item.prompt, PROMPT_COLUMN_WIDTH),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }

            if let Some(current) = snapshot.current_result {
                println!();
                println!(
                    "  {} {} ({})",
                    "Latest result:".bold(),
                    display_uri(&current.artifact.uri),
                    current.item_id
                );
            }
            if let Some(error) = snapshot.last_error {
                println!("  {} {}", "Last error:".bold(), error.red());
            }
        }

        Commands::Gallery { limit } => {
            let result = call_rpc(&cli.rpc_url, "gallery.list.v1", json!({ "limit": limit })).await?;
            let gallery: GalleryList = serde_json::from_value(result)?;

            if gallery.entries.is_empty() {
                println!("{}", "Gallery is empty".yellow());
            } else {
                let rows: Vec<GalleryRow> = gallery
                    .entries
                    .into_iter()
                    .map(|entry| GalleryRow {
                        item_id: entry.item_id,
                        prompt: truncate(&entry.prompt, PROMPT_COLUMN_WIDTH),
                        image: display_uri(&entry.artifact.uri),
                        created_at: entry.created_at,
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Usage { feature } => {
            let params = match feature {
                Some(feature) => json!({ "feature": feature }),
                None => json!({}),
            };
            let result = call_rpc(&cli.rpc_url, "usage.get.v1", params).await?;

            println!(
                "  {} {}",
                format!("{}:", result["feature"].as_str().unwrap_or("unknown")).bold(),
                result["total"]
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long prompt", 6), "a lon…");
    }

    #[test]
    fn test_display_uri_hides_inline_data() {
        assert_eq!(display_uri("data:image/png;base64,AAAA"), "<inline image data>");
        assert_eq!(display_uri("https://img/a.png"), "https://img/a.png");
    }

    #[test]
    fn test_build_params_merges_flags() {
        let params = build_params(
            Some("16:9".to_string()),
            Some(2),
            Some(r#"{"quality": "high"}"#.to_string()),
        )
        .unwrap();
        assert_eq!(
            params,
            json!({"quality": "high", "aspect_ratio": "16:9", "count": 2})
        );
    }

    #[test]
    fn test_build_params_rejects_non_object() {
        assert!(build_params(None, None, Some("[1, 2]".to_string())).is_err());
        assert_eq!(build_params(None, None, None).unwrap(), json!({}));
    }
}
