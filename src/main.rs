//! pageturn - book and page backend for the storybook app.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pageturn::{
    api::{self, ApiState},
    store::{PageStore, StoreConfig},
};

/// Book and page backend.
#[derive(Parser)]
#[command(name = "pageturn", about = "Book and page backend for the storybook app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API daemon.
    Daemon {
        /// Address to bind the API server.
        #[arg(long, default_value = "0.0.0.0:7979", env = "PAGETURN_BIND")]
        bind: String,

        /// Data directory for the database.
        #[arg(long, env = "PAGETURN_DATA_DIR")]
        data_dir: Option<std::path::PathBuf>,

        /// Skip the placeholder repair pass at startup.
        #[arg(long)]
        no_repair: bool,
    },

    /// Show daemon status.
    Status {
        /// pageturn API URL.
        #[arg(long, env = "PAGETURN_API_URL", default_value = "http://localhost:7979")]
        api_url: String,
    },

    /// List the pages of a book.
    Pages {
        /// Book ID.
        book_id: String,

        /// pageturn API URL.
        #[arg(long, env = "PAGETURN_API_URL", default_value = "http://localhost:7979")]
        api_url: String,
    },

    /// Reorder the pages of a book.
    Reorder {
        /// Book ID.
        book_id: String,

        /// Moves as <page_id>=<position>.
        #[arg(required = true)]
        moves: Vec<String>,

        /// pageturn API URL.
        #[arg(long, env = "PAGETURN_API_URL", default_value = "http://localhost:7979")]
        api_url: String,
    },

    /// Normalize placeholder positions left in a book.
    Repair {
        /// Book ID.
        book_id: String,

        /// pageturn API URL.
        #[arg(long, env = "PAGETURN_API_URL", default_value = "http://localhost:7979")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pageturn=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            bind,
            data_dir,
            no_repair,
        } => {
            run_daemon(&bind, data_dir, no_repair).await?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }

        Commands::Pages { book_id, api_url } => {
            list_pages(&api_url, &book_id).await?;
        }

        Commands::Reorder {
            book_id,
            moves,
            api_url,
        } => {
            reorder(&api_url, &book_id, &moves).await?;
        }

        Commands::Repair { book_id, api_url } => {
            repair(&api_url, &book_id).await?;
        }
    }

    Ok(())
}

/// Run the API daemon.
async fn run_daemon(bind: &str, data_dir: Option<std::path::PathBuf>, no_repair: bool) -> Result<()> {
    tracing::info!("Starting pageturn daemon...");

    let config = match data_dir {
        Some(dir) => StoreConfig::new(dir),
        None => StoreConfig::default(),
    };
    let config = config.with_repair_on_open(!no_repair);

    let store = PageStore::open(&config)?;
    let stats = store.stats()?;
    tracing::info!(
        books = stats.books,
        pages = stats.pages,
        placeholder_pages = stats.placeholder_pages,
        "Store ready"
    );

    let state = Arc::new(ApiState::new(store));

    api::serve(state, bind).await?;

    Ok(())
}

/// Parse `<page_id>=<position>` arguments into a `pageOrder` list.
fn parse_moves(moves: &[String]) -> Result<Vec<serde_json::Value>> {
    moves
        .iter()
        .map(|raw| {
            let (page_id, position) = raw
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Expected <page_id>=<position>, got {:?}", raw))?;
            let position: i64 = position
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid position in {:?}", raw))?;
            Ok(serde_json::json!({ "pageId": page_id.trim(), "newPosition": position }))
        })
        .collect()
}

/// Print a page listing.
fn print_pages(pages: &[serde_json::Value]) {
    if pages.is_empty() {
        println!("No pages found.");
        return;
    }

    println!("{:<6} {:<26} {:<40}", "POS", "ID", "TEXT");
    println!("{}", "-".repeat(72));

    for page in pages {
        let text = page["text"].as_str().unwrap_or("");
        let preview: String = text.chars().take(40).collect();
        println!(
            "{:<6} {:<26} {:<40}",
            page["position"],
            page["id"].as_str().unwrap_or("?"),
            preview
        );
    }
}

/// Show daemon status via API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/status", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("pageturn Status");
    println!("===============");
    println!("Status:       {}", status["status"]);
    println!("Version:      {}", status["version"]);
    println!("Uptime:       {}s", status["uptime_secs"]);
    println!("Books:        {}", status["books"]);
    println!("Pages:        {}", status["pages"]);
    println!("Placeholders: {}", status["placeholder_pages"]);

    Ok(())
}

/// List the pages of a book via API.
async fn list_pages(api_url: &str, book_id: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/books/{}/pages", api_url, book_id);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to list pages: {}", response.status());
    }

    let pages: Vec<serde_json::Value> = response.json().await?;
    print_pages(&pages);

    Ok(())
}

/// Reorder pages via API.
async fn reorder(api_url: &str, book_id: &str, moves: &[String]) -> Result<()> {
    let page_order = parse_moves(moves)?;

    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/pages/reorder", api_url);

    let body = serde_json::json!({
        "parentId": book_id,
        "pageOrder": page_order,
    });

    let response = client.post(&url).json(&body).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Failed to reorder pages: {}", error_text);
    }

    let result: serde_json::Value = response.json().await?;

    println!(
        "Applied {} of {} moves ({} skipped as malformed)",
        result["applied"], result["requested"], result["skipped"]
    );
    if let Some(pages) = result["pages"].as_array() {
        print_pages(pages);
    }

    Ok(())
}

/// Repair placeholder positions via API.
async fn repair(api_url: &str, book_id: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/books/{}/pages/repair", api_url, book_id);

    let response = client.post(&url).send().await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Failed to repair pages: {}", error_text);
    }

    let result: serde_json::Value = response.json().await?;

    println!("Repaired {} pages", result["repaired"]);
    if let Some(pages) = result["pages"].as_array() {
        print_pages(pages);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_moves() {
        let moves = vec![
            "65a1f0c2e4b0a1b2c3d4e5f1=3".to_string(),
            " 65a1f0c2e4b0a1b2c3d4e5f2 = 1 ".to_string(),
        ];
        let parsed = parse_moves(&moves).unwrap();

        assert_eq!(parsed[0]["pageId"], "65a1f0c2e4b0a1b2c3d4e5f1");
        assert_eq!(parsed[0]["newPosition"], 3);
        assert_eq!(parsed[1]["pageId"], "65a1f0c2e4b0a1b2c3d4e5f2");
        assert_eq!(parsed[1]["newPosition"], 1);

        assert!(parse_moves(&["no-separator".to_string()]).is_err());
        assert!(parse_moves(&["abc=x".to_string()]).is_err());
    }
}
