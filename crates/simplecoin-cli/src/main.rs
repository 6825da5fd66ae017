use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "simplecoin-cli")]
#[command(about = "Operator client for a SimpleCoin node")]
struct Cli {
    /// Node operator API base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: f64,
    },
    /// Mine the pending transactions into a block
    Mine,
    /// List the chain
    Chain,
    /// Show the tip
    Head,
    /// Show pending transactions
    Pool,
    /// Balance of an identifier
    Balance { id: String },
}

#[derive(Serialize)]
struct Tx {
    from: String,
    to: String,
    amount: f64,
}

#[derive(Deserialize)]
struct BlockRow {
    index: u64,
    hash: String,
    transactions: Vec<Value>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let res = match cli.cmd {
        Command::Submit { from, to, amount } => {
            let tx = Tx { from, to, amount };
            client.post(format!("{node}/tx")).json(&tx).send().await?
        }
        Command::Mine => client.post(format!("{node}/mine")).send().await?,
        Command::Chain => {
            let blocks: Vec<BlockRow> = client
                .get(format!("{node}/chain"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            for b in blocks {
                println!(
                    "Index: {}, Hash: {}..., Tx: {}",
                    b.index,
                    &b.hash[..10.min(b.hash.len())],
                    b.transactions.len()
                );
            }
            return Ok(());
        }
        Command::Head => client.get(format!("{node}/chain/head")).send().await?,
        Command::Pool => client.get(format!("{node}/pool")).send().await?,
        Command::Balance { id } => {
            let id = urlencoding::encode(&id);
            client.get(format!("{node}/balance/{id}")).send().await?
        }
    };

    let status = res.status();
    let body = res.text().await?;
    debug!(%status, "response");
    println!("status: {status}");
    println!("{}", render_body(&body));
    Ok(())
}

/// Pretty-print JSON bodies. Anything else, such as axum's plain-text
/// extractor rejections, is shown as sent.
fn render_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
