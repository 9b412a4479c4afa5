use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{ChainDump, Transaction};
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a post to the pending pool
    Submit {
        #[arg(long)]
        author: String,
        #[arg(long)]
        content: String,
    },
    /// Mine the pending pool into a block
    Mine,
    /// Print the node's chain dump
    Chain,
    /// Print transactions waiting to be mined
    Pending,
    /// Have the node join the network of an existing node
    Register {
        /// Base URL of the existing node
        #[arg(long)]
        existing: String,
    },
    /// Run one consensus round on the node
    Consensus,
    /// Print every mined post, newest first
    Feed {
        /// Show at most this many posts
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Serialize)]
struct NewTransaction<'a> {
    author: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct RegisterWithExisting<'a> {
    node_address: &'a str,
}

/// A mined transaction tagged with the block that holds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct Post {
    index: u64,
    /// Parent hash of the containing block.
    hash: String,
    author: String,
    content: String,
    timestamp: String,
}

/// Flattens a chain into posts ordered newest first.
fn posts(dump: &ChainDump) -> Vec<Post> {
    let mut posts: Vec<Post> = dump
        .chain
        .iter()
        .flat_map(|block| {
            block.transactions.iter().map(move |tx| Post {
                index: block.index,
                hash: block.previous_hash.clone(),
                author: tx.author.clone(),
                content: tx.content.clone(),
                timestamp: tx.timestamp.clone(),
            })
        })
        .collect();
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    posts
}

async fn print_response(res: Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}

async fn fetch_chain(client: &Client, node: &str) -> Result<ChainDump> {
    client
        .get(format!("{node}/chain"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("decoding chain dump")
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = Client::new();
    debug!(%node, "using node");

    match cli.cmd {
        Command::Submit { author, content } => {
            let tx = NewTransaction {
                author: &author,
                content: &content,
            };
            let res = client
                .post(format!("{node}/new_transaction"))
                .json(&tx)
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Mine => {
            let res = client.get(format!("{node}/mine")).send().await?;
            print_response(res).await?;
        }
        Command::Chain => {
            let dump = fetch_chain(&client, node).await?;
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        Command::Pending => {
            let pending: Vec<Transaction> = client
                .get(format!("{node}/pending_tx"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
        Command::Register { existing } => {
            let res = client
                .post(format!("{node}/register_with_existing_node"))
                .json(&RegisterWithExisting {
                    node_address: &existing,
                })
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Consensus => {
            let res = client.get(format!("{node}/consensus")).send().await?;
            print_response(res).await?;
        }
        Command::Feed { limit } => {
            let dump = fetch_chain(&client, node).await?;
            let posts = posts(&dump);
            let shown = limit.unwrap_or(posts.len());
            for post in posts.iter().take(shown) {
                println!(
                    "#{:<4} {}  {}: {}",
                    post.index, post.timestamp, post.author, post.content
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::Block;

    fn tx(author: &str, timestamp: &str) -> Transaction {
        Transaction {
            author: author.into(),
            content: format!("post by {author}"),
            timestamp: timestamp.into(),
        }
    }

    #[test]
    fn feed_is_newest_first_and_tagged() {
        let genesis = Block::genesis();
        let mut b1 = Block::new(
            1,
            vec![
                tx("ann", "2024-01-01 10:00:00.000000"),
                tx("bo", "2024-01-01 12:00:00.000000"),
            ],
            genesis.hash.clone(),
        );
        b1.hash = "00aa".into();
        let b2 = Block::new(2, vec![tx("cy", "2024-01-01 11:00:00.000000")], "00aa");
        let dump = ChainDump::new(vec![genesis, b1, b2], vec![]);

        let feed = posts(&dump);
        let authors: Vec<_> = feed.iter().map(|p| p.author.as_str()).collect();
        assert_eq!(authors, ["bo", "cy", "ann"]);
        assert_eq!(feed[1].index, 2);
        assert_eq!(feed[1].hash, "00aa");
    }

    #[test]
    fn global_node_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["ledger-cli", "mine", "--node", "http://n:1"]);
        assert_eq!(cli.node, "http://n:1");
        assert!(matches!(cli.cmd, Command::Mine));
    }
}
