//! Godless CLI — operator tooling for running queries and replication
//! against a local node.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use godless_core::{IpfsPath, Link, PrivateKey};
use godless_dispatch::{Dispatcher, DispatcherOptions, ReflectKind, Request};
use godless_engine::{RemoteNamespace, RemoteNamespaceOptions};
use godless_eval::ResponseBody;
use godless_query::parse_query;
use godless_store::{FileHeadCache, FileIndexCache, MemoryKeyStore, MemoryStore};

use config::GodlessConfig;

#[derive(Parser)]
#[command(name = "godless")]
#[command(about = "A peer-to-peer, eventually-consistent key-value database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Data directory for the head pointer, index cache, and signing key.
    #[arg(long, global = true, default_value = ".godless")]
    data_dir: PathBuf,

    /// Config file path (optional; defaults are used if absent).
    #[arg(long, global = true, default_value = ".godless/config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a data directory and generate a signing key if none
    /// exists yet.
    Init,

    /// Run a select/join query against the local node.
    Query {
        /// Query text, e.g. "select T where str_eq('Hi', A) limit 2".
        text: String,
    },

    /// Merge a set of peer index links (by content hash) into the local
    /// index.
    Replicate {
        /// Content hashes of peer indices, hex-encoded.
        hashes: Vec<String>,
    },

    /// Print the current head, decoded index, or a merged dump of every
    /// namespace the index reaches.
    Reflect {
        #[command(subcommand)]
        what: ReflectWhat,
    },
}

#[derive(Subcommand)]
enum ReflectWhat {
    Head,
    Index,
    Namespace,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    if matches!(cli.command, Command::Init) {
        return run_init(&cli.data_dir);
    }

    let config = GodlessConfig::load(&cli.config)?;
    let dispatcher = build_dispatcher(&cli.data_dir, &config)?;

    let response = match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::Query { text } => {
            let query = parse_query(&text).context("parsing query")?;
            dispatcher.call(Request::query(query)).await
        }
        Command::Replicate { hashes } => {
            let links = hashes
                .iter()
                .map(|h| IpfsPath::from_hex(h).map(Link::unsigned))
                .collect::<Result<Vec<_>, _>>()
                .context("parsing peer hash")?;
            dispatcher.call(Request::replicate(links)).await
        }
        Command::Reflect { what } => {
            let kind = match what {
                ReflectWhat::Head => ReflectKind::Head,
                ReflectWhat::Index => ReflectKind::Index,
                ReflectWhat::Namespace => ReflectKind::DumpNamespace,
            };
            dispatcher.call(Request::reflect(kind)).await
        }
    }
    .context("dispatcher channel closed without a response")?;

    print_response(&response)
}

fn run_init(data_dir: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let key_path = data_dir.join("key.hex");
    if key_path.exists() {
        println!("signing key already exists at {}", key_path.display());
        return Ok(());
    }
    let key = PrivateKey::generate(&mut rand::rngs::OsRng);
    std::fs::write(&key_path, hex::encode(key.to_bytes()))?;
    println!(
        "generated signing key {} at {}",
        key.public_key().to_hash(),
        key_path.display()
    );
    Ok(())
}

/// Loads the signing key written by `run_init`. This reference
/// implementation keeps exactly one key on disk as plaintext hex; a real
/// key-store would encrypt it at rest.
fn load_key(data_dir: &Path) -> Result<PrivateKey> {
    let key_path = data_dir.join("key.hex");
    let hex_text = std::fs::read_to_string(&key_path)
        .with_context(|| format!("reading {}", key_path.display()))?;
    let bytes = hex::decode(hex_text.trim()).context("decoding signing key")?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("signing key file is not 32 bytes"))?;
    Ok(PrivateKey::from_bytes(&array))
}

fn build_dispatcher(data_dir: &PathBuf, config: &GodlessConfig) -> Result<Arc<Dispatcher>> {
    if !data_dir.join("key.hex").exists() {
        bail!(
            "no signing key at {} — run `godless init` first",
            data_dir.join("key.hex").display()
        );
    }
    let key = load_key(data_dir)?;

    let store = Arc::new(MemoryStore::new());
    let head_cache = Arc::new(FileHeadCache::new(data_dir.join("head.json")));
    let index_cache = Arc::new(FileIndexCache::new(data_dir.join("index_cache")));
    let key_store = Arc::new(MemoryKeyStore::new());
    key_store.store_public(key.public_key());
    key_store.store_private(key);

    let remote = RemoteNamespace::new(RemoteNamespaceOptions {
        store,
        head_cache,
        index_cache,
        key_store,
        is_public_index: config.is_public_index,
    });

    Ok(Dispatcher::new(DispatcherOptions {
        remote,
        query_concurrency: config.query_concurrency,
    }))
}

fn print_response(response: &godless_eval::Response) -> Result<()> {
    if !response.is_ok() {
        eprintln!("error: {}", response.err.as_deref().unwrap_or("unknown"));
        std::process::exit(1);
    }

    match &response.body {
        Some(ResponseBody::Rows(rows)) => {
            for row in rows {
                print!("{}", row.row_key);
                for (entry, values) in &row.entries {
                    let texts: Vec<_> = values.iter().map(|v| v.0.clone()).collect();
                    print!(" {}={}", entry, texts.join(","));
                }
                println!();
            }
        }
        Some(ResponseBody::Joined) => println!("joined"),
        Some(ResponseBody::Replicated { some_failed }) => {
            println!("replicated (some_failed={some_failed})");
        }
        Some(ResponseBody::Head(head)) => println!("{}", head.to_hex()),
        Some(ResponseBody::Index(index)) => {
            for table in index.table_names() {
                for link in index.links(table) {
                    println!("{table} {}", link.path().to_hex());
                }
            }
        }
        Some(ResponseBody::Namespace(ns)) => {
            ns.for_each_entry(|table, row, entry, values| {
                for point in values.values() {
                    println!("{table}/{row}/{entry} = {}", point.text());
                }
            });
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_subcommand() {
        let cli = Cli::try_parse_from(["godless", "query", "select T limit 1"]).unwrap();
        assert!(matches!(cli.command, Command::Query { .. }));
    }

    #[test]
    fn parses_reflect_head_subcommand() {
        let cli = Cli::try_parse_from(["godless", "reflect", "head"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Reflect {
                what: ReflectWhat::Head
            }
        ));
    }

    #[test]
    fn parses_replicate_subcommand_with_hashes() {
        let cli = Cli::try_parse_from(["godless", "replicate", "aa", "bb"]).unwrap();
        let Command::Replicate { hashes } = cli.command else {
            panic!("expected Replicate")
        };
        assert_eq!(hashes, vec!["aa".to_string(), "bb".to_string()]);
    }
}
