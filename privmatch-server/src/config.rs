use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use privmatch_core::search::{DEFAULT_LIMIT, MAX_LIMIT};
use privmatch_core::{SimilarityMetric, StoreConfig, SyncMode};

/// Privacy-aware entity matching server
#[derive(Parser, Debug, Clone)]
#[command(name = "privmatch-server", version)]
#[command(about = "Privacy-aware entity matching server", long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "PRIVMATCH_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Directory for the snapshot and WAL. Entities stay in memory if unset
    #[arg(long, env = "PRIVMATCH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Embedding dimension
    #[arg(long, env = "PRIVMATCH_DIMENSION", default_value_t = 384)]
    pub dimension: usize,

    /// Similarity metric: cosine, dot or euclidean
    #[arg(long, env = "PRIVMATCH_METRIC", default_value = "cosine", value_parser = parse_metric)]
    pub metric: SimilarityMetric,

    /// WAL sync mode: immediate, batched or none
    #[arg(long, env = "PRIVMATCH_SYNC_MODE", default_value = "batched")]
    pub sync_mode: SyncMode,

    /// Result count for searches that do not set a limit (1 to 1000)
    #[arg(
        long,
        env = "PRIVMATCH_DEFAULT_LIMIT",
        default_value_t = DEFAULT_LIMIT,
        value_parser = parse_limit
    )]
    pub default_limit: usize,
}

impl Config {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.dimension, self.metric).with_sync_mode(self.sync_mode)
    }
}

fn parse_metric(s: &str) -> Result<SimilarityMetric, String> {
    SimilarityMetric::parse(s).ok_or_else(|| format!("unknown metric '{}'", s))
}

fn parse_limit(s: &str) -> Result<usize, String> {
    let limit: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a positive integer", s))?;
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(format!("limit must be between 1 and {}", MAX_LIMIT))
    }
}
