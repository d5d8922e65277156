//! Avatar CLI
//!
//! Resolve player avatars through the proxy and manage the on-disk cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use avatar_client::{AvatarResolver, ResolverConfig, ResolverStats};
use avatar_core::PlayerId;

/// Resolve player avatars with caching and request coalescing
#[derive(Parser)]
#[command(name = "avatar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Avatar proxy endpoint
    #[arg(long, global = true, env = "AVATAR_PROXY_URL")]
    proxy_url: Option<String>,

    /// Directory holding the persisted cache
    #[arg(long, global = true, env = "AVATAR_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Cache TTL in seconds
    #[arg(long, global = true, env = "AVATAR_CACHE_TTL_SECONDS")]
    ttl_seconds: Option<u64>,

    /// Proxy request timeout in seconds
    #[arg(long, global = true)]
    timeout_seconds: Option<u64>,

    /// Keep the cache in memory only
    #[arg(long, global = true)]
    no_persist: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more player ids to avatar URLs
    Resolve {
        /// Player ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop a cached avatar, or the whole cache when no id is given
    Invalidate {
        /// Player id
        id: Option<String>,
    },

    /// Show cache statistics
    Stats,

    /// Remove expired entries from the persisted cache
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "avatar=debug,avatar_client=debug,info"
    } else {
        "avatar=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let resolver = build_resolver(&cli).await?;

    match cli.command {
        Commands::Resolve { ids, json } => cmd_resolve(&resolver, &ids, json).await,
        Commands::Invalidate { id } => cmd_invalidate(&resolver, id.as_deref()).await,
        Commands::Stats => cmd_stats(&resolver),
        Commands::Purge => cmd_purge(&resolver).await,
    }
}

/// Layers CLI flags over environment configuration.
async fn build_resolver(cli: &Cli) -> Result<AvatarResolver> {
    let mut config = ResolverConfig::from_env();

    if let Some(url) = &cli.proxy_url {
        config.proxy.endpoint = url.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(ttl) = cli.ttl_seconds {
        config = config.with_ttl_seconds(ttl);
    }
    if let Some(timeout) = cli.timeout_seconds {
        config = config.with_timeout(timeout);
    }
    if cli.no_persist {
        config = config.no_persistence();
    }

    debug!(?config, "Resolver configuration");

    AvatarResolver::from_config(config)
        .await
        .context("Failed to configure avatar resolver")
}

/// Resolve ids concurrently
async fn cmd_resolve(resolver: &AvatarResolver, ids: &[String], json: bool) -> Result<()> {
    let lookups = ids.iter().map(|id| async move { (id.as_str(), resolver.resolve(id).await) });
    let results = futures::future::join_all(lookups).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&json_results(results))?);
        return Ok(());
    }

    for (id, url) in results {
        match url {
            Some(url) => println!("{} {} {}", id.bold(), "→".dimmed(), url.green()),
            None => println!("{} {} {}", id.bold(), "→".dimmed(), initials(id).yellow()),
        }
    }

    Ok(())
}

/// Invalidate one id or everything
async fn cmd_invalidate(resolver: &AvatarResolver, id: Option<&str>) -> Result<()> {
    match invalidate_target(id)? {
        Some(player) => {
            let key = player.as_key();
            resolver.invalidate(Some(key.as_str())).await;
            println!("{} {}", "Invalidated:".green(), player);
        }
        None => {
            resolver.invalidate(None).await;
            println!("{}", "Cleared avatar cache".green());
        }
    }

    Ok(())
}

/// Print cache statistics
fn cmd_stats(resolver: &AvatarResolver) -> Result<()> {
    println!("{}", "Avatar cache".cyan().bold());
    for (label, value) in stats_lines(&resolver.stats()) {
        println!("   {} {}", label.dimmed(), value);
    }

    Ok(())
}

/// Purge expired entries
async fn cmd_purge(resolver: &AvatarResolver) -> Result<()> {
    let purged = resolver.purge_expired().await;
    println!("{} {} expired avatar(s)", "Purged".green(), purged);
    Ok(())
}

/// Placeholder shown when no avatar resolves.
fn initials(id: &str) -> String {
    let id = id.trim();
    let tag: String = id.chars().take(2).collect();
    if tag.is_empty() {
        "[?]".to_string()
    } else {
        format!("[{}]", tag.to_uppercase())
    }
}

/// Output key for an id: the cache key when valid, the trimmed input otherwise.
fn result_key(raw: &str) -> String {
    PlayerId::parse(raw)
        .map(|id| id.as_key())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// JSON object of results keyed by [`result_key`], so `7` and `007` share one key.
fn json_results<'a>(
    results: impl IntoIterator<Item = (&'a str, Option<String>)>,
) -> serde_json::Map<String, serde_json::Value> {
    results
        .into_iter()
        .map(|(id, url)| (result_key(id), url.map_or(serde_json::Value::Null, Into::into)))
        .collect()
}

/// `None` clears everything; a given id must be a valid player id.
fn invalidate_target(id: Option<&str>) -> Result<Option<PlayerId>> {
    id.map(|raw| PlayerId::parse(raw).with_context(|| format!("Invalid player id: {raw:?}")))
        .transpose()
}

fn stats_lines(stats: &ResolverStats) -> Vec<(&'static str, String)> {
    vec![
        ("Entries:", stats.cache.total_entries.to_string()),
        ("Valid:", stats.cache.valid_entries.to_string()),
        ("Expired:", stats.cache.expired_entries.to_string()),
        ("TTL:", format!("{}s", stats.cache.ttl_seconds)),
        ("In flight:", stats.in_flight.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_client::CacheStats;

    #[test]
    fn test_initials_placeholder() {
        assert_eq!(initials("156"), "[15]");
        assert_eq!(initials("  "), "[?]");
        assert_eq!(initials("7"), "[7]");
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from(["avatar", "--no-persist", "resolve", "1", "2"]).unwrap();
        assert!(cli.no_persist);
        match cli.command {
            Commands::Resolve { ids, json } => {
                assert_eq!(ids, vec!["1", "2"]);
                assert!(!json);
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_cli_invalidate_without_id() {
        let cli = Cli::try_parse_from(["avatar", "invalidate"]).unwrap();
        assert!(matches!(cli.command, Commands::Invalidate { id: None }));
    }

    #[test]
    fn test_json_results_use_cache_keys() {
        let results = vec![
            ("7", Some("https://cdn/7.png".to_string())),
            ("007", Some("https://cdn/7.png".to_string())),
            (" 7 ", Some("https://cdn/7.png".to_string())),
            ("abc", None),
        ];

        let map = json_results(results);

        assert_eq!(map.len(), 2);
        assert_eq!(map["7"], serde_json::json!("https://cdn/7.png"));
        assert_eq!(map["abc"], serde_json::Value::Null);
    }

    #[test]
    fn test_invalidate_target_validates_id() {
        assert!(invalidate_target(None).unwrap().is_none());
        assert_eq!(invalidate_target(Some("007")).unwrap().unwrap().as_key(), "7");

        let err = invalidate_target(Some("0")).unwrap_err();
        assert!(err.to_string().contains("Invalid player id"));
        assert!(invalidate_target(Some("abc")).is_err());
    }

    #[test]
    fn test_stats_lines_include_in_flight() {
        let stats = ResolverStats {
            cache: CacheStats {
                total_entries: 3,
                expired_entries: 1,
                valid_entries: 2,
                ttl_seconds: 3600,
            },
            in_flight: 4,
        };

        let lines = stats_lines(&stats);

        assert_eq!(lines.last(), Some(&("In flight:", "4".to_string())));
        assert!(lines.contains(&("TTL:", "3600s".to_string())));
    }
}
