use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use compsync_runtime::RuntimeConfig;
use compsync_store::LocalCache;
use compsync_sync::{diff_documents, DocumentChange};
use compsync_types::{ContentHash, Document};
use serde_json::json;

use crate::cli::*;
use crate::refs::collect_refs;

const PREVIEW_BYTES: usize = 256;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Cache(args) => {
            let cache = open_cache(cli.config.as_deref(), cli.cache_dir)?;
            match args.action {
                CacheAction::Stats => cmd_cache_stats(&cache, format),
                CacheAction::Show { hash, raw } => cmd_cache_show(&cache, &hash, raw),
                CacheAction::Refs { storage } => cmd_cache_refs(&cache, &storage, format),
            }
        }
        Command::Doc(args) => match args.action {
            DocAction::Diff { old, new } => cmd_doc_diff(&old, &new, format),
        },
    }
}

fn open_cache(config: Option<&Path>, cache_dir: Option<PathBuf>) -> anyhow::Result<LocalCache> {
    let config = match config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    let dir = cache_dir.unwrap_or(config.cache_dir);
    tracing::debug!(dir = %dir.display(), "using cache");
    Ok(LocalCache::new(dir))
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_cache_stats(cache: &LocalCache, format: OutputFormat) -> anyhow::Result<()> {
    let entries = cache.list()?;
    let total: u64 = entries.iter().map(|e| e.size).sum();
    if format == OutputFormat::Json {
        let out = json!({
            "dir": cache.dir().display().to_string(),
            "blobs": entries.len(),
            "bytes": total,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("Cache: {}", cache.dir().display().to_string().bold());
    println!("  Blobs: {}", entries.len().to_string().bold());
    println!("  Size:  {}", human_size(total).bold());
    Ok(())
}

fn cmd_cache_show(cache: &LocalCache, hash: &str, raw: bool) -> anyhow::Result<()> {
    let hash = ContentHash::from_hex(hash).context("invalid content hash")?;
    let Some(bytes) = cache.read(&hash)? else {
        anyhow::bail!("blob {} is not in the cache", hash.short_hex());
    };
    if raw {
        println!("{}", hex::encode(&bytes));
        return Ok(());
    }

    println!("Blob {} ({})", hash.short_hex().yellow().bold(), human_size(bytes.len() as u64));
    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let preview: String = text.chars().take(PREVIEW_BYTES).collect();
            println!("  Text: {}", preview);
        }
        Err(_) => {
            let end = bytes.len().min(PREVIEW_BYTES);
            println!("  Hex:  {}", hex::encode(&bytes[..end]).dimmed());
        }
    }
    if bytes.len() > PREVIEW_BYTES {
        println!("  {}", "(truncated, use --raw for the full blob)".dimmed());
    }
    Ok(())
}

fn cmd_cache_refs(cache: &LocalCache, storage: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let doc = read_document(storage)?;
    let refs = collect_refs(&doc);
    let missing = refs.iter().filter(|r| !cache.contains(&r.entry.hash)).count();

    if format == OutputFormat::Json {
        let out: Vec<_> = refs
            .iter()
            .map(|r| {
                json!({
                    "owner": r.owner,
                    "key": r.entry.key,
                    "hash": r.entry.hash,
                    "size": r.entry.size,
                    "type": r.entry.tag,
                    "cached": cache.contains(&r.entry.hash),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for r in &refs {
        let mark = if cache.contains(&r.entry.hash) {
            "✓".green()
        } else {
            "✗".red()
        };
        let owner = if r.owner.is_empty() { "<root>" } else { r.owner.as_str() };
        println!(
            "{} {} {}.{} ({}, {})",
            mark,
            r.entry.hash.short_hex().yellow(),
            owner.bold(),
            r.entry.key,
            r.entry.tag,
            human_size(r.entry.size)
        );
    }
    if missing == 0 {
        println!("\n{} {} references, all cached.", "✓".green().bold(), refs.len());
    } else {
        println!(
            "\n{} {} of {} references missing from the cache.",
            "✗".red().bold(),
            missing,
            refs.len()
        );
    }
    Ok(())
}

fn cmd_doc_diff(old: &Path, new: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let diff = diff_documents(&read_document(old)?, &read_document(new)?);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }
    if diff.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    for change in &diff.changes {
        let line = change.to_string();
        match change {
            DocumentChange::Added { .. } => println!("{}", line.green()),
            DocumentChange::Removed { .. } => println!("{}", line.red()),
            DocumentChange::Modified { .. } => println!("{}", line.yellow()),
        }
    }
    println!(
        "\n{} added, {} removed, {} modified",
        diff.additions().to_string().green(),
        diff.removals().to_string().red(),
        diff.modifications().to_string().yellow()
    );
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
