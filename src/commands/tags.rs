use anyhow::{bail, Result};
use colored::*;

use mnemo_mcp::memory::MemoryEngine;
use mnemo_mcp::tags::TagSort;

/// List stored tags with usage statistics.
pub fn run_list(sort_by: &str, limit: usize, json: bool) -> Result<()> {
    let Some(sort) = TagSort::parse(sort_by) else {
        bail!(
            "unknown sort order '{}'. Valid: {}",
            sort_by,
            TagSort::NAMES.join(", ")
        );
    };

    let engine = MemoryEngine::open();
    let tags = engine.list_tags(sort, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    println!("{}", "Stored Tags".bold());
    println!("{}", "=".repeat(50));
    if tags.is_empty() {
        println!("{}", "No tags stored yet".dimmed());
        return Ok(());
    }

    for tag in &tags {
        let embedded = if tag.embedding.is_empty() {
            "".normal()
        } else {
            " [embedded]".dimmed()
        };
        println!(
            "   {:<24} {:>4}x  last used {}{}",
            tag.tag.green(),
            tag.usage_count,
            tag.last_used_at.format("%Y-%m-%d"),
            embedded
        );
    }

    Ok(())
}

/// Find stored tags similar to a query.
pub fn run_similar(query: &str, limit: usize, min_similarity: f32, json: bool) -> Result<()> {
    let engine = MemoryEngine::open();
    let result = engine.find_similar_tags(query, limit, min_similarity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} {}", "Tags similar to".bold(), query.cyan());
    println!("{}", "=".repeat(50));
    if result.similar_tags.is_empty() {
        println!("{}", "No similar tags found".dimmed());
        return Ok(());
    }

    if result.total_found > result.similar_tags.len() {
        println!(
            "{}",
            format!(
                "(showing {} of {} matches)",
                result.similar_tags.len(),
                result.total_found
            )
            .dimmed()
        );
    }

    for tag in &result.similar_tags {
        println!(
            "   {:<24} similarity {:.2}  ({}x)",
            tag.tag.green(),
            tag.similarity,
            tag.usage_count
        );
    }

    Ok(())
}
