use anyhow::Result;
use colored::*;

use mnemo_mcp::core::EngineError;
use mnemo_mcp::memory::MemoryEngine;

pub fn run(
    query: &str,
    tags: &str,
    category: &str,
    limit: usize,
    no_semantic: bool,
    json: bool,
) -> Result<()> {
    let engine = MemoryEngine::open();

    let result = match engine.search(query, tags, category, limit, !no_semantic) {
        Ok(result) => result,
        Err(EngineError::UnknownCategory {
            category,
            available,
        }) => {
            eprintln!("{} category '{}' does not exist", "error:".red(), category);
            if available.is_empty() {
                eprintln!("No categories stored yet");
            } else {
                eprintln!("Available: {}", available.join(", "));
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} ({} of {} matching)",
        "Search Results".bold(),
        result.returned_count,
        result.total_found
    );
    println!("{}", "=".repeat(50));

    if let Some(expansion) = &result.expansion {
        if expansion.expansion_occurred {
            if let Some(expanded) = &expansion.expanded_tags {
                println!(
                    "{} {}",
                    "Tag filter expanded to:".dimmed(),
                    expanded.join(", ").cyan()
                );
                println!();
            }
        }
    }

    if result.memories.is_empty() {
        println!("{}", "No matching memories".dimmed());
        return Ok(());
    }

    for memory in &result.memories {
        let importance = "*".repeat(memory.importance as usize);
        println!(
            "{} {} {}",
            importance.yellow(),
            memory.id.dimmed(),
            memory.created_at.format("%Y-%m-%d")
        );
        println!("   {}", memory.content);
        if !memory.tags.is_empty() {
            println!("   {}", memory.tags.join(", ").green());
        }
        if let Some(category) = &memory.category {
            println!("   {}", category.cyan());
        }
        println!();
    }

    Ok(())
}
