use anyhow::Result;
use colored::*;

use mnemo_mcp::memory::{MemoryEngine, MemoryStatistics};

pub fn run(json: bool) -> Result<()> {
    let engine = MemoryEngine::open();
    let stats = engine.stats()?;
    let tag_stats = engine.tag_stats()?;

    if json {
        let output = serde_json::json!({
            "memories": stats,
            "tags": tag_stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&stats);
        println!();
        println!("{}", "Tags".cyan());
        println!("{}", "-".repeat(30));
        println!("   Total tags:    {}", tag_stats.total_tags);
        println!("   Total usage:   {}", tag_stats.total_usage);
        if let Some(tag) = &tag_stats.most_used_tag {
            println!("   Most used:     {} ({}x)", tag, tag_stats.most_used_count);
        }
    }

    Ok(())
}

fn print_report(stats: &MemoryStatistics) {
    println!("{}", "Memory Statistics".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Total memories:   {}", stats.total_memories);
    println!(
        "Active:           {}",
        stats.active_memories.to_string().green()
    );
    if stats.expired_memories > 0 {
        println!(
            "Expired:          {}",
            stats.expired_memories.to_string().yellow()
        );
    }
    println!();

    println!("{}", "Importance Distribution".cyan());
    println!("{}", "-".repeat(30));
    for (importance, count) in &stats.importance_distribution {
        println!("   {:<3} {:>4}", importance, count);
    }

    if !stats.category_distribution.is_empty() {
        println!();
        println!("{}", "Category Distribution".cyan());
        println!("{}", "-".repeat(30));
        for (category, count) in &stats.category_distribution {
            println!("   {:<20} {:>4}", category, count);
        }
    }
}
