use anyhow::Result;
use colored::*;

use mnemo_mcp::memory::MemoryEngine;

pub fn run(
    content: &str,
    tags: &str,
    category: Option<&str>,
    importance: u8,
    expires_at: Option<&str>,
    json: bool,
) -> Result<()> {
    let engine = MemoryEngine::open();
    let result = engine.memorize(content, tags, category, importance, expires_at)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} memorized as {}", "✓".green(), result.memory.id.cyan());
    if !result.memory.tags.is_empty() {
        println!("   tags: {}", result.memory.tags.join(", ").green());
    }
    if result.tag_mapping.mapping_applied {
        println!("   {}", result.tag_mapping.transparency_info.dimmed());
        for entry in &result.tag_mapping.mapping_log {
            println!("   {}", entry.dimmed());
        }
    }

    Ok(())
}
