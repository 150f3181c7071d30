mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(about = "Persistent memory MCP server with smart tag consolidation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    // ===== MCP Server (also default) =====
    /// Start MCP server for Claude integration
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show Claude configuration instructions")]
        install: bool,
    },

    // ===== Core Commands =====
    /// Initialize the data directory with a default config
    Init {
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },
    /// Store a memory from the command line
    Memorize {
        /// The information to memorize
        content: String,
        #[arg(short, long, default_value = "", help = "Comma-separated tags")]
        tags: String,
        #[arg(short, long, help = "Memory category")]
        category: Option<String>,
        #[arg(short, long, default_value = "3", help = "Importance 1-5")]
        importance: u8,
        #[arg(long, help = "Expiration date (ISO 8601)")]
        expires_at: Option<String>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Search stored memories
    Search {
        /// Content words to match (all must appear)
        #[arg(default_value = "")]
        query: String,
        #[arg(short, long, default_value = "", help = "Comma-separated tag filter")]
        tags: String,
        #[arg(short, long, default_value = "", help = "Category filter (exact match)")]
        category: String,
        #[arg(short, long, default_value = "10", help = "Limit results")]
        limit: usize,
        #[arg(long, help = "Disable semantic tag expansion")]
        no_semantic: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Memory and tag statistics
    Stats {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Tag vocabulary management
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,
    },
}

/// Tag management subcommands
#[derive(Subcommand)]
enum TagsAction {
    /// List stored tags (default)
    List {
        #[arg(
            short,
            long,
            default_value = "usage",
            help = "Sort order: usage, alphabetical, recent"
        )]
        sort: String,
        #[arg(short, long, default_value = "50", help = "Limit results")]
        limit: usize,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Find stored tags similar to a query
    Similar {
        /// Tag or phrase to match against the vocabulary
        query: String,
        #[arg(short, long, default_value = "5", help = "Number of results")]
        limit: usize,
        #[arg(long, default_value = "0.4", help = "Minimum similarity 0.0-1.0")]
        min_similarity: f32,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        // Default: run MCP server
        None => {
            #[cfg(feature = "mcp")]
            {
                run_mcp_server()
            }
            #[cfg(not(feature = "mcp"))]
            {
                eprintln!("MCP feature not enabled. Build with --features mcp");
                std::process::exit(1);
            }
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Some(Commands::Mcp { install }) => {
            if install {
                print_mcp_install_instructions();
                Ok(())
            } else {
                run_mcp_server()
            }
        }

        Some(Commands::Init { force }) => commands::init::run(force),
        Some(Commands::Memorize {
            content,
            tags,
            category,
            importance,
            expires_at,
            json,
        }) => commands::memorize::run(
            &content,
            &tags,
            category.as_deref(),
            importance,
            expires_at.as_deref(),
            json,
        ),
        Some(Commands::Search {
            query,
            tags,
            category,
            limit,
            no_semantic,
            json,
        }) => commands::search::run(&query, &tags, &category, limit, no_semantic, json),
        Some(Commands::Stats { json }) => commands::stats::run(json),
        Some(Commands::Tags { action }) => match action {
            None => commands::tags::run_list("usage", 50, false),
            Some(TagsAction::List { sort, limit, json }) => {
                commands::tags::run_list(&sort, limit, json)
            }
            Some(TagsAction::Similar {
                query,
                limit,
                min_similarity,
                json,
            }) => commands::tags::run_similar(&query, limit, min_similarity, json),
        },
    }
}

/// Logs go to stderr; stdout is reserved for the MCP transport.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "mcp")]
fn run_mcp_server() -> anyhow::Result<()> {
    let data_dir = mnemo_mcp::core::config::get_data_dir();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(mnemo_mcp::mcp::run_mcp_server(data_dir))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions() {
    use colored::Colorize;
    use mnemo_mcp::core::config::DATA_PATH_ENV;

    let data_dir = mnemo_mcp::core::config::get_data_dir()
        .to_string_lossy()
        .to_string();

    println!("{}", "mnemo MCP Server Installation Guide".bold().cyan());
    println!();
    println!("{}", "Configuration Priority:".bold());
    println!(
        "  1. {} environment variable (recommended)",
        DATA_PATH_ENV.yellow()
    );
    println!("  2. Current working directory (fallback)");
    println!();
    println!(
        "{}",
        "For Claude Desktop (~/.config/claude/claude_desktop_config.json):".dimmed()
    );
    println!(
        r#"{{
  "mcpServers": {{
    "mnemo": {{
      "command": "mnemo",
      "env": {{
        "{}": "{}"
      }}
    }}
  }}
}}"#,
        DATA_PATH_ENV, data_dir
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!(
        "  • {} - Store information with smart tag mapping",
        "memorize".green()
    );
    println!("  • {} - Retrieve a memory by ID", "recall_memory".green());
    println!(
        "  • {} - Search with semantic tag expansion",
        "search_memories".green()
    );
    println!("  • {} - List active memories", "list_memories".green());
    println!("  • {} - Update a memory", "update_memory".green());
    println!("  • {} - Delete a memory", "delete_memory".green());
    println!("  • {} - Memory statistics", "memory_stats".green());
    println!(
        "  • {} - Discover the existing tag vocabulary",
        "find_similar_tags".green()
    );
    println!("  • {} - List stored tags", "list_tags".green());
    println!(
        "  • {} - Stored and suggested categories",
        "memory_categories".green()
    );
    println!(
        "  • {} - Semantic similarity between texts",
        "compute_similarity".green()
    );
    println!(
        "  • {} - Rank texts against a query",
        "rank_texts".green()
    );
}
