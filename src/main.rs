use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use tracing::info;

use aipex_snapshot::diff::{diff_snapshots, format_diff};
use aipex_snapshot::dom::CollectorOptions;
use aipex_snapshot::search::{search_and_format, SearchOptions};
use aipex_snapshot::{collect, serialize, Document};

#[derive(Parser)]
#[command(name = "aipex-snapshot")]
#[command(about = "DOM accessibility snapshot engine - stable text snapshots of web pages for LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a snapshot of an HTML file or stdin
    Snapshot {
        /// HTML file path, or '-' for stdin
        input: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Base URL recorded in metadata and used for href resolution
        #[arg(short, long, default_value = "")]
        url: String,

        /// Keep hard-hidden elements (aria-hidden, hidden, inert, display:none)
        #[arg(long)]
        include_hidden: bool,

        /// Truncation limit for interactive text content
        #[arg(long, default_value_t = 160)]
        max_text_length: usize,
    },

    /// Search the rendered snapshot of an HTML file
    Search {
        /// HTML file path, or '-' for stdin
        input: String,

        /// Substring or glob query; '|' separates alternatives
        query: String,

        /// Lines of context around each match
        #[arg(short, long, default_value_t = 0)]
        context: usize,

        /// Match case-sensitively
        #[arg(long)]
        case_sensitive: bool,

        /// Force glob matching even without wildcard characters
        #[arg(long)]
        glob: bool,

        /// Base URL recorded in metadata and used for href resolution
        #[arg(short, long, default_value = "")]
        url: String,
    },

    /// Diff two HTML captures of the same page. Inputs should carry
    /// data-aipex-nodeid attributes from an earlier collection, otherwise
    /// every element counts as added/removed.
    Diff {
        /// Earlier capture (HTML file path)
        before: String,

        /// Later capture (HTML file path)
        after: String,

        /// Base URL recorded in metadata
        #[arg(short, long, default_value = "")]
        url: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot {
            input,
            format,
            url,
            include_hidden,
            max_text_length,
        } => {
            let html = read_input(&input)?;
            let mut doc = Document::parse(&html, &url);
            let snapshot = collect(
                &mut doc,
                CollectorOptions {
                    max_text_length,
                    include_hidden,
                    ..Default::default()
                },
            );
            info!(nodes = snapshot.total_nodes, "snapshot complete");
            let output = match format.as_str() {
                "json" => serde_json::to_string_pretty(&snapshot)?,
                _ => serialize::format(&serialize::build_text(&snapshot, None)),
            };
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Commands::Search {
            input,
            query,
            context,
            case_sensitive,
            glob,
            url,
        } => {
            let html = read_input(&input)?;
            let mut doc = Document::parse(&html, &url);
            let snapshot = collect(&mut doc, CollectorOptions::default());
            let options = SearchOptions {
                case_sensitive,
                use_glob: glob,
                context_levels: context,
            };
            let output = search_and_format(Some(&snapshot), &query, context, &options)
                .unwrap_or_default();
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Commands::Diff { before, after, url } => {
            let mut before_doc = Document::parse(&read_input(&before)?, &url);
            let mut after_doc = Document::parse(&read_input(&after)?, &url);
            let before_snapshot = collect(&mut before_doc, CollectorOptions::default());
            let after_snapshot = collect(&mut after_doc, CollectorOptions::default());
            let diff = diff_snapshots(&before_snapshot, &after_snapshot);
            info!(changes = diff.total_changes, "diff complete");
            println!("{}", format_diff(&diff));
            Ok(())
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}
