#![forbid(unsafe_code)]
//! Mines a fresh chain from the command line and prints it as a table.

use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use powchain::blockchain::Block;
use powchain::config::load_config_from;
use powchain::node::init_logging;
use powchain::service::BlockchainService;

#[derive(Parser)]
#[command(author, version, about = "Mine blocks into a fresh in-memory chain", long_about = None)]
struct Cli {
    /// Content of each block to mine after genesis (one block per value)
    contents: Vec<String>,
    /// Number of leading zero hex digits required in every digest
    #[arg(short, long)]
    difficulty: Option<usize>,
    /// Worker threads used for the nonce search
    #[arg(short, long)]
    threads: Option<usize>,
    /// Give up on a block after this many attempts
    #[arg(long)]
    max_attempts: Option<u64>,
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Write the mined chain as JSON to this file
    #[arg(short, long)]
    export: Option<PathBuf>,
}

fn spinner(message: String) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn elapsed(start: Instant) -> String {
    let millis = start.elapsed().as_millis() as u64;
    humantime::format_duration(Duration::from_millis(millis)).to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("warn");
    let cli = Cli::parse();

    let mut config = load_config_from(&cli.config)?;
    if let Some(difficulty) = cli.difficulty {
        config.chain.difficulty = difficulty;
    }
    if let Some(threads) = cli.threads {
        config.miner.threads = threads;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.miner.max_attempts = max_attempts;
    }

    println!(
        "{} difficulty {}, {} thread(s)\n",
        "⛏️  Mining".bright_cyan().bold(),
        config.chain.difficulty.to_string().bright_yellow(),
        config.miner.threads
    );

    let run_start = Instant::now();

    let start = Instant::now();
    let pb = spinner("Mining genesis block...".to_string())?;
    let service = BlockchainService::new(&config);
    pb.finish_and_clear();
    let service = service?;
    println!("{} genesis in {}", "✓".bright_green(), elapsed(start));

    // Always mine at least one block on top of genesis.
    let contents = if cli.contents.is_empty() {
        vec![String::new()]
    } else {
        cli.contents.clone()
    };

    for content in &contents {
        let start = Instant::now();
        let pb = spinner(format!("Mining block {}...", service.size()))?;
        let result = service.create_block(content);
        pb.finish_and_clear();
        let block = result?;
        println!(
            "{} block {} in {} (nonce {})",
            "✓".bright_green(),
            block.id(),
            elapsed(start),
            block.nonce()
        );
    }

    println!();
    print_blocks(&service.get_all_blocks());

    let report = service.validate();
    let stats = service.stats();
    println!();
    println!("{}", "Summary".bright_green().underline());
    println!("  Blocks:        {}", report.total_blocks);
    println!("  Total reward:  {}", stats.total_reward);
    println!("  Elapsed:       {}", elapsed(run_start));
    if report.is_valid {
        println!("  Validation:    {}", "VALID".bright_green().bold());
    } else {
        println!("  Validation:    {}", "INVALID".bright_red().bold());
        for error in &report.errors {
            println!("    {}", error.red());
        }
    }

    if let Some(path) = &cli.export {
        let json = serde_json::to_string_pretty(&service.snapshot())?;
        std::fs::write(path, json)?;
        println!("\n{} {}", "Chain exported to".bright_cyan(), path.display());
    }

    Ok(())
}

fn print_blocks(blocks: &[Block]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Id").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Nonce").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Hash").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Previous").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Content").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
        ]);

    for block in blocks {
        table.add_row(vec![
            Cell::new(block.id()).fg(TableColor::White),
            Cell::new(block.nonce()).fg(TableColor::Yellow),
            Cell::new(short_hash(block.hash())).fg(TableColor::Green),
            Cell::new(short_hash(block.previous_hash())).fg(TableColor::DarkGrey),
            Cell::new(block.content()).fg(TableColor::White),
        ]);
    }

    println!("{table}");
}

fn short_hash(hash: &str) -> String {
    if hash.len() > 16 {
        format!("{}…", &hash[..16])
    } else {
        hash.to_string()
    }
}
