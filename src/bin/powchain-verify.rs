#![forbid(unsafe_code)]
//! Validates a chain exported by `powchain-mine --export`.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

use powchain::blockchain::{Chain, ValidationReport};

#[derive(Parser)]
#[command(author, version, about = "Validate an exported chain file", long_about = None)]
struct Cli {
    /// JSON file holding the chain
    path: PathBuf,
    /// Also require every digest to start with this many zeros
    #[arg(short, long)]
    difficulty: Option<usize>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let data = std::fs::read_to_string(&cli.path)?;
    let chain: Chain = serde_json::from_str(&data)?;

    println!(
        "{} {} ({} blocks)\n",
        "🔍 Verifying".bright_cyan().bold(),
        cli.path.display(),
        chain.len()
    );

    let report = ValidationReport::for_chain(&chain);
    let mut ok = report.is_valid;

    println!("  Valid blocks:     {}", report.valid_blocks);
    println!("  Invalid blocks:   {}", report.invalid_blocks);
    println!("  Integrity score:  {}", report.integrity_score);
    for error in &report.errors {
        println!("  {}", error.red());
    }

    if let Some(difficulty) = cli.difficulty {
        let weak: Vec<u64> = chain
            .iter()
            .filter(|b| !b.meets_difficulty(difficulty))
            .map(|b| b.id())
            .collect();
        if !weak.is_empty() {
            ok = false;
            println!(
                "  {}",
                format!("Blocks below difficulty {}: {:?}", difficulty, weak).red()
            );
        }
    }

    println!();
    if ok {
        println!("{}", "✅ Chain is valid".bright_green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", "❌ Chain is invalid".bright_red().bold());
        Ok(ExitCode::FAILURE)
    }
}
