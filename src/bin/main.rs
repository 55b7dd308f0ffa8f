#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "PowChain CLI".bright_cyan().bold());
    println!("{}", "------------".bright_cyan());
    println!();
    println!(
        "{}",
        "This is the main entry point, but most functionality is in separate binaries.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name>' to run a specific command.".yellow()
    );
    println!();
    println!("{}", "Available binaries:".bright_green().underline());
    println!("  - {}  serve the REST API", "powchain-node".bright_white());
    println!("  - {}  mine blocks into a fresh chain", "powchain-mine".bright_white());
    println!("  - {}  validate an exported chain", "powchain-verify".bright_white());
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin powchain-mine -- --difficulty 3 hello world".italic());
}
