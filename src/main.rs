use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use rummikub_search::report::SolveReport;
use rummikub_search::solver::{solve_hand, solve_hand_parallel, SearchLimits, SolveOutcome};
use rummikub_search::{Color, Hand, Table, Tile};

#[derive(Parser)]
#[command(author, version, about = "Rummikub move finder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one position and exit
    Solve {
        /// Player hand, space separated: "4R 11B 7G"
        #[arg(long)]
        hand: String,

        /// Table groups, comma separated: "1R 2R 3R, 5B 5G 5Y"
        #[arg(long, default_value = "")]
        table: String,

        /// Emit the result as JSON instead of colored text
        #[arg(long)]
        json: bool,

        /// Run the per-tile searches on a thread pool
        #[arg(long)]
        parallel: bool,

        /// Per-branch move budget
        #[arg(long, default_value_t = 10)]
        max_depth: u32,

        /// Global node-expansion budget per seeded search
        #[arg(long, default_value_t = 200_000)]
        max_expansions: usize,
    },
    /// Interactive menu loop
    Play,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve {
            hand,
            table,
            json,
            parallel,
            max_depth,
            max_expansions,
        } => {
            let hand: Hand = match hand.parse() {
                Ok(h) => h,
                Err(e) => {
                    eprintln!("invalid hand: {}", e);
                    std::process::exit(1);
                }
            };
            let table: Table = match table.parse() {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("invalid table: {}", e);
                    std::process::exit(1);
                }
            };
            let limits = SearchLimits {
                max_depth,
                max_expansions,
            };
            let outcome = if parallel {
                solve_hand_parallel(&table, &hand, &limits)
            } else {
                solve_hand(&table, &hand, &limits)
            };
            info!("search finished after {} expansions", outcome.expansions);
            if json {
                println!("{}", SolveReport::from_outcome(&outcome).to_json());
            } else {
                print_outcome(&outcome);
            }
        }
        Command::Play => play_loop(),
    }
}

fn print_outcome(outcome: &SolveOutcome) {
    match &outcome.solution {
        Some(solution) => {
            println!(
                "Place {} ({} move{}):",
                render_tile(solution.tile),
                solution.move_count(),
                if solution.move_count() == 1 { "" } else { "s" }
            );
            for (i, step) in solution.steps.iter().enumerate() {
                println!("  {:>2}. {}", i, render_table(step));
            }
        }
        None => println!("No solution found."),
    }
}

/// Render a tile with the ANSI color of its suit.
fn render_tile(tile: Tile) -> String {
    let code = match tile.color() {
        Color::Red => "\x1b[31m",
        Color::Blue => "\x1b[34m",
        Color::Green => "\x1b[32m",
        Color::Yellow => "\x1b[33m",
    };
    format!("{}{}\x1b[0m", code, tile)
}

fn render_table(table: &Table) -> String {
    table
        .groups()
        .iter()
        .map(|g| {
            g.tiles()
                .map(|t| render_tile(*t))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("  |  ")
}

fn render_hand(hand: &Hand) -> String {
    hand.tiles()
        .iter()
        .map(|t| render_tile(*t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn play_loop() {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut rng = SmallRng::from_entropy();
    let mut hand: Option<Hand> = None;
    let mut table: Table = Table::new();

    loop {
        println!();
        println!("1 - Set the player hand");
        println!("2 - Deal a random hand of 14 tiles");
        println!("3 - Set the table");
        println!("4 - Find a move");
        println!("5 - Exit");
        print!("Enter your selection: ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        match line.trim() {
            "1" => {
                println!("Enter the hand (e.g. \"4R 11B 7G\"):");
                match read_parsed::<Hand>(&mut lines) {
                    Some(h) => hand = Some(h),
                    None => continue,
                }
            }
            "2" => {
                hand = Some(Hand::deal(&mut rng, 14));
            }
            "3" => {
                println!("Enter the table (e.g. \"1R 2R 3R, 5B 5G 5Y\"):");
                match read_parsed::<Table>(&mut lines) {
                    Some(t) => table = t,
                    None => continue,
                }
            }
            "4" => {
                let hand = match &hand {
                    Some(h) => h,
                    None => {
                        println!("You must set a hand first.");
                        continue;
                    }
                };
                let outcome = solve_hand(&table, hand, &SearchLimits::default());
                print_outcome(&outcome);
            }
            "5" => break,
            other => println!("Unknown selection: {}", other),
        }

        if let Some(h) = &hand {
            println!("Hand:  {}", render_hand(h));
        }
        if !table.is_empty() {
            println!("Table: {}", render_table(&table));
        }
    }
    println!("Exiting");
}

fn read_parsed<T>(lines: &mut impl Iterator<Item = io::Result<String>>) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let line = match lines.next() {
        Some(Ok(line)) => line,
        _ => return None,
    };
    match line.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            println!("Invalid input: {}", e);
            None
        }
    }
}
