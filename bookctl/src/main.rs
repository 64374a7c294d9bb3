//! `bookctl` entry point.
//!
//! Drives a `BookRegistry` from a file of `|`-delimited records (or stdin),
//! logging accepted/rejected records through `common::logging::Logger`, and
//! prints the final depth-view snapshot to stdout. This binary performs no
//! parsing/framing beyond splitting lines — the wire format is entirely
//! `BookRegistry::process`'s concern.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use common::logging::{LogLevel, Logger};
use orderbook::BookRegistry;

/// Drives a limit order book engine from an input file or stdin and prints
/// the final depth-view snapshot.
#[derive(Parser, Debug)]
#[command(name = "bookctl")]
#[command(about = "Replays add/update/cancel records against an order book engine")]
struct Args {
    /// Path to a file of `|`-delimited records. Defaults to stdin.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Truncate each side of every book's depth view to this many levels.
    #[arg(short, long)]
    depth: Option<usize>,

    /// Minimum level the logger writes to stderr.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_log_level(s: &str) -> LogLevel {
    match s.to_ascii_lowercase().as_str() {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

fn print_depth_view(registry: &BookRegistry, depth: Option<usize>) {
    println!("Ticker|AskPrice|AskQty|BidPrice|BidQty");
    let rows = if let Some(depth) = depth {
        // snapshot() ignores depth; re-derive per-book so truncation applies.
        let mut out = Vec::new();
        let mut tickers: Vec<&str> = Vec::new();
        for row in registry.snapshot() {
            if let Some(ticker) = &row.ticker {
                tickers.push(ticker.as_str());
            }
        }
        for ticker in tickers {
            if let Some(book) = registry.book(ticker) {
                out.extend(book.depth_view(Some(depth)));
            }
        }
        out
    } else {
        registry.snapshot()
    };

    for row in rows {
        println!(
            "{}|{}|{}|{}|{}",
            row.ticker.unwrap_or_default(),
            row.ask_price.map(|p| p.to_string()).unwrap_or_default(),
            row.ask_qty.map(|q| q.to_string()).unwrap_or_default(),
            row.bid_price.map(|p| p.to_string()).unwrap_or_default(),
            row.bid_qty.map(|q| q.to_string()).unwrap_or_default(),
        );
    }
}

fn main() {
    let args = Args::parse();

    let logger = Arc::new(Logger::with_level(parse_log_level(&args.log_level)));
    let mut registry = BookRegistry::with_logger(Arc::clone(&logger));

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    // Best-effort; a test harness piping stdin may not have a controlling
    // terminal to install a handler for.
    let _ = ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    });

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("bookctl: failed to open {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut accepted = 0u64;
    let mut rejected = 0u64;

    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("bookctl: read error: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match registry.process(&line) {
            Ok(()) => accepted += 1,
            Err(e) => {
                rejected += 1;
                eprintln!("bookctl: rejected record {:?}: {}", line, e);
            }
        }
    }

    logger.flush();
    eprintln!("bookctl: {} accepted, {} rejected", accepted, rejected);

    print_depth_view(&registry, args.depth);
}
