//! Runs statements against a fresh embedded database.
//!
//! Statements come from `-e` arguments and script files, run on one
//! connection, and query results are printed as text or JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rowset_core::{Connection, Database, DbConfig, Execution, ResultWindow};
use tracing::Level;

/// Command-line arguments for the rowset tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Statement to execute (repeatable, runs in order)
    #[arg(short, long = "execute")]
    execute: Vec<String>,

    /// Script file with `;`-separated statements, run before `-e` statements
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run all statements in one manual transaction
    #[arg(long)]
    manual: bool,

    /// Roll back instead of committing at the end (implies --manual)
    #[arg(long)]
    rollback: bool,

    /// Print query results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => DbConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DbConfig::default(),
    };

    let mut statements = Vec::new();
    if let Some(path) = &args.file {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        statements.extend(split_statements(&script));
    }
    statements.extend(args.execute.iter().cloned());
    if statements.is_empty() {
        bail!("No statements given; use -e or --file");
    }

    let db = Database::new().with_config(config);
    let conn = db.connect();
    let manual = args.manual || args.rollback;
    if manual {
        conn.set_auto_commit(false)?;
    }

    for (index, sql) in statements.iter().enumerate() {
        tracing::debug!("Executing statement {}: {}", index, sql);
        run_statement(&conn, sql, args.json)
            .with_context(|| format!("Statement {} failed: {}", index + 1, sql))?;
    }

    if manual {
        if args.rollback {
            conn.rollback()?;
            tracing::info!("Rolled back");
        } else {
            conn.commit()?;
            tracing::info!("Committed");
        }
    }
    conn.close();
    Ok(())
}

fn run_statement(conn: &Connection, sql: &str, json: bool) -> Result<()> {
    let stmt = conn.create_statement()?;
    match stmt.execute(sql)? {
        Execution::Rows(mut window) => {
            if json {
                print_json(&mut window)?;
            } else {
                print_table(&mut window)?;
            }
        }
        Execution::Count(count) => println!("{} row(s) affected", count),
    }
    Ok(())
}

fn print_table(window: &mut ResultWindow) -> Result<()> {
    let header: Vec<&str> = window.columns().iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    let count = window.column_count();
    while window.next()? {
        let mut cells = Vec::with_capacity(count);
        for column in 1..=count {
            cells.push(window.get(column)?.to_string());
        }
        println!("{}", cells.join("\t"));
    }
    Ok(())
}

fn print_json(window: &mut ResultWindow) -> Result<()> {
    let names: Vec<String> = window.columns().iter().map(|c| c.name.clone()).collect();
    let mut rows = Vec::new();
    while window.next()? {
        let mut object = serde_json::Map::new();
        for (index, name) in names.iter().enumerate() {
            object.insert(name.clone(), serde_json::to_value(window.get(index + 1)?)?);
        }
        rows.push(serde_json::Value::Object(object));
    }
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

/// Splits a script on `;` outside string literals and drops blank pieces.
fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for c in script.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            ';' if !in_string => {
                statements.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    statements.push(current);
    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
