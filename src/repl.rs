// src/repl.rs
//! Interactive editing. Every line is one command; autosave keeps running
//! in the background and reports its indicator on stderr.

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::{describe_status, execute, finish, Command};
use crate::core::{AppConfig, CvSession, SaveStatus};

#[derive(Parser)]
#[command(name = "cv", no_binary_name = true, disable_version_flag = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

pub async fn run(mut session: CvSession, config: &AppConfig) -> Result<()> {
    println!(
        "Editing CV ({}). Type `help` for commands, `quit` to leave.",
        if session.is_remote() { "remote" } else { "local" }
    );

    let mut status = session.status();
    let indicator = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if matches!(current, SaveStatus::Saved { .. } | SaveStatus::Failed { .. }) {
                eprintln!("[{}]", describe_status(&current));
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit" | "q") {
            break;
        }

        let args = match split_args(line) {
            Ok(args) => args,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let command = match ReplLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };
        debug!("repl command: {:?}", command);

        if let Err(e) = execute(&mut session, command, config).await {
            eprintln!("error: {}", e);
        }
    }

    info!("Leaving editor, saving pending changes");
    let saved = finish(session, true).await;
    indicator.abort();

    match saved {
        Ok(()) => println!("Saved"),
        Err(e) => eprintln!("{}", e),
    }
    Ok(())
}

/// Split a line on whitespace, keeping quoted runs together
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    in_token = true;
                }
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (_, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}
