use clap::{Parser, Subcommand};
use crate::cli::abbrev;
use crate::cli::error::{user_error, UserError};
use crate::cli::output::{format_editor_state, format_rule_tree, format_suggestions, format_terms_table, get_terminal_width};
use crate::config::{split_list, Config};
use crate::editor::{Editor, LocalSuggestions, SuggestionSource};
use crate::filter::{apply_edits, parse_directives, parse_filter, render, Rule};
use crate::terms::{TermIndex, TokenKind};
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "filterq")]
#[command(about = "Filter query toolkit - parse, render, edit and evaluate boolean filter expressions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical form of a filter
    Render {
        /// Filter query (e.g. "host=web*&state=2")
        #[arg(allow_hyphen_values = true)]
        query: String,
    },
    /// Print the rule tree of a filter
    Parse {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Check a filter for syntax errors
    Check {
        #[arg(allow_hyphen_values = true)]
        query: String,
    },
    /// List the terms of a filter's canonical form
    Terms {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Apply structural edit directives and print the result
    Edit {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Directives, applied in order (e.g. "drop-rule:1-0", "move-rule:0" "after:2")
        #[arg(required = true)]
        directives: Vec<String>,
        /// Filter fragment inserted by condition-/chain- directives
        #[arg(long, allow_hyphen_values = true)]
        rule: Option<String>,
    },
    /// Print the JSON-lines records that match a filter
    Match {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// JSON-lines input file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Feed keystrokes into a term editor and print its state
    Replay {
        /// Typed characters; ',' and newlines act as the separator key
        #[arg(allow_hyphen_values = true)]
        keystrokes: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Suggest completions for the pending fragment of a partial query
    Suggest {
        #[arg(allow_hyphen_values = true)]
        partial: String,
        /// Column names to suggest (default: suggest.columns from the rc file)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if matches!(args.first().map(String::as_str), Some("--version" | "-V")) {
        println!("filterq {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    args = match abbrev::expand_command_abbreviations(args) {
        Ok(expanded) => expanded,
        Err(e) => {
            user_error(&e);
        }
    };

    let clap_args = std::iter::once("filterq".to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>();

    // Help and usage both come back as errors from clap
    let is_help_request = args.is_empty()
        || args.iter().any(|a| a == "--help" || a == "-h")
        || args.first().map(String::as_str) == Some("help");

    let cli = match Cli::try_parse_from(clap_args) {
        Ok(cli) => cli,
        Err(e) if is_help_request => {
            e.print()?;
            return Ok(());
        }
        Err(e) => {
            e.print()?;
            std::process::exit(1);
        }
    };

    let config = Config::load()?;
    debug!("loaded config: {:?}", config);
    handle_command(cli, &config)
}

fn handle_command(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Render { query } => handle_render(&query),
        Commands::Parse { query, json } => handle_parse(&query, json || config.json),
        Commands::Check { query } => handle_check(&query),
        Commands::Terms { query, json } => handle_terms(&query, json || config.json),
        Commands::Edit { query, directives, rule } => handle_edit(&query, &directives, rule.as_deref()),
        Commands::Match { query, file } => handle_match(&query, file),
        Commands::Replay { keystrokes, json } => handle_replay(&keystrokes, json || config.json, config),
        Commands::Suggest { partial, columns, json } => handle_suggest(&partial, columns, json || config.json, config),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn handle_render(query: &str) -> Result<()> {
    let rule = parse_filter(query)?;
    println!("{}", render(&rule));
    Ok(())
}

fn handle_parse(query: &str, json: bool) -> Result<()> {
    let rule = parse_filter(query)?;
    if json {
        print_json(&rule)
    } else {
        println!("{}", format_rule_tree(&rule));
        Ok(())
    }
}

fn handle_check(query: &str) -> Result<()> {
    parse_filter(query)?;
    println!("OK");
    Ok(())
}

fn handle_terms(query: &str, json: bool) -> Result<()> {
    let index = TermIndex::parse(query)?;
    if json {
        print_json(&index)
    } else {
        println!("{}", format_terms_table(&index, get_terminal_width()));
        Ok(())
    }
}

fn handle_edit(query: &str, args: &[String], payload: Option<&str>) -> Result<()> {
    let root = parse_filter(query)?;
    let payload: Option<Rule> = payload.map(parse_filter).transpose()?;
    let directives = parse_directives(args, payload.as_ref())?;
    for directive in &directives {
        debug!("applying {}", directive);
    }
    println!("{}", render(&apply_edits(&root, &directives)));
    Ok(())
}

fn handle_match(query: &str, file: Option<PathBuf>) -> Result<()> {
    let rule = parse_filter(query)?;
    let reader: Box<dyn BufRead> = match &file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut matched = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON record on line {}", number + 1))?;
        if rule.matches(&record) {
            writeln!(out, "{}", line)?;
            matched += 1;
        }
    }
    debug!("{} record(s) matched", matched);
    Ok(())
}

/// Type keystrokes into a fresh editor; ',' and '\n' press the separator key
fn replay(keystrokes: &str, config: &Config) -> Editor {
    let mut editor = Editor::new().with_debounce(config.debounce);
    let now = Instant::now();
    for c in keystrokes.chars() {
        match c {
            ',' | '\n' => {
                editor.commit();
            }
            c => editor.type_char(c, now),
        }
    }
    editor
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    terms: &'a TermIndex,
    fragment: &'a str,
    expect: TokenKind,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    query: String,
}

fn handle_replay(keystrokes: &str, json: bool, config: &Config) -> Result<()> {
    let editor = replay(keystrokes, config);
    if json {
        print_json(&ReplayReport {
            terms: editor.terms(),
            fragment: editor.fragment(),
            expect: editor.expect().term_kind(),
            valid: editor.is_valid(),
            error: editor.syntax_error(),
            query: editor.query(),
        })
    } else {
        println!("{}", format_editor_state(&editor));
        Ok(())
    }
}

fn handle_suggest(partial: &str, columns: Vec<String>, json: bool, config: &Config) -> Result<()> {
    let columns = if columns.is_empty() {
        config.columns.clone()
    } else {
        columns.iter().flat_map(|c| split_list(c)).collect()
    };

    let editor = replay(partial, config);
    if let Some(error) = editor.syntax_error() {
        return Err(UserError(error.to_string()).into());
    }

    let mut request = editor.suggestion_request();
    // Columns already tested are not offered again
    request.exclude = editor
        .terms()
        .tokens()
        .iter()
        .filter(|token| token.kind == TokenKind::Column)
        .map(|token| token.label.clone())
        .collect();

    let source = LocalSuggestions::new(columns, config.suggest_limit);
    let response = source.suggest(&request).context("Failed to fetch suggestions")?;
    if json {
        print_json(&response)
    } else {
        println!("{}", format_suggestions(&response));
        Ok(())
    }
}
