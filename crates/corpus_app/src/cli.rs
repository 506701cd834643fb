use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "corpus",
    version,
    about = "Resumable batch tokenization of a directory of text files"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write the log to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every pending or failed file and append its tokens to the output.
    Run(RunArgs),
    /// Summarize a manifest and, optionally, its output file.
    Status(StatusArgs),
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// RON settings file; command-line values take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory scanned for source files.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Manifest CSV tracking per-file state.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// JSON Lines file receiving one token record per document.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// File extension to include; repeatable. Defaults to txt.
    #[arg(long = "ext")]
    pub extensions: Vec<String>,

    /// Save the manifest after this many processed files.
    #[arg(long)]
    pub save_every: Option<usize>,

    /// Characters of each file kept as the manifest preview.
    #[arg(long)]
    pub preview_chars: Option<usize>,

    /// Tokenizer adapter: script or whitespace.
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Tokenizer option as key=value; repeatable.
    #[arg(long = "opt", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Source encoding label (e.g. utf-8, shift_jis) or "auto".
    #[arg(long)]
    pub encoding: Option<String>,

    /// Fail a file on malformed bytes instead of replacing them.
    #[arg(long)]
    pub strict_decode: bool,

    /// Leave previously failed files alone.
    #[arg(long)]
    pub no_retry_failed: bool,

    /// Look for files added since the manifest was created.
    #[arg(long)]
    pub rediscover: bool,

    /// fsync the output after every record.
    #[arg(long)]
    pub durable: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub manifest: PathBuf,

    /// Output file to count records in.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// List at most this many failed files.
    #[arg(long, default_value_t = 20)]
    pub show_failed: usize,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_key_value, Cli, Command};
    use clap::Parser;

    #[test]
    fn key_value_options_parse() {
        assert_eq!(
            parse_key_value("word_form = surface"),
            Ok(("word_form".to_string(), "surface".to_string()))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn run_subcommand_collects_repeatable_flags() {
        let cli = Cli::try_parse_from([
            "corpus", "run", "--root", "r", "--ext", "txt", "--ext", "md", "--opt",
            "auxiliary=true", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.extensions, vec!["txt", "md"]);
        assert_eq!(args.options, vec![("auxiliary".to_string(), "true".to_string())]);
    }
}
