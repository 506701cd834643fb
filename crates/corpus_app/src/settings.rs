//! Optional RON settings file, merged underneath the command line.
//!
//! ```ron
//! #![enable(implicit_some)]
//! (
//!     root: "corpus",
//!     manifest: "state/manifest.csv",
//!     output: "state/tokens.jsonl",
//!     extensions: ["txt", "md"],
//!     save_every: 50,
//!     tokenizer: "script",
//!     options: { "word_form": "surface" },
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use corpus_engine::{DecodePolicy, ExtensionFilter, RunConfig, StrategyOptions};
use serde::Deserialize;

use crate::cli::RunArgs;

pub const DEFAULT_TOKENIZER: &str = "script";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub save_every: Option<usize>,
    pub preview_chars: Option<usize>,
    pub tokenizer: Option<String>,
    pub options: StrategyOptions,
    pub encoding: Option<String>,
    pub strict_decode: Option<bool>,
    pub retry_failed: Option<bool>,
    pub rediscover: Option<bool>,
    pub durable: Option<bool>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("parsing settings file {}", path.display()))
    }
}

/// A fully merged `run` invocation.
#[derive(Debug)]
pub struct ResolvedRun {
    pub config: RunConfig,
    pub tokenizer: String,
    pub options: StrategyOptions,
}

/// Command-line values win; the file fills gaps; built-in defaults fill the rest.
pub fn resolve(args: &RunArgs, file: SettingsFile) -> Result<ResolvedRun> {
    let Some(root) = args.root.clone().or(file.root) else {
        bail!("no source root given (use --root or `root` in the settings file)");
    };
    let Some(manifest) = args.manifest.clone().or(file.manifest) else {
        bail!("no manifest path given (use --manifest or `manifest` in the settings file)");
    };
    let Some(output) = args.output.clone().or(file.output) else {
        bail!("no output path given (use --output or `output` in the settings file)");
    };

    let mut config = RunConfig::new(root, manifest, output);

    if !args.extensions.is_empty() {
        config.extensions = ExtensionFilter::new(&args.extensions);
    } else if let Some(extensions) = file.extensions {
        config.extensions = ExtensionFilter::new(extensions);
    }
    if let Some(save_every) = args.save_every.or(file.save_every) {
        if save_every == 0 {
            bail!("save_every must be at least 1");
        }
        config.save_every = save_every;
    }
    if let Some(preview_chars) = args.preview_chars.or(file.preview_chars) {
        config.preview_chars = preview_chars;
    }

    let strict = args.strict_decode || file.strict_decode.unwrap_or(false);
    let encoding = args.encoding.clone().or(file.encoding);
    config.decode = match encoding {
        Some(label) => DecodePolicy::from_label(&label, strict)?,
        None => DecodePolicy {
            strict,
            ..DecodePolicy::default()
        },
    };

    config.retry_failed = !args.no_retry_failed && file.retry_failed.unwrap_or(true);
    config.rediscover = args.rediscover || file.rediscover.unwrap_or(false);
    config.durable_appends = args.durable || file.durable.unwrap_or(false);

    let tokenizer = args
        .tokenizer
        .clone()
        .or(file.tokenizer)
        .unwrap_or_else(|| DEFAULT_TOKENIZER.to_string());
    let mut options = file.options;
    options.extend(args.options.iter().cloned());

    Ok(ResolvedRun {
        config,
        tokenizer,
        options,
    })
}
