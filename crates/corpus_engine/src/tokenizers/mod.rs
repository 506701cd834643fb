//! Tokenizer adapters and the name-based factory used by the binary.
//!
//! The adapters here are dictionary-free stand-ins for morphological
//! engines; anything implementing [`Tokenizer`] can replace them.
mod filter;
mod script;
mod whitespace;

use std::fmt;
use std::str::FromStr;

use corpus_core::Auxiliary;
use unicode_normalization::UnicodeNormalization;

use crate::strategy::{StrategyConfigError, StrategyOptions, Tokenizer};

pub use filter::FilteredTokenizer;
pub use script::{CharClass, ScriptTokenizer};
pub use whitespace::WhitespaceTokenizer;

pub const TOKENIZER_NAMES: [&str; 2] = ["script", "whitespace"];

/// Which form of a token becomes its `word`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordForm {
    Surface,
    /// Dictionary form. Adapters without a dictionary use the normalized form.
    #[default]
    Lemma,
    /// NFKC, lowercased.
    Normalized,
}

impl WordForm {
    pub fn apply(self, surface: &str) -> String {
        match self {
            WordForm::Surface => surface.to_string(),
            WordForm::Lemma | WordForm::Normalized => normalize(surface),
        }
    }
}

impl FromStr for WordForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "surface" => Ok(WordForm::Surface),
            "lemma" | "base" | "dictionary" => Ok(WordForm::Lemma),
            "normalized" => Ok(WordForm::Normalized),
            other => Err(format!("unknown word form {other:?}")),
        }
    }
}

impl fmt::Display for WordForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WordForm::Surface => "surface",
            WordForm::Lemma => "lemma",
            WordForm::Normalized => "normalized",
        };
        f.write_str(name)
    }
}

pub(crate) fn normalize(surface: &str) -> String {
    surface.nfkc().collect::<String>().to_lowercase()
}

/// Characters an adapter drops instead of failing on: controls and U+FFFD
/// left behind by lossy decoding.
pub(crate) fn is_noise(c: char) -> bool {
    c.is_control() || c == char::REPLACEMENT_CHARACTER
}

pub(crate) fn token_auxiliary(surface: &str, pos: &str) -> Auxiliary {
    let mut aux = Auxiliary::new();
    aux.insert("surface".into(), surface.into());
    aux.insert("normalized".into(), normalize(surface).into());
    aux.insert("class".into(), pos.into());
    aux
}

#[derive(Debug, Clone, Default)]
struct AdapterOptions {
    word_form: WordForm,
    include_auxiliary: bool,
    pos_keep: Vec<String>,
    pos_exclude: Vec<String>,
    stopwords: Vec<String>,
}

impl AdapterOptions {
    fn parse(tokenizer: &str, options: &StrategyOptions) -> Result<Self, StrategyConfigError> {
        let mut parsed = Self::default();
        for (key, value) in options {
            let invalid = || StrategyConfigError::InvalidValue {
                key: key.clone(),
                value: value.clone(),
            };
            match key.as_str() {
                "word_form" => parsed.word_form = value.parse().map_err(|_| invalid())?,
                "auxiliary" => parsed.include_auxiliary = parse_flag(value).ok_or_else(invalid)?,
                "pos_keep" => parsed.pos_keep = split_list(value),
                "pos_exclude" => parsed.pos_exclude = split_list(value),
                "stopwords" => parsed.stopwords = split_list(value),
                _ => {
                    return Err(StrategyConfigError::UnknownOption {
                        tokenizer: tokenizer.to_string(),
                        key: key.clone(),
                    })
                }
            }
        }
        Ok(parsed)
    }

    fn has_filter(&self) -> bool {
        !(self.pos_keep.is_empty() && self.pos_exclude.is_empty() && self.stopwords.is_empty())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Builds the adapter registered under `name`, configured from `options`.
///
/// Recognized options: `word_form` (`surface`, `lemma`, `normalized`),
/// `auxiliary` (bool), and comma-separated `pos_keep`, `pos_exclude`,
/// `stopwords`, which wrap the adapter in a [`FilteredTokenizer`].
pub fn build_tokenizer(
    name: &str,
    options: &StrategyOptions,
) -> Result<Box<dyn Tokenizer>, StrategyConfigError> {
    let opts = AdapterOptions::parse(name, options)?;
    let base: Box<dyn Tokenizer> = match name {
        "whitespace" => Box::new(
            WhitespaceTokenizer::new(opts.word_form).with_auxiliary(opts.include_auxiliary),
        ),
        "script" => Box::new(
            ScriptTokenizer::new(opts.word_form).with_auxiliary(opts.include_auxiliary),
        ),
        other => return Err(StrategyConfigError::UnknownTokenizer(other.to_string())),
    };
    if !opts.has_filter() {
        return Ok(base);
    }
    let filtered = FilteredTokenizer::new(base, opts.pos_keep, opts.pos_exclude, opts.stopwords)?;
    Ok(Box::new(filtered))
}
