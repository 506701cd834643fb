use std::collections::HashSet;

use corpus_core::TokenRecord;

use crate::strategy::{StrategyConfigError, StrategyError, Tokenizer};

/// Drops tokens by POS label and stopword after the inner tokenizer runs.
pub struct FilteredTokenizer {
    inner: Box<dyn Tokenizer>,
    pos_keep: Option<HashSet<String>>,
    pos_exclude: Option<HashSet<String>>,
    stopwords: HashSet<String>,
}

impl FilteredTokenizer {
    /// Empty lists disable the corresponding filter. Giving both `pos_keep`
    /// and `pos_exclude` with no label in common is rejected.
    pub fn new(
        inner: Box<dyn Tokenizer>,
        pos_keep: Vec<String>,
        pos_exclude: Vec<String>,
        stopwords: Vec<String>,
    ) -> Result<Self, StrategyConfigError> {
        let pos_keep: Option<HashSet<String>> =
            (!pos_keep.is_empty()).then(|| pos_keep.into_iter().collect());
        let pos_exclude: Option<HashSet<String>> =
            (!pos_exclude.is_empty()).then(|| pos_exclude.into_iter().collect());

        if let (Some(keep), Some(exclude)) = (&pos_keep, &pos_exclude) {
            if keep.is_disjoint(exclude) {
                return Err(StrategyConfigError::PosFilterConflict);
            }
        }

        Ok(Self {
            inner,
            pos_keep,
            pos_exclude,
            stopwords: stopwords.into_iter().collect(),
        })
    }

    fn keeps(&self, token: &TokenRecord) -> bool {
        if self.stopwords.contains(&token.word) {
            return false;
        }
        if let Some(keep) = &self.pos_keep {
            if !keep.contains(&token.pos) {
                return false;
            }
        }
        if let Some(exclude) = &self.pos_exclude {
            if exclude.contains(&token.pos) {
                return false;
            }
        }
        true
    }
}

impl Tokenizer for FilteredTokenizer {
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
        let tokens = self.inner.tokenize(text)?;
        Ok(tokens.into_iter().filter(|t| self.keeps(t)).collect())
    }
}
