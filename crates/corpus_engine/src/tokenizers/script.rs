use corpus_core::TokenRecord;

use super::{is_noise, token_auxiliary, WordForm};
use crate::strategy::{meaningful_text, StrategyError, Tokenizer};

/// Script class of a character; doubles as the coarse POS label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Kanji,
    Hiragana,
    Katakana,
    Alphabet,
    Numeral,
    Symbol,
}

impl CharClass {
    /// `None` for separators and noise.
    pub fn of(c: char) -> Option<Self> {
        if c.is_whitespace() || is_noise(c) {
            return None;
        }
        let class = match c {
            '\u{3041}'..='\u{309F}' => CharClass::Hiragana,
            '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
                CharClass::Katakana
            }
            '\u{3005}' | '\u{3006}' | '\u{3007}' => CharClass::Kanji,
            '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}' => {
                CharClass::Kanji
            }
            _ if c.is_numeric() => CharClass::Numeral,
            _ if c.is_alphabetic() => CharClass::Alphabet,
            _ => CharClass::Symbol,
        };
        Some(class)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CharClass::Kanji => "kanji",
            CharClass::Hiragana => "hiragana",
            CharClass::Katakana => "katakana",
            CharClass::Alphabet => "alphabet",
            CharClass::Numeral => "numeral",
            CharClass::Symbol => "symbol",
        }
    }
}

/// Segments unspaced text (e.g. Japanese) into runs of one script class.
/// Every symbol character is a token of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptTokenizer {
    word_form: WordForm,
    include_auxiliary: bool,
}

impl ScriptTokenizer {
    pub fn new(word_form: WordForm) -> Self {
        Self {
            word_form,
            include_auxiliary: false,
        }
    }

    pub fn with_auxiliary(mut self, include: bool) -> Self {
        self.include_auxiliary = include;
        self
    }

    fn push(&self, tokens: &mut Vec<TokenRecord>, surface: &str, class: CharClass) {
        let pos = class.as_str();
        let record = TokenRecord::new(self.word_form.apply(surface), pos);
        tokens.push(if self.include_auxiliary {
            record.with_auxiliary(token_auxiliary(surface, pos))
        } else {
            record
        });
    }
}

impl Tokenizer for ScriptTokenizer {
    fn tokenize(&self, text: Option<&str>) -> Result<Vec<TokenRecord>, StrategyError> {
        let Some(text) = meaningful_text(text) else {
            return Ok(Vec::new());
        };

        let mut tokens = Vec::new();
        let mut run = String::new();
        let mut run_class: Option<CharClass> = None;
        for c in text.chars() {
            let class = CharClass::of(c);
            let extends_run =
                class.is_some() && class == run_class && class != Some(CharClass::Symbol);
            if !extends_run {
                if let Some(prev) = run_class.take() {
                    self.push(&mut tokens, &run, prev);
                    run.clear();
                }
            }
            if let Some(class) = class {
                run.push(c);
                run_class = Some(class);
            }
        }
        if let Some(prev) = run_class {
            self.push(&mut tokens, &run, prev);
        }
        Ok(tokens)
    }
}
