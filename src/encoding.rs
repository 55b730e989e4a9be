//! Translation of sequence characters into compact allele codes.

use std::collections::HashMap;

/// Allele code of a single site.
pub type Allele = u8;

/// A genome as a site-by-site list of allele codes.
pub type EncodedSequence = Vec<Allele>;

/// Character to allele code lookup used when reading sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationTable {
    codes: HashMap<char, Allele>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (char, Allele)>) -> Self {
        Self {
            codes: pairs.into_iter().collect(),
        }
    }

    /// Set the code for `symbol`, replacing any previous code.
    pub fn insert(&mut self, symbol: char, code: Allele) {
        self.codes.insert(symbol, code);
    }

    #[inline]
    pub fn translate(&self, symbol: char) -> Option<Allele> {
        self.codes.get(&symbol).copied()
    }

    /// Translate a line of text, dropping characters without a code.
    pub fn encode<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Allele> + 'a {
        text.chars().filter_map(move |symbol| self.translate(symbol))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
