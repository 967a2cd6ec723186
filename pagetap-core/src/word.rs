use serde::Serialize;

use crate::error::{Error, Result};
use crate::layout::TextLayout;

/// Inclusive span of character indices on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CharacterRange {
    first: usize,
    last: usize,
}

impl CharacterRange {
    pub fn spanning(a: usize, b: usize) -> Self {
        Self {
            first: a.min(b),
            last: a.max(b),
        }
    }

    pub fn single(index: usize) -> Self {
        Self::spanning(index, index)
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }

    pub fn extended_to(&self, index: usize) -> Self {
        Self {
            first: self.first.min(index),
            last: self.last.max(index),
        }
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

pub fn expand(index: usize, layout: &dyn TextLayout) -> Result<CharacterRange> {
    let total = layout.char_count();
    if index >= total {
        return Err(Error::InvalidIndex { index, total });
    }
    let is_word = |i: usize| layout.char_at(i).map(is_word_char).unwrap_or(false);

    let mut first = index;
    while first > 0 && is_word(first - 1) {
        first -= 1;
    }
    let mut last = index;
    while last + 1 < total && is_word(last + 1) {
        last += 1;
    }
    Ok(CharacterRange { first, last })
}
