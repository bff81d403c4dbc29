//! Free-text product search.
//!
//! A query is normalized and split into tokens. A product matches when every
//! token either occurs inside its searchable text (title, brand, condition,
//! size) or is a near miss of one of its words. Matching products are ranked
//! with an additive relevance score.

use crate::product::Product;
use itertools::Itertools;

const TITLE_MATCH: u32 = 10;
const BRAND_MATCH: u32 = 6;
const PREFIX_BONUS: u32 = 3;
const CONDITION_MATCH: u32 = 2;
const SIZE_MATCH: u32 = 2;
const FUZZY_MATCH: u32 = 1;

/// Lowercases, strips punctuation and collapses whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Edit distance between two strings, counted in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Tokens of two characters or less never match fuzzily.
fn max_distance(token: &str) -> Option<usize> {
    match token.chars().count() {
        0..=2 => None,
        3..=4 => Some(1),
        _ => Some(2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenMatch {
    Exact,
    Fuzzy,
}

struct SearchableText {
    title: String,
    brand: String,
    condition: String,
    size: String,
    all: String,
    words: Vec<String>,
}

impl SearchableText {
    fn of(product: &Product) -> Self {
        let title = normalize(&product.title);
        let brand = normalize(product.brand());
        let condition = normalize(product.condition());
        let size = normalize(product.size());
        let all = [&title, &brand, &condition, &size]
            .into_iter()
            .filter(|s| !s.is_empty())
            .join(" ");
        let words = all.split(' ').map(ToString::to_string).collect();
        Self {
            title,
            brand,
            condition,
            size,
            all,
            words,
        }
    }

    fn match_token(&self, token: &str) -> Option<TokenMatch> {
        if self.all.contains(token) {
            return Some(TokenMatch::Exact);
        }
        let max = max_distance(token)?;
        self.words
            .iter()
            .any(|w| levenshtein(token, w) <= max)
            .then_some(TokenMatch::Fuzzy)
    }

    fn has_prefix(&self, token: &str) -> bool {
        self.title
            .split(' ')
            .chain(self.brand.split(' '))
            .any(|w| w.starts_with(token))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    tokens: Vec<String>,
}

impl SearchQuery {
    /// `None` when nothing searchable is left after normalization.
    pub fn parse<S: AsRef<str>>(raw: S) -> Option<Self> {
        let tokens = tokenize(raw.as_ref());
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.as_ref().trim().to_string(),
            tokens,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.evaluate(product).is_some()
    }

    /// Relevance of a product; zero when it does not match.
    pub fn score(&self, product: &Product) -> u32 {
        self.evaluate(product).unwrap_or_default()
    }

    /// Matches and scores in one pass. `None` if any token fails to match.
    pub fn evaluate(&self, product: &Product) -> Option<u32> {
        let text = SearchableText::of(product);
        self.tokens.iter().try_fold(0, |score, token| {
            let kind = text.match_token(token)?;
            Some(score + token_score(&text, token, kind))
        })
    }
}

fn token_score(text: &SearchableText, token: &str, kind: TokenMatch) -> u32 {
    if kind == TokenMatch::Fuzzy {
        return FUZZY_MATCH;
    }
    let mut score = 0;
    if text.title.contains(token) {
        score += TITLE_MATCH;
    }
    if text.brand.contains(token) {
        score += BRAND_MATCH;
    }
    if text.has_prefix(token) {
        score += PREFIX_BONUS;
    }
    if text.condition.contains(token) {
        score += CONDITION_MATCH;
    }
    if text.size.contains(token) {
        score += SIZE_MATCH;
    }
    score
}
