use crate::product::Product;
use crate::search::SearchQuery;
use crate::{Availability, Category};
use derive_more::Display;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    #[display("Newest to Oldest")]
    Newest,
    #[display("Oldest to Newest")]
    Oldest,
    #[display("Price Low to High")]
    PriceLow,
    #[display("Price High to Low")]
    PriceHigh,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [Self::Newest, Self::Oldest, Self::PriceLow, Self::PriceHigh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
        }
    }

    pub fn try_from<S: AsRef<str>>(s: S) -> Option<Self> {
        match s.as_ref().trim().to_lowercase().replace('_', "-").as_str() {
            "newest" => Some(Self::Newest),
            "oldest" => Some(Self::Oldest),
            "price-low" | "pricelow" => Some(Self::PriceLow),
            "price-high" | "pricehigh" => Some(Self::PriceHigh),
            _ => None,
        }
    }

    /// Products without a price sort last in both price orders.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Newest => b.created_at_or_epoch().cmp(&a.created_at_or_epoch()),
            Self::Oldest => a.created_at_or_epoch().cmp(&b.created_at_or_epoch()),
            Self::PriceLow => compare_prices(a.price, b.price, |x, y| x.cmp(&y)),
            Self::PriceHigh => compare_prices(a.price, b.price, |x, y| y.cmp(&x)),
        }
    }
}

fn compare_prices(
    a: Option<Decimal>,
    b: Option<Decimal>,
    f: impl FnOnce(Decimal, Decimal) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => f(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Inclusive price bounds. A missing bound imposes no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl PriceRange {
    /// Empty or unparsable input is treated as "no bound".
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Self {
        Self {
            min: min.and_then(parse_bound),
            max: max.and_then(parse_bound),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, price: Option<Decimal>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        let Some(price) = price else {
            return false;
        };
        self.min.map(|min| price >= min).unwrap_or(true)
            && self.max.map(|max| price <= max).unwrap_or(true)
    }

    /// `$50 – $∞`
    pub fn label(&self) -> String {
        let min = self.min.map(|m| m.normalize().to_string());
        let max = self.max.map(|m| m.normalize().to_string());
        format!(
            "${} – ${}",
            min.as_deref().unwrap_or("0"),
            max.as_deref().unwrap_or("∞")
        )
    }
}

fn parse_bound(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub brands: BTreeSet<String>,
    pub conditions: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
    pub price: PriceRange,
    /// Empty set means "any status".
    pub statuses: BTreeSet<Availability>,
    pub query: Option<SearchQuery>,
    pub category: Option<Category>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            brands: BTreeSet::new(),
            conditions: BTreeSet::new(),
            sizes: BTreeSet::new(),
            price: PriceRange::default(),
            statuses: default_statuses(),
            query: None,
            category: None,
        }
    }
}

pub fn default_statuses() -> BTreeSet<Availability> {
    BTreeSet::from([Availability::Available])
}

fn admits_value(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

impl FilterCriteria {
    pub fn for_category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    /// Whether any filter a shopper can see and remove is applied.
    pub fn is_active(&self) -> bool {
        !self.brands.is_empty()
            || !self.conditions.is_empty()
            || !self.sizes.is_empty()
            || self.price.is_bounded()
            || self.statuses != default_statuses()
    }

    pub fn is_searching(&self) -> bool {
        self.query.is_some()
    }

    /// Every predicate except free-text search.
    pub fn admits(&self, product: &Product) -> bool {
        self.category.map(|c| c == product.category).unwrap_or(true)
            && admits_value(&self.brands, product.brand())
            && admits_value(&self.conditions, product.condition())
            && admits_value(&self.sizes, product.size())
            && self.price.contains(product.price)
            && (self.statuses.is_empty() || self.statuses.contains(&product.availability()))
    }
}

/// Selects and orders the products to display.
///
/// While a search is active, products are ranked by relevance and `sort` only
/// breaks ties. The input is left untouched.
pub fn filter_and_sort<'a>(
    products: &'a [Product],
    criteria: &FilterCriteria,
    sort: SortKey,
) -> Vec<&'a Product> {
    let mut ranked: Vec<(u32, &Product)> = products
        .iter()
        .filter(|p| criteria.admits(p))
        .filter_map(|p| match &criteria.query {
            Some(query) => query.evaluate(p).map(|score| (score, p)),
            None => Some((0, p)),
        })
        .collect();
    ranked.sort_by(|(score_a, a), (score_b, b)| {
        score_b.cmp(score_a).then_with(|| sort.compare(a, b))
    });
    ranked.into_iter().map(|(_, p)| p).collect()
}

/// Distinct values offered as filter options.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub brands: Vec<String>,
    pub conditions: Vec<String>,
    pub sizes: Vec<String>,
}

pub fn facets(products: &[Product]) -> Facets {
    Facets {
        brands: uniq_sorted(products.iter().map(Product::brand)),
        conditions: uniq_sorted(products.iter().map(Product::condition)),
        sizes: uniq_sorted(products.iter().map(Product::size)),
    }
}

fn uniq_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .unique()
        .sorted_by(|a, b| natural_cmp(a, b))
        .map(ToString::to_string)
        .collect()
}

fn split_digit_runs(s: &str) -> Vec<&str> {
    let mut runs = vec![];
    let mut start = 0;
    let mut prev = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if prev.is_some_and(|p| p != digit) {
            runs.push(&s[start..i]);
            start = i;
        }
        prev = Some(digit);
    }
    if start < s.len() {
        runs.push(&s[start..]);
    }
    runs
}

fn compare_run(a: &str, b: &str) -> Ordering {
    let a_digits = a.starts_with(|c: char| c.is_ascii_digit());
    let b_digits = b.starts_with(|c: char| c.is_ascii_digit());
    match (a_digits, b_digits) {
        (true, true) => {
            let a_trim = a.trim_start_matches('0');
            let b_trim = b.trim_start_matches('0');
            a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim))
                .then_with(|| a.len().cmp(&b.len()))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Orders strings with embedded numbers by value: `9 < 10 < 10.5 < M`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_runs = split_digit_runs(a);
    let b_runs = split_digit_runs(b);
    a_runs
        .iter()
        .zip(b_runs.iter())
        .map(|(x, y)| compare_run(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a_runs.len().cmp(&b_runs.len()))
        .then_with(|| a.cmp(b))
}
