use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};

pub mod filter;
pub mod product;
pub mod search;

pub use product::Product;

/// Catalog scope. Each variant is backed by its own CMS document type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Category {
    #[serde(rename = "product")]
    #[display("Sneakers")]
    Sneakers,
    #[serde(rename = "clothing")]
    #[display("Clothing")]
    Clothing,
    #[serde(rename = "accessories")]
    #[display("Accessories")]
    Accessories,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Sneakers, Self::Clothing, Self::Accessories];

    pub fn document_type(&self) -> &'static str {
        match self {
            Self::Sneakers => "product",
            Self::Clothing => "clothing",
            Self::Accessories => "accessories",
        }
    }

    pub fn listing_path(&self) -> &'static str {
        match self {
            Self::Sneakers => "/",
            Self::Clothing => "/clothing",
            Self::Accessories => "/accessories",
        }
    }

    pub fn detail_prefix(&self) -> &'static str {
        match self {
            Self::Sneakers => "/product/",
            Self::Clothing => "/clothing/",
            Self::Accessories => "/accessories/",
        }
    }

    pub fn detail_path(&self, slug: &str) -> String {
        format!("{}{slug}", self.detail_prefix())
    }

    /// Path segment used by the JSON API, e.g. `/api/sneakers/products`.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Sneakers => "sneakers",
            Self::Clothing => "clothing",
            Self::Accessories => "accessories",
        }
    }

    pub fn try_from<S: AsRef<str>>(s: S) -> Option<Self> {
        match s.as_ref().trim().to_lowercase().as_str() {
            "product" | "products" | "sneakers" => Some(Self::Sneakers),
            "clothing" => Some(Self::Clothing),
            "accessories" | "accessory" => Some(Self::Accessories),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[display("Available")]
    Available,
    #[display("Sold")]
    Sold,
}

impl Availability {
    pub const ALL: [Availability; 2] = [Self::Available, Self::Sold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
        }
    }

    pub fn try_from<S: AsRef<str>>(s: S) -> Option<Self> {
        match s.as_ref().trim().to_lowercase().as_str() {
            "available" => Some(Self::Available),
            "sold" => Some(Self::Sold),
            _ => None,
        }
    }
}

impl From<bool> for Availability {
    fn from(sold: bool) -> Self {
        if sold {
            Self::Sold
        } else {
            Self::Available
        }
    }
}

/// CMS fields that are absent from a projection come back as `null`.
pub fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

pub fn parse_bool<S: AsRef<str>>(raw: S) -> Option<bool> {
    match raw.as_ref().trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
