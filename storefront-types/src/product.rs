use crate::{null_as_default, Availability, Category};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use typesafe_repository::macros::Id;
use typesafe_repository::{GetIdentity, Identity, RefIdentity};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slug {
    #[serde(default)]
    pub current: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
}

/// CMS image object. Hotspot and crop data are not used.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

impl ImageRef {
    pub fn asset_ref(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.reference.as_str())
    }
}

/// Sneaker sizes are stored as numbers, clothing sizes as text.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[serde(transparent)]
pub struct Size(pub String);

impl Size {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<f64> for Size {
    fn from(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            Self((n as i64).to_string())
        } else {
            Self(n.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }
        Ok(match Raw::deserialize(de)? {
            Raw::Int(n) => Size(n.to_string()),
            Raw::Float(n) => Size::from(n),
            Raw::Text(s) => Size(s.trim().to_string()),
        })
    }
}

#[derive(Id, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[Id(ref_id, get_id)]
pub struct Product {
    #[id]
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: Slug,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub sold: Option<bool>,
    #[serde(rename = "_createdAt", default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        !self.sold.unwrap_or(false)
    }

    pub fn availability(&self) -> Availability {
        Availability::from(!self.is_available())
    }

    pub fn slug(&self) -> &str {
        &self.slug.current
    }

    pub fn detail_path(&self) -> String {
        self.category.detail_path(self.slug())
    }

    pub fn brand(&self) -> &str {
        self.brand.as_deref().unwrap_or_default()
    }

    pub fn condition(&self) -> &str {
        self.condition.as_deref().unwrap_or_default()
    }

    pub fn size(&self) -> &str {
        self.size.as_ref().map(Size::as_str).unwrap_or_default()
    }

    /// `$100`, `$99.5`
    pub fn price_label(&self) -> Option<String> {
        self.price.map(|p| format!("${}", p.normalize()))
    }

    /// Missing timestamps order as the Unix epoch.
    pub fn created_at_or_epoch(&self) -> OffsetDateTime {
        self.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn first_image(&self) -> Option<&ImageRef> {
        self.images.first()
    }
}
