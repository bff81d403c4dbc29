use crate::control::{render_template, ControllerError, Response, Site};
use crate::image::{ImageCdn, CARD};
use actix::Addr;
use actix_web::web::{Data, Path};
use actix_web::{get, HttpRequest, HttpResponse};
use askama::Template;
use catalog_service::{CatalogService, GetCatalog};
use serde::Serialize;
use std::collections::BTreeSet;
use storefront_types::filter::{
    default_statuses, facets, filter_and_sort, Facets, FilterCriteria, PriceRange, SortKey,
};
use storefront_types::search::SearchQuery;
use storefront_types::{Availability, Category, Product};
use url::form_urlencoded;

/// Listing state carried in the URL.
///
/// `brand`, `condition`, `size` and `status` may repeat. Unknown keys and
/// blank values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub brands: Vec<String>,
    pub conditions: Vec<String>,
    pub sizes: Vec<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub statuses: Vec<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

impl ListingQuery {
    pub fn parse(query_string: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(query_string.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let value = value.to_string();
            match key.as_ref() {
                "brand" => push_unique(&mut query.brands, value),
                "condition" => push_unique(&mut query.conditions, value),
                "size" => push_unique(&mut query.sizes, value),
                "status" => push_unique(&mut query.statuses, value.to_lowercase()),
                "min" => query.min = Some(value),
                "max" => query.max = Some(value),
                "sort" => query.sort = Some(value),
                "q" => query.q = Some(value),
                _ => (),
            }
        }
        query
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
            .as_deref()
            .and_then(SortKey::try_from)
            .unwrap_or_default()
    }

    pub fn price(&self) -> PriceRange {
        PriceRange::parse(self.min.as_deref(), self.max.as_deref())
    }

    /// `status=all` lifts the constraint; no recognised status means available only.
    pub fn statuses(&self) -> BTreeSet<Availability> {
        if self.statuses.iter().any(|s| s == "all") {
            return BTreeSet::new();
        }
        let statuses: BTreeSet<Availability> = self
            .statuses
            .iter()
            .filter_map(Availability::try_from)
            .collect();
        if statuses.is_empty() {
            default_statuses()
        } else {
            statuses
        }
    }

    pub fn search(&self) -> Option<SearchQuery> {
        self.q.as_deref().and_then(SearchQuery::parse)
    }

    pub fn criteria(&self, category: Category) -> FilterCriteria {
        FilterCriteria {
            brands: self.brands.iter().cloned().collect(),
            conditions: self.conditions.iter().cloned().collect(),
            sizes: self.sizes.iter().cloned().collect(),
            price: self.price(),
            statuses: self.statuses(),
            query: self.search(),
            category: Some(category),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![];
        pairs.extend(self.brands.iter().map(|v| ("brand", v.as_str())));
        pairs.extend(self.conditions.iter().map(|v| ("condition", v.as_str())));
        pairs.extend(self.sizes.iter().map(|v| ("size", v.as_str())));
        pairs.extend(self.min.iter().map(|v| ("min", v.as_str())));
        pairs.extend(self.max.iter().map(|v| ("max", v.as_str())));
        pairs.extend(self.statuses.iter().map(|v| ("status", v.as_str())));
        pairs.extend(self.sort.iter().map(|v| ("sort", v.as_str())));
        pairs.extend(self.q.iter().map(|v| ("q", v.as_str())));
        pairs
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }

    pub fn href(&self, path: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }

    fn without(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut query = self.clone();
        f(&mut query);
        query
    }

    /// One chip per applied filter value, linking to the listing without it.
    pub fn chips(&self, path: &str) -> Vec<Chip> {
        let mut chips = vec![];
        for (i, brand) in self.brands.iter().enumerate() {
            chips.push(Chip::new(
                brand,
                self.without(|q| {
                    q.brands.remove(i);
                }),
                path,
            ));
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            chips.push(Chip::new(
                condition,
                self.without(|q| {
                    q.conditions.remove(i);
                }),
                path,
            ));
        }
        for (i, size) in self.sizes.iter().enumerate() {
            chips.push(Chip::new(
                format!("Size {size}"),
                self.without(|q| {
                    q.sizes.remove(i);
                }),
                path,
            ));
        }
        let price = self.price();
        if price.is_bounded() {
            chips.push(Chip::new(
                price.label(),
                self.without(|q| {
                    q.min = None;
                    q.max = None;
                }),
                path,
            ));
        }
        if self.statuses() != default_statuses() {
            for (i, status) in self.statuses.iter().enumerate() {
                let label = match Availability::try_from(status) {
                    Some(a) => a.to_string(),
                    None if status == "all" => "All statuses".to_string(),
                    None => continue,
                };
                chips.push(Chip::new(
                    label,
                    self.without(|q| {
                        q.statuses.remove(i);
                    }),
                    path,
                ));
            }
        }
        chips
    }

    /// Drops every filter but keeps the sort order and the search term.
    pub fn clear_href(&self, path: &str) -> String {
        ListingQuery {
            sort: self.sort.clone(),
            q: self.q.clone(),
            ..Default::default()
        }
        .href(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub label: String,
    pub href: String,
}

impl Chip {
    fn new<L: ToString>(label: L, rest: ListingQuery, path: &str) -> Self {
        Self {
            label: label.to_string(),
            href: rest.href(path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProductCard {
    pub title: String,
    pub href: String,
    pub price: Option<String>,
    pub brand: String,
    pub size: String,
    pub image: Option<String>,
    pub sold: bool,
}

impl ProductCard {
    pub fn new(product: &Product, images: &ImageCdn) -> Self {
        Self {
            title: product.title.clone(),
            href: product.detail_path(),
            price: product.price_label(),
            brand: product.brand().to_string(),
            size: product.size().to_string(),
            image: product.first_image().and_then(|i| images.url(i, &CARD)),
            sold: !product.is_available(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

fn options(values: &[String], selected: &[String]) -> Vec<FilterOption> {
    values
        .iter()
        .map(|v| FilterOption {
            value: v.clone(),
            label: v.clone(),
            checked: selected.contains(v),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogPage {
    category: Category,
    path: &'static str,
    products: Vec<ProductCard>,
    brands: Vec<FilterOption>,
    conditions: Vec<FilterOption>,
    sizes: Vec<FilterOption>,
    statuses: Vec<FilterOption>,
    sorts: Vec<FilterOption>,
    min: String,
    max: String,
    q: String,
    chips: Vec<Chip>,
    clear_href: String,
    searching: bool,
}

impl CatalogPage {
    fn new(category: Category, query: &ListingQuery, catalog: &[Product], site: &Site) -> Self {
        let criteria = query.criteria(category);
        let sort = query.sort_key();
        let products = filter_and_sort(catalog, &criteria, sort)
            .into_iter()
            .map(|p| ProductCard::new(p, &site.images))
            .collect();
        let Facets {
            brands,
            conditions,
            sizes,
        } = facets(catalog);
        let statuses = query.statuses();
        let path = category.listing_path();
        Self {
            category,
            path,
            products,
            brands: options(&brands, &query.brands),
            conditions: options(&conditions, &query.conditions),
            sizes: options(&sizes, &query.sizes),
            statuses: Availability::ALL
                .iter()
                .map(|a| FilterOption {
                    value: a.as_str().to_string(),
                    label: a.to_string(),
                    checked: statuses.is_empty() || statuses.contains(a),
                })
                .collect(),
            sorts: SortKey::ALL
                .iter()
                .map(|s| FilterOption {
                    value: s.as_str().to_string(),
                    label: s.to_string(),
                    checked: *s == sort,
                })
                .collect(),
            min: query.min.clone().unwrap_or_default(),
            max: query.max.clone().unwrap_or_default(),
            q: query.q.clone().unwrap_or_default(),
            chips: query.chips(path),
            clear_href: query.clear_href(path),
            searching: criteria.is_searching(),
        }
    }
}

async fn listing(
    category: Category,
    req: HttpRequest,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    let query = ListingQuery::parse(req.query_string());
    let products = catalog.send(GetCatalog(category)).await??;
    render_template(CatalogPage::new(category, &query, &products, &site))
}

#[get("/")]
pub async fn sneakers(
    req: HttpRequest,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    listing(Category::Sneakers, req, catalog, site).await
}

#[get("/clothing")]
pub async fn clothing(
    req: HttpRequest,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    listing(Category::Clothing, req, catalog, site).await
}

#[get("/accessories")]
pub async fn accessories(
    req: HttpRequest,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    listing(Category::Accessories, req, catalog, site).await
}

#[derive(Serialize)]
pub struct ApiProduct<'a> {
    #[serde(flatten)]
    product: &'a Product,
    path: String,
    available: bool,
    image: Option<String>,
}

#[derive(Serialize)]
pub struct ApiListing<'a> {
    category: &'static str,
    sort: SortKey,
    total: usize,
    products: Vec<ApiProduct<'a>>,
    facets: Facets,
}

#[get("/api/{category}/products")]
pub async fn api_products(
    category: Path<String>,
    req: HttpRequest,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    let category =
        Category::try_from(category.as_str()).ok_or_else(|| ControllerError::InvalidInput {
            field: "category".to_string(),
            msg: format!("Unknown category {:?}", category.as_str()),
        })?;
    let query = ListingQuery::parse(req.query_string());
    let sort = query.sort_key();
    let products = catalog.send(GetCatalog(category)).await??;
    let selected = filter_and_sort(&products, &query.criteria(category), sort);
    Ok(HttpResponse::Ok().json(ApiListing {
        category: category.api_name(),
        sort,
        total: selected.len(),
        products: selected
            .into_iter()
            .map(|product| ApiProduct {
                product,
                path: product.detail_path(),
                available: product.is_available(),
                image: product
                    .first_image()
                    .and_then(|i| site.images.url(i, &CARD)),
            })
            .collect(),
        facets: facets(&products),
    }))
}
