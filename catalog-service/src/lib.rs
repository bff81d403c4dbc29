use actix::prelude::*;
use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storefront_types::{Category, Product};
use tokio::sync::RwLock;

pub mod sanity;

pub use sanity::{SanityClient, SanityConfig};

pub const DEFAULT_REVALIDATE: Duration = Duration::from_secs(30);

/// Read-only origin of catalog data.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self, category: Category) -> Result<Vec<Product>, anyhow::Error>;
    async fn fetch_product(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Product>, anyhow::Error>;
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn fresh(&self, revalidate: Duration) -> Option<T> {
        (self.fetched_at.elapsed() < revalidate).then(|| self.value.clone())
    }
}

type CatalogCache = Arc<RwLock<HashMap<Category, CacheEntry<Arc<Vec<Product>>>>>>;
type ProductCache = Arc<RwLock<HashMap<(Category, String), CacheEntry<Product>>>>;

/// Keeps the most recently fetched catalog of every category.
///
/// Entries older than the revalidation interval are refetched on access. When
/// a refetch fails the previous entry keeps being served; an error only
/// reaches the caller when nothing was ever fetched.
pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
    revalidate: Duration,
    background_refresh: bool,
    catalogs: CatalogCache,
    products: ProductCache,
}

impl CatalogService {
    pub fn new(source: Arc<dyn CatalogSource>, revalidate: Duration) -> Self {
        Self {
            source,
            revalidate,
            background_refresh: true,
            catalogs: Default::default(),
            products: Default::default(),
        }
    }

    pub fn background_refresh(mut self, enabled: bool) -> Self {
        self.background_refresh = enabled;
        self
    }
}

async fn refresh_catalog(
    source: &dyn CatalogSource,
    cache: &CatalogCache,
    category: Category,
) -> Result<Arc<Vec<Product>>, anyhow::Error> {
    let started = Instant::now();
    let products = Arc::new(source.fetch_catalog(category).await?);
    log::info!(
        "{category} catalog refreshed: {} products in {}ms",
        products.len(),
        started.elapsed().as_millis()
    );
    cache
        .write()
        .await
        .insert(category, CacheEntry::new(products.clone()));
    Ok(products)
}

async fn load_catalog(
    source: &dyn CatalogSource,
    cache: &CatalogCache,
    category: Category,
    revalidate: Duration,
) -> Result<Arc<Vec<Product>>, anyhow::Error> {
    if let Some(products) = cache
        .read()
        .await
        .get(&category)
        .and_then(|e| e.fresh(revalidate))
    {
        return Ok(products);
    }
    match refresh_catalog(source, cache, category).await {
        Ok(products) => Ok(products),
        Err(err) => {
            let stale = cache.read().await.get(&category).map(|e| e.value.clone());
            match stale {
                Some(products) => {
                    log::warn!("Serving stale {category} catalog: {err:#}");
                    Ok(products)
                }
                None => Err(err).context(format!("Unable to load {category} catalog")),
            }
        }
    }
}

/// Only products that exist are cached, so lookups of unknown slugs leave no
/// trace. A product the source no longer returns is dropped.
async fn load_product(
    source: &dyn CatalogSource,
    cache: &ProductCache,
    category: Category,
    slug: String,
    revalidate: Duration,
) -> Result<Option<Product>, anyhow::Error> {
    let key = (category, slug);
    if let Some(product) = cache
        .read()
        .await
        .get(&key)
        .and_then(|e| e.fresh(revalidate))
    {
        return Ok(Some(product));
    }
    match source.fetch_product(category, &key.1).await {
        Ok(Some(product)) => {
            cache
                .write()
                .await
                .insert(key, CacheEntry::new(product.clone()));
            Ok(Some(product))
        }
        Ok(None) => {
            cache.write().await.remove(&key);
            Ok(None)
        }
        Err(err) => {
            let stale = cache.read().await.get(&key).map(|e| e.value.clone());
            match stale {
                Some(product) => {
                    log::warn!("Serving stale {category} product {}: {err:#}", key.1);
                    Ok(Some(product))
                }
                None => Err(err),
            }
        }
    }
}

impl Actor for CatalogService {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        if !self.background_refresh {
            return;
        }
        if self.revalidate.is_zero() {
            log::warn!("Revalidation interval is zero, background refresh disabled");
            return;
        }
        let source = self.source.clone();
        let catalogs = self.catalogs.clone();
        let revalidate = self.revalidate;
        tokio::spawn(async move {
            loop {
                for category in Category::ALL {
                    if let Err(err) = refresh_catalog(source.as_ref(), &catalogs, category).await {
                        log::error!("Unable to refresh {category} catalog: {err:#}");
                    }
                }
                tokio::time::sleep(revalidate).await;
            }
        });
    }
}

#[derive(Message)]
#[rtype(result = "Result<Arc<Vec<Product>>, anyhow::Error>")]
pub struct GetCatalog(pub Category);

#[derive(Message)]
#[rtype(result = "Result<Option<Product>, anyhow::Error>")]
pub struct GetProduct(pub Category, pub String);

/// Drops every cached entry; the next request refetches.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Invalidate;

impl Handler<GetCatalog> for CatalogService {
    type Result = ResponseActFuture<Self, Result<Arc<Vec<Product>>, anyhow::Error>>;

    fn handle(&mut self, GetCatalog(category): GetCatalog, _: &mut Self::Context) -> Self::Result {
        let source = self.source.clone();
        let catalogs = self.catalogs.clone();
        let revalidate = self.revalidate;
        Box::pin(
            async move { load_catalog(source.as_ref(), &catalogs, category, revalidate).await }
                .into_actor(self),
        )
    }
}

impl Handler<GetProduct> for CatalogService {
    type Result = ResponseActFuture<Self, Result<Option<Product>, anyhow::Error>>;

    fn handle(
        &mut self,
        GetProduct(category, slug): GetProduct,
        _: &mut Self::Context,
    ) -> Self::Result {
        let source = self.source.clone();
        let products = self.products.clone();
        let revalidate = self.revalidate;
        Box::pin(
            async move {
                let slug = slug.trim().to_string();
                if slug.is_empty() {
                    return Ok(None);
                }
                load_product(source.as_ref(), &products, category, slug, revalidate).await
            }
            .into_actor(self),
        )
    }
}

impl Handler<Invalidate> for CatalogService {
    type Result = ResponseActFuture<Self, ()>;

    fn handle(&mut self, _: Invalidate, _: &mut Self::Context) -> Self::Result {
        let catalogs = self.catalogs.clone();
        let products = self.products.clone();
        Box::pin(
            async move {
                catalogs.write().await.clear();
                products.write().await.clear();
                log::info!("Catalog cache invalidated");
            }
            .into_actor(self),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSource {
        catalog_calls: AtomicUsize,
        product_calls: AtomicUsize,
        fail: AtomicBool,
    }

    fn product(id: &str, category: Category) -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "_type": category.document_type(),
            "title": id,
            "slug": {"current": id},
        }))
        .expect("valid product")
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch_catalog(&self, category: Category) -> Result<Vec<Product>, anyhow::Error> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("CMS unavailable");
            }
            Ok(vec![product("a", category), product("b", category)])
        }

        async fn fetch_product(
            &self,
            category: Category,
            slug: &str,
        ) -> Result<Option<Product>, anyhow::Error> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("CMS unavailable");
            }
            Ok((slug == "a").then(|| product("a", category)))
        }
    }

    fn start(source: Arc<FakeSource>, revalidate: Duration) -> Addr<CatalogService> {
        CatalogService::new(source, revalidate)
            .background_refresh(false)
            .start()
    }

    #[actix_rt::test]
    async fn caches_within_revalidation_interval() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::from_secs(60));
        let first = service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox")
            .expect("catalog");
        let second = service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox")
            .expect("catalog");
        assert_eq!(2, first.len());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, source.catalog_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn categories_are_cached_separately() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::from_secs(60));
        let sneakers = service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox")
            .expect("catalog");
        let clothing = service
            .send(GetCatalog(Category::Clothing))
            .await
            .expect("mailbox")
            .expect("catalog");
        assert_eq!(Category::Sneakers, sneakers[0].category);
        assert_eq!(Category::Clothing, clothing[0].category);
        assert_eq!(2, source.catalog_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn refetches_expired_catalog() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::ZERO);
        for _ in 0..3 {
            service
                .send(GetCatalog(Category::Clothing))
                .await
                .expect("mailbox")
                .expect("catalog");
        }
        assert_eq!(3, source.catalog_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn serves_stale_catalog_when_refresh_fails() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::ZERO);
        let fresh = service
            .send(GetCatalog(Category::Accessories))
            .await
            .expect("mailbox")
            .expect("catalog");
        source.fail.store(true, Ordering::SeqCst);
        let stale = service
            .send(GetCatalog(Category::Accessories))
            .await
            .expect("mailbox")
            .expect("stale catalog");
        assert!(Arc::ptr_eq(&fresh, &stale));
        assert_eq!(2, source.catalog_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn fails_when_nothing_was_fetched() {
        let source = Arc::new(FakeSource::default());
        source.fail.store(true, Ordering::SeqCst);
        let service = start(source, Duration::from_secs(60));
        let res = service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox");
        assert!(res.is_err());
    }

    #[actix_rt::test]
    async fn looks_up_products_by_slug() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::from_secs(60));
        let found = service
            .send(GetProduct(Category::Sneakers, "a".to_string()))
            .await
            .expect("mailbox")
            .expect("lookup");
        assert_eq!(Some("a"), found.as_ref().map(|p| p.id.as_str()));
        let missing = service
            .send(GetProduct(Category::Sneakers, "zzz".to_string()))
            .await
            .expect("mailbox")
            .expect("lookup");
        assert!(missing.is_none());
        service
            .send(GetProduct(Category::Sneakers, "a".to_string()))
            .await
            .expect("mailbox")
            .expect("lookup");
        assert_eq!(2, source.product_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn unknown_slugs_are_not_cached() {
        let source = FakeSource::default();
        let cache = ProductCache::default();
        for i in 0..1000 {
            let found = load_product(
                &source,
                &cache,
                Category::Sneakers,
                format!("missing-{i}"),
                Duration::ZERO,
            )
            .await
            .expect("lookup");
            assert!(found.is_none());
        }
        assert!(cache.read().await.is_empty());
        load_product(
            &source,
            &cache,
            Category::Sneakers,
            "a".to_string(),
            Duration::from_secs(60),
        )
        .await
        .expect("lookup");
        assert_eq!(1, cache.read().await.len());
    }

    #[actix_rt::test]
    async fn serves_stale_product_when_lookup_fails() {
        let source = FakeSource::default();
        let cache = ProductCache::default();
        let slug = "a".to_string();
        load_product(&source, &cache, Category::Sneakers, slug.clone(), Duration::ZERO)
            .await
            .expect("lookup");
        source.fail.store(true, Ordering::SeqCst);
        let stale = load_product(&source, &cache, Category::Sneakers, slug, Duration::ZERO)
            .await
            .expect("stale product");
        assert_eq!(Some("a"), stale.as_ref().map(|p| p.id.as_str()));
    }

    #[actix_rt::test]
    async fn zero_interval_disables_background_refresh() {
        let source = Arc::new(FakeSource::default());
        let _service = CatalogService::new(source.clone(), Duration::ZERO).start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(0, source.catalog_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn empty_slug_skips_the_source() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::from_secs(60));
        let res = service
            .send(GetProduct(Category::Accessories, "  ".to_string()))
            .await
            .expect("mailbox")
            .expect("lookup");
        assert!(res.is_none());
        assert_eq!(0, source.product_calls.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn invalidate_forces_refetch() {
        let source = Arc::new(FakeSource::default());
        let service = start(source.clone(), Duration::from_secs(60));
        service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox")
            .expect("catalog");
        service.send(Invalidate).await.expect("mailbox");
        service
            .send(GetCatalog(Category::Sneakers))
            .await
            .expect("mailbox")
            .expect("catalog");
        assert_eq!(2, source.catalog_calls.load(Ordering::SeqCst));
    }
}
