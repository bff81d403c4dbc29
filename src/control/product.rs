use crate::control::{render_template, ControllerError, Response, Site};
use crate::image::CAROUSEL;
use crate::SITE_NAME;
use actix::Addr;
use actix_web::get;
use actix_web::web::{Data, Path};
use askama::Template;
use catalog_service::{CatalogService, GetProduct};
use storefront_types::{Category, Product};

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductPage {
    page_title: String,
    category: Category,
    back_href: &'static str,
    title: String,
    price: Option<String>,
    brand: String,
    size: String,
    condition: String,
    description: Option<String>,
    images: Vec<String>,
    sold: bool,
    contact_url: String,
}

impl ProductPage {
    fn new(product: Product, site: &Site) -> Self {
        Self {
            page_title: format!("{} | {SITE_NAME}", product.title),
            category: product.category,
            back_href: product.category.listing_path(),
            images: site.images.urls(&product.images, &CAROUSEL).collect(),
            price: product.price_label(),
            brand: product.brand().to_string(),
            size: product.size().to_string(),
            condition: product.condition().to_string(),
            sold: !product.is_available(),
            description: product.description.filter(|d| !d.trim().is_empty()),
            title: product.title,
            contact_url: site.contact_url.clone(),
        }
    }
}

async fn detail(
    category: Category,
    slug: String,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    let product = catalog
        .send(GetProduct(category, slug))
        .await??
        .ok_or(ControllerError::NotFound)?;
    render_template(ProductPage::new(product, &site))
}

#[get("/product/{slug}")]
pub async fn sneaker(
    slug: Path<String>,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    detail(Category::Sneakers, slug.into_inner(), catalog, site).await
}

#[get("/clothing/{slug}")]
pub async fn clothing(
    slug: Path<String>,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    detail(Category::Clothing, slug.into_inner(), catalog, site).await
}

#[get("/accessories/{slug}")]
pub async fn accessory(
    slug: Path<String>,
    catalog: Data<Addr<CatalogService>>,
    site: Data<Site>,
) -> Response {
    detail(Category::Accessories, slug.into_inner(), catalog, site).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{not_found, testing};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::{web, App};

    async fn get_with(catalog: Addr<CatalogService>, uri: &str) -> (StatusCode, String) {
        let app = init_service(
            App::new()
                .app_data(Data::new(catalog))
                .app_data(Data::new(testing::site()))
                .service(sneaker)
                .service(clothing)
                .service(accessory)
                .default_service(web::route().to(not_found)),
        )
        .await;
        let res = call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        let status = res.status();
        let body = read_body(res).await;
        (status, String::from_utf8_lossy(&body).to_string())
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        get_with(testing::catalog_service(), uri).await
    }

    #[actix_web::test]
    async fn renders_product_details() {
        let (status, body) = get("/product/jordan-4-retro").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("<title>Jordan 4 Retro | JFLKicks</title>"));
        assert!(body.contains("$250"));
        assert!(body.contains("Deadstock pair with original box."));
        assert!(body.contains("aaa-800x900.jpg"));
        assert!(body.contains("bbb-800x900.png"));
        assert!(body.contains("Contact to buy"));
        assert!(!body.contains("SOLD"));
    }

    #[actix_web::test]
    async fn describes_page_from_description() {
        let (_, body) = get("/product/jordan-4-retro").await;
        assert!(body.contains(
            r#"<meta name="description" content="Deadstock pair with original box.">"#
        ));
        let (_, body) = get("/product/dunk-low-panda").await;
        assert!(!body.contains(r#"<meta name="description""#));
    }

    #[actix_web::test]
    async fn counts_carousel_images() {
        let (_, body) = get("/product/jordan-4-retro").await;
        assert!(body.contains(r#"<span data-carousel-index>1</span> / 2"#));
        let (_, body) = get("/product/dunk-low-panda").await;
        assert!(!body.contains("data-carousel-index"));
    }

    #[actix_web::test]
    async fn marks_sold_products() {
        let (status, body) = get("/product/yeezy-boost-350").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("SOLD"));
        assert!(!body.contains("Contact to buy"));
    }

    #[actix_web::test]
    async fn looks_up_within_category() {
        let (status, body) = get("/clothing/box-logo-hoodie").await;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("Box Logo Hoodie"));
        let (status, _) = get("/clothing/jordan-4-retro").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        let (status, _) = get("/accessories/trucker-cap").await;
        assert_eq!(StatusCode::OK, status);
    }

    #[actix_web::test]
    async fn unknown_slug_is_not_found() {
        let (status, body) = get("/product/air-jordan-1").await;
        assert_eq!(StatusCode::NOT_FOUND, status);
        assert!(body.contains("Page not found"));
    }

    #[actix_web::test]
    async fn cms_failure_renders_error_page() {
        let (status, body) = get_with(
            testing::start(testing::FakeCatalog::failing()),
            "/product/jordan-4-retro",
        )
        .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert!(body.contains("Something went wrong"));
    }
}
