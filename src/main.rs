use actix::prelude::*;
use actix_web::middleware::TrailingSlash;
use actix_web::{web, web::Data, App, HttpServer};
use anyhow::Context as AnyhowContext;
use catalog_service::{CatalogService, SanityClient};
use std::env;
use std::sync::Arc;
use storefront::control::{self, Site};
use storefront::image::ImageCdn;
use storefront::StorefrontConfig;

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }

    let config = StorefrontConfig::from_env()?;
    log::info!(
        "Serving Sanity project {} dataset {} (cdn: {}), revalidating every {}s",
        config.sanity.project_id,
        config.sanity.dataset,
        config.sanity.use_cdn,
        config.revalidate.as_secs()
    );

    let site = Site {
        images: ImageCdn::new(&config.sanity.project_id, &config.sanity.dataset),
        contact_url: config.contact_url.clone(),
    };
    let client = SanityClient::new(config.sanity.clone())?;
    let catalog_service = CatalogService::new(Arc::new(client), config.revalidate).start();

    let addr = (config.self_addr.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Compress::default())
            .wrap(actix_web::middleware::NormalizePath::new(
                TrailingSlash::Trim,
            ))
            .app_data(Data::new(catalog_service.clone()))
            .app_data(Data::new(site.clone()))
            .service(actix_files::Files::new("/static", "static"))
            .service(control::catalog::sneakers)
            .service(control::catalog::clothing)
            .service(control::catalog::accessories)
            .service(control::catalog::api_products)
            .service(control::product::sneaker)
            .service(control::product::clothing)
            .service(control::product::accessory)
            .service(control::pages::about)
            .service(control::pages::policies)
            .default_service(web::route().to(control::not_found))
    })
    .bind(&addr)
    .with_context(|| {
        format!(
            "Failed to bind server to {}:{}. Is the port already in use?",
            addr.0, addr.1
        )
    })?
    .run()
    .await?;
    Ok(())
}
