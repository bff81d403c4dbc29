use crate::control::{render_template, Response, Site};
use actix_web::get;
use actix_web::web::Data;
use askama::Template;

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    contact_url: String,
}

#[derive(Template)]
#[template(path = "policies.html")]
pub struct PoliciesPage {
    contact_url: String,
}

#[get("/about")]
pub async fn about(site: Data<Site>) -> Response {
    render_template(AboutPage {
        contact_url: site.contact_url.clone(),
    })
}

#[get("/policies")]
pub async fn policies(site: Data<Site>) -> Response {
    render_template(PoliciesPage {
        contact_url: site.contact_url.clone(),
    })
}
