use derive_more::Display;
use lazy_regex::regex_captures;
use storefront_types::product::ImageRef;
use url::Url;

static CDN_HOST: &str = "https://cdn.sanity.io/images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Fit {
    #[display("crop")]
    Crop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreset {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Fit,
    pub quality: u8,
}

/// Product card thumbnail.
pub const CARD: ImagePreset = ImagePreset {
    width: Some(800),
    height: Some(900),
    fit: Fit::Crop,
    quality: 70,
};

/// Square slide on the product page, requested at 2x for dense screens.
pub const CAROUSEL: ImagePreset = ImagePreset {
    width: Some(1200),
    height: Some(1200),
    fit: Fit::Crop,
    quality: 90,
};

/// Parsed `image-<id>-<w>x<h>-<format>` asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetId {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl AssetId {
    pub fn parse(reference: &str) -> Option<Self> {
        let (_, id, width, height, format) =
            regex_captures!(r#"^image-([A-Za-z0-9]+)-(\d+)x(\d+)-([a-z0-9]+)$"#, reference)?;
        Some(Self {
            id: id.to_string(),
            width: width.parse().ok()?,
            height: height.parse().ok()?,
            format: format.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}x{}.{}", self.id, self.width, self.height, self.format)
    }
}

/// Builds CDN URLs for CMS images of one project and dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCdn {
    project_id: String,
    dataset: String,
}

impl ImageCdn {
    pub fn new<P: ToString, D: ToString>(project_id: P, dataset: D) -> Self {
        Self {
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// `None` when the image has no asset or the reference is malformed.
    pub fn url(&self, image: &ImageRef, preset: &ImagePreset) -> Option<String> {
        let asset = AssetId::parse(image.asset_ref()?)?;
        let mut url = Url::parse(&format!(
            "{CDN_HOST}/{}/{}/{}",
            self.project_id,
            self.dataset,
            asset.file_name()
        ))
        .ok()?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(w) = preset.width {
                pairs.append_pair("w", &w.to_string());
            }
            if let Some(h) = preset.height {
                pairs.append_pair("h", &h.to_string());
            }
            pairs
                .append_pair("fit", &preset.fit.to_string())
                .append_pair("q", &preset.quality.to_string())
                .append_pair("auto", "format");
        }
        Some(url.into())
    }

    pub fn urls<'a>(
        &'a self,
        images: &'a [ImageRef],
        preset: &'a ImagePreset,
    ) -> impl Iterator<Item = String> + 'a {
        images.iter().filter_map(move |i| self.url(i, preset))
    }
}
