use serde::Serialize;

/// One color of the t-shirt, with the reference image sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarmentOption {
    pub label: String,
    pub reference_image_url: String,
    /// CSS background for the color swatch on the product page.
    pub swatch: String,
}

/// Storefront colors: (label, swatch).
const STOREFRONT_COLORS: &[(&str, &str)] = &[
    ("Black", "#000000"),
    ("Cream", "#f5f5dc"),
    ("Maroon", "#800000"),
    ("Navy Blue", "#1e3a8a"),
    (
        "Rainbow",
        "linear-gradient(45deg, #ff0000, #ff7f00, #ffff00, #00ff00, #0000ff, #4b0082, #9400d3)",
    ),
];

/// Fixed, read-only list of garment options. Only built from the
/// storefront colors, so never empty.
#[derive(Debug, Clone)]
pub struct Catalog {
    options: Vec<GarmentOption>,
}

impl Catalog {
    /// The five storefront colors, with reference images under `asset_base_url`.
    pub fn storefront(asset_base_url: &str) -> Self {
        let base = asset_base_url.trim_end_matches('/');
        let options = STOREFRONT_COLORS
            .iter()
            .map(|(label, swatch)| GarmentOption {
                label: label.to_string(),
                reference_image_url: format!("{}/{}-shirt.png", base, slug(label)),
                swatch: swatch.to_string(),
            })
            .collect();
        Self { options }
    }

    pub fn options(&self) -> &[GarmentOption] {
        &self.options
    }

    /// Selection used right after an upload.
    pub fn default_option(&self) -> &GarmentOption {
        &self.options[0]
    }

    pub fn find(&self, label: &str) -> Option<&GarmentOption> {
        let label = label.trim();
        self.options
            .iter()
            .find(|option| option.label.eq_ignore_ascii_case(label))
    }
}

fn slug(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
