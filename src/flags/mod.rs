use serde::Serialize;

const FLAG_CDN_BASE: &str = "https://flagcdn.com";

/// CDN artwork for one country flag: 20px and 40px variants, PNG and WebP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagUrls {
    pub png_1x: String,
    pub png_2x: String,
    pub webp_1x: String,
    pub webp_2x: String,
}

/// Build CDN URLs for a lowercase two-letter country code. Callers without a
/// resolved code render no flag at all.
pub fn flag_urls(country_code: &str) -> FlagUrls {
    FlagUrls {
        png_1x: format!("{}/w20/{}.png", FLAG_CDN_BASE, country_code),
        png_2x: format!("{}/w40/{}.png", FLAG_CDN_BASE, country_code),
        webp_1x: format!("{}/w20/{}.webp", FLAG_CDN_BASE, country_code),
        webp_2x: format!("{}/w40/{}.webp", FLAG_CDN_BASE, country_code),
    }
}
