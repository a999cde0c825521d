use maplit::hashmap;
use strfmt::strfmt;

use crate::config::Config;
use crate::error::FetchError;

/// Builds the image request URL for the given coordinate.
///
/// Coordinates are passed through verbatim, out-of-range values included.
/// With the default Mapbox template the path contains `{lon},{lat},{zoom}`,
/// longitude first.
pub fn build_url(lat: f64, lon: f64, cfg: &Config) -> Result<String, FetchError> {
    let size = cfg.image_size.to_string();
    let vars = hashmap! {
        "style".to_owned() => cfg.style.clone(),
        "lon".to_owned() => lon.to_string(),
        "lat".to_owned() => lat.to_string(),
        "zoom".to_owned() => cfg.zoom.to_string(),
        "width".to_owned() => size.clone(),
        "height".to_owned() => size,
        "token".to_owned() => cfg.access_token().to_owned(),
    };

    strfmt(&cfg.url_template, &vars).map_err(|e| FetchError::Url(e.to_string()))
}
