use maplit::hashmap;
use std::{env, fmt, time::Duration};
use strfmt::strfmt;

use crate::error::ConfigError;

/// Environment variable the access token is read from.
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_API_KEY";

/// Mapbox static images endpoint. Longitude comes before latitude.
pub const MAPBOX_URL_TEMPLATE: &str = "https://api.mapbox.com/styles/v1/mapbox/{style}/static/{lon},{lat},{zoom}/{width}x{height}?access_token={token}";

pub const DEFAULT_STYLE: &str = "satellite-v9";
pub const DEFAULT_ZOOM: u8 = 17;
pub const DEFAULT_IMAGE_SIZE: u16 = 256;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A timeout of this length disables the timeout.
pub(crate) const ZERO_DURATION: Duration = Duration::from_secs(0);

/// Image fetching configuration.
///
/// Fixed for the duration of a run and passed explicitly to everything that
/// needs it.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// The map style identifier, e.g. `satellite-v9`.
    pub style: String,

    /// The zoom level of every image.
    pub zoom: u8,

    /// Edge length of the (square) images in pixels.
    pub image_size: u16,

    /// The URL to request images from including the replacement specifiers
    /// `{style}`, `{lon}`, `{lat}`, `{zoom}`, `{width}`, `{height}` and `{token}`.
    pub url_template: String,

    /// Timeout for fetching a single image.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    access_token: String,
}

impl Config {
    /// Creates a configuration with the default style, zoom and image size.
    ///
    /// Fails if the access token is empty.
    pub fn new(access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(ConfigError::EmptyAccessToken);
        }

        Ok(Self {
            style: DEFAULT_STYLE.to_owned(),
            zoom: DEFAULT_ZOOM,
            image_size: DEFAULT_IMAGE_SIZE,
            url_template: MAPBOX_URL_TEMPLATE.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            access_token,
        })
    }

    /// Creates a configuration taking the access token from `MAPBOX_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(ACCESS_TOKEN_ENV) {
            Ok(token) => Self::new(token),
            Err(_) => Err(ConfigError::MissingAccessToken),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_image_size(mut self, image_size: u16) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Swaps the image provider.
    ///
    /// The template must mention both `{lat}` and `{lon}` and must not use
    /// any specifier besides the documented ones.
    pub fn with_url_template(
        mut self,
        template: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let template = template.into();
        let invalid = |reason: &str| ConfigError::InvalidUrlTemplate {
            template: template.clone(),
            reason: reason.to_owned(),
        };

        if !template.contains("{lat}") || !template.contains("{lon}") {
            return Err(invalid("must contain `{lat}` and `{lon}`"));
        }

        let probe = hashmap! {
            "style".to_owned() => String::new(),
            "lon".to_owned() => String::new(),
            "lat".to_owned() => String::new(),
            "zoom".to_owned() => String::new(),
            "width".to_owned() => String::new(),
            "height".to_owned() => String::new(),
            "token".to_owned() => String::new(),
        };
        if let Err(e) = strfmt(&template, &probe) {
            return Err(invalid(&e.to_string()));
        }

        self.url_template = template;
        Ok(self)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("style", &self.style)
            .field("zoom", &self.zoom)
            .field("image_size", &self.image_size)
            .field("url_template", &self.url_template)
            .field("timeout", &self.timeout)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::new("pk.test").unwrap();
        assert_eq!(cfg.style, "satellite-v9");
        assert_eq!(cfg.zoom, 17);
        assert_eq!(cfg.image_size, 256);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.access_token(), "pk.test");
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(
            Config::new("  "),
            Err(ConfigError::EmptyAccessToken)
        ));
    }

    #[test]
    fn debug_hides_token() {
        let cfg = Config::new("pk.secret").unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("pk.secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn url_template_validation() {
        let cfg = Config::new("pk.test").unwrap();

        assert!(cfg
            .clone()
            .with_url_template("https://example.com/{lat}/{lon}.png")
            .is_ok());
        assert!(matches!(
            cfg.clone().with_url_template("https://example.com/{x}/{y}.png"),
            Err(ConfigError::InvalidUrlTemplate { .. })
        ));
        assert!(matches!(
            cfg.with_url_template("https://example.com/{lat}/{lon}/{bogus}"),
            Err(ConfigError::InvalidUrlTemplate { .. })
        ));
    }

    #[test]
    fn missing_env_token() {
        env::remove_var(ACCESS_TOKEN_ENV);
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingAccessToken)
        ));
    }
}
