use crate::config::KNOWN_LOCATIONS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Property type filter applied to the search URL
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    All,
    Apartment,
    House,
}

impl PropertyType {
    /// Path segment Huispedia uses for this filter, if any
    pub fn slug(self) -> Option<&'static str> {
        match self {
            PropertyType::All => None,
            PropertyType::Apartment => Some("appartement"),
            PropertyType::House => Some("woonhuis"),
        }
    }
}

impl FromStr for PropertyType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(PropertyType::All),
            "apartment" => Ok(PropertyType::Apartment),
            "house" => Ok(PropertyType::House),
            _ => Err(ConfigError::InvalidPropertyType(s.to_string())),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::All => "all",
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
        };
        f.write_str(name)
    }
}

/// Search parameters for one scrape run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// City or region to search in
    pub location: String,
    pub property_type: PropertyType,
    /// Maximum number of search result pages to walk
    pub max_pages: Option<u32>,
    /// Maximum number of listings to collect
    pub limit: Option<usize>,
    /// Whether to fetch and parse each listing's detail page
    pub fetch_details: bool,
}

impl SearchParams {
    /// Location as it appears in search URLs
    pub fn location_slug(&self) -> String {
        let slug = self.location.trim().to_lowercase().replace(' ', "-");
        if !KNOWN_LOCATIONS.contains(&slug.as_str()) {
            warn!(location = %self.location, "Location not in predefined list, using as-is");
        }
        slug
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            location: "amsterdam".to_string(),
            property_type: PropertyType::All,
            max_pages: None,
            limit: None,
            fetch_details: true,
        }
    }
}

/// Options forwarded to the rendering API with every request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render the page in a headless browser before returning it
    pub browser: bool,
    /// CSS selector the renderer waits for before capturing the page
    pub wait_for_selector: Option<String>,
}

impl RenderOptions {
    pub fn browser_waiting_for(selector: &str) -> Self {
        Self {
            browser: true,
            wait_for_selector: Some(selector.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_type_parses_known_values() {
        assert_eq!("house".parse::<PropertyType>(), Ok(PropertyType::House));
        assert_eq!("Apartment".parse::<PropertyType>(), Ok(PropertyType::Apartment));
        assert_eq!(
            "villa".parse::<PropertyType>(),
            Err(ConfigError::InvalidPropertyType("villa".into()))
        );
    }

    #[test]
    fn location_slug_is_normalized() {
        let params = SearchParams {
            location: "Den Haag".into(),
            ..Default::default()
        };
        assert_eq!(params.location_slug(), "den-haag");
    }
}
