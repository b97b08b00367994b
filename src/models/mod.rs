use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// Whether the asking price includes buyer costs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceType {
    /// Kosten koper: transfer costs are paid by the buyer
    #[serde(rename = "k.k.")]
    KostenKoper,
    /// Vrij op naam: transfer costs are included
    #[serde(rename = "v.o.n.")]
    VrijOpNaam,
}

/// Portal assessment of the asking price against the estimated market value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ValueComparison {
    #[serde(rename = "Onder de waarde")]
    Below,
    #[serde(rename = "Binnen de waarde")]
    Within,
    #[serde(rename = "Boven de waarde")]
    Above,
}

/// Column names of the output file, in field declaration order
pub const FIELD_NAMES: [&str; 43] = [
    "url",
    "listing_id",
    "title",
    "street_address",
    "postal_code",
    "city",
    "province",
    "price",
    "price_per_sqm",
    "price_type",
    "value_comparison",
    "living_area",
    "plot_size",
    "volume",
    "rooms",
    "bedrooms",
    "bathrooms",
    "floors",
    "property_type",
    "house_type",
    "build_type",
    "year_built",
    "renovation_year",
    "energy_label",
    "insulation",
    "heating",
    "cv_year",
    "roof_type",
    "kitchen_type",
    "kitchen_amenities",
    "bathroom_amenities",
    "location_type",
    "parking_type",
    "maintenance_inside",
    "maintenance_outside",
    "status",
    "listed_since",
    "acceptance",
    "cadastral_info",
    "description",
    "agent_name",
    "agent_url",
    "date_scraped",
];

/// One Huispedia listing.
///
/// Only `url` and `listing_id` are guaranteed; every other field is filled
/// independently from the search card or the detail page.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PropertyListing {
    pub url: String,
    pub listing_id: String,
    pub title: Option<String>,

    // Address
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,

    // Price
    pub price: Option<u64>,
    pub price_per_sqm: Option<u32>,
    pub price_type: Option<PriceType>,
    pub value_comparison: Option<ValueComparison>,

    // Dimensions in m² / m³
    pub living_area: Option<u32>,
    pub plot_size: Option<u32>,
    pub volume: Option<u32>,

    pub rooms: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub floors: Option<u32>,

    pub property_type: Option<String>,
    pub house_type: Option<String>,
    pub build_type: Option<String>,
    pub year_built: Option<i32>,
    pub renovation_year: Option<i32>,

    // Energy
    pub energy_label: Option<String>,
    pub insulation: Option<String>,
    pub heating: Option<String>,
    pub cv_year: Option<i32>,

    pub roof_type: Option<String>,
    pub kitchen_type: Option<String>,
    #[serde(serialize_with = "serialize_set")]
    pub kitchen_amenities: Option<BTreeSet<String>>,
    #[serde(serialize_with = "serialize_set")]
    pub bathroom_amenities: Option<BTreeSet<String>>,

    pub location_type: Option<String>,
    pub parking_type: Option<String>,

    pub maintenance_inside: Option<String>,
    pub maintenance_outside: Option<String>,

    pub status: Option<String>,
    /// Days on the market as of `date_scraped`
    pub listed_since: Option<u32>,
    pub acceptance: Option<String>,
    pub cadastral_info: Option<String>,
    pub description: Option<String>,

    pub agent_name: Option<String>,
    pub agent_url: Option<String>,

    pub date_scraped: DateTime<Utc>,
}

impl PropertyListing {
    /// Minimal listing reference as found on a search results page
    pub fn stub(url: impl Into<String>, listing_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            listing_id: listing_id.into(),
            date_scraped: Utc::now(),
            ..Default::default()
        }
    }
}

fn serialize_set<S>(set: &Option<BTreeSet<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match set {
        Some(items) => {
            let joined = items.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            serializer.serialize_some(&joined)
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_only_carries_identity() {
        let listing = PropertyListing::stub("https://huispedia.nl/delft/2611ab/markt/1", "delft-2611ab-markt-1");
        assert_eq!(listing.listing_id, "delft-2611ab-markt-1");
        assert!(listing.price.is_none());
        assert!(listing.year_built.is_none());
        assert!(listing.kitchen_amenities.is_none());
    }

    #[test]
    fn amenities_serialize_as_joined_text() {
        let mut listing = PropertyListing::stub("u", "id");
        listing.kitchen_amenities = Some(
            ["vaatwasser", "afzuigkap"].iter().map(|s| s.to_string()).collect(),
        );
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["kitchen_amenities"], "afzuigkap, vaatwasser");
        assert!(value["bathroom_amenities"].is_null());
    }
}
