use crate::models::PropertyListing;
use crate::scrapers::extract::{
    field, first_part, normalize_postal_code, parse_area, parse_bathrooms, parse_bedrooms,
    parse_energy_label, parse_floors, parse_list, parse_listed_since, parse_price,
    parse_price_type, parse_rooms, parse_volume, parse_year, second_part, text, DetailDocument,
    FieldRule, Locator, POSTAL_CODE,
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CADASTRAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]+ [A-Z] \d+").unwrap());

const fn labeled(label: &'static str) -> Locator {
    Locator::Labeled { label, exclude: &[] }
}

/// Detail page fields, applied in order; later rules may refine earlier ones.
static DETAIL_FIELDS: LazyLock<Vec<Box<dyn FieldRule>>> = LazyLock::new(|| {
    vec![
        field("title", Locator::Title, text, |l, v| l.title = Some(v)),
        // Price
        field(
            "price",
            Locator::Labeled { label: "Vraagprijs", exclude: &["per m"] },
            parse_price,
            |l, v| l.price = Some(v),
        ),
        field(
            "price_type",
            Locator::Labeled { label: "Vraagprijs", exclude: &["per m"] },
            parse_price_type,
            |l, v| l.price_type = Some(v),
        ),
        field("price_per_sqm", labeled("Vraagprijs per m"), parse_price, |l, v| {
            l.price_per_sqm = u32::try_from(v).ok()
        }),
        // Listing status
        field("listed_since", labeled("Aangeboden sinds"), parse_listed_since, |l, v| {
            l.listed_since = Some(v.days_before(l.date_scraped.date_naive()))
        }),
        field("status", labeled("Status"), text, |l, v| l.status = Some(v)),
        field("acceptance", labeled("Aanvaarding"), text, |l, v| l.acceptance = Some(v)),
        // Building
        field("property_type", labeled("Soort woonhuis"), first_part, |l, v| {
            l.property_type = Some(v)
        }),
        field("house_type", labeled("Soort woonhuis"), second_part, |l, v| {
            l.house_type = Some(v)
        }),
        field("property_type", labeled("Soort appartement"), first_part, |l, v| {
            l.property_type = Some(v)
        }),
        field("build_type", labeled("Soort bouw"), text, |l, v| l.build_type = Some(v)),
        field(
            "year_built",
            Locator::Labeled { label: "Bouwjaar", exclude: &["Cv-ketel"] },
            parse_year,
            |l, v| l.year_built = Some(v),
        ),
        field("renovation_year", labeled("Renovatiejaar"), parse_year, |l, v| {
            l.renovation_year = Some(v)
        }),
        field("roof_type", labeled("Soort dak"), text, |l, v| l.roof_type = Some(v)),
        // Energy
        field("energy_label", labeled("Energielabel"), parse_energy_label, |l, v| {
            l.energy_label = Some(v)
        }),
        field("insulation", labeled("Isolatie"), text, |l, v| l.insulation = Some(v)),
        field("heating", labeled("Verwarming"), text, |l, v| l.heating = Some(v)),
        field(
            "cv_year",
            Locator::Prefixed { prefix: "Cv-ketel", exclude: &[] },
            parse_year,
            |l, v| l.cv_year = Some(v),
        ),
        // Dimensions
        field("living_area", labeled("Woonoppervlakte"), parse_area, |l, v| {
            l.living_area = Some(v)
        }),
        field("plot_size", labeled("Perceeloppervlakte"), parse_area, |l, v| {
            l.plot_size = Some(v)
        }),
        field("volume", labeled("Inhoud"), parse_volume, |l, v| l.volume = Some(v)),
        // Rooms
        field("rooms", labeled("Aantal kamers"), parse_rooms, |l, v| l.rooms = Some(v)),
        field("bedrooms", labeled("Aantal kamers"), parse_bedrooms, |l, v| {
            l.bedrooms = Some(v)
        }),
        field("bathrooms", labeled("Aantal badkamers"), parse_bathrooms, |l, v| {
            l.bathrooms = Some(v)
        }),
        field("floors", labeled("Aantal woonlagen"), parse_floors, |l, v| l.floors = Some(v)),
        // Kitchen and bathroom
        field(
            "kitchen_type",
            Locator::Labeled { label: "Keuken", exclude: &["voorzieningen"] },
            text,
            |l, v| l.kitchen_type = Some(v),
        ),
        field("kitchen_amenities", labeled("Keukenvoorzieningen"), parse_list, |l, v| {
            l.kitchen_amenities = Some(v)
        }),
        field("bathroom_amenities", labeled("Badkamervoorzieningen"), parse_list, |l, v| {
            l.bathroom_amenities = Some(v)
        }),
        // Surroundings
        field("location_type", labeled("Ligging woning"), text, |l, v| {
            l.location_type = Some(v)
        }),
        field("parking_type", labeled("Soort parkeergelegenheid"), text, |l, v| {
            l.parking_type = Some(v)
        }),
        // Maintenance
        field(
            "maintenance_inside",
            Locator::Prefixed { prefix: "Binnen", exclude: &["Buiten", "de waarde"] },
            text,
            |l, v| l.maintenance_inside = Some(v),
        ),
        field(
            "maintenance_outside",
            Locator::Prefixed { prefix: "Buiten", exclude: &[] },
            text,
            |l, v| l.maintenance_outside = Some(v),
        ),
        field(
            "cadastral_info",
            Locator::Patterned { pattern: &CADASTRAL, exclude: &["Oppervlakte"] },
            text,
            |l, v| l.cadastral_info = Some(v),
        ),
        field("description", Locator::Description, text, |l, v| l.description = Some(v)),
        // Agent
        field("agent_name", Locator::AgentName, text, |l, v| l.agent_name = Some(v)),
        field("agent_url", Locator::AgentUrl, text, |l, v| l.agent_url = Some(v)),
        // Address
        field("city", Locator::BreadcrumbCity, text, |l, v| l.city = Some(v)),
        field("province", Locator::BreadcrumbProvince, text, |l, v| l.province = Some(v)),
        field(
            "postal_code",
            Locator::TextMatch(&POSTAL_CODE),
            normalize_postal_code,
            |l, v| l.postal_code = Some(v),
        ),
    ]
});

/// Enriches `listing` with everything its detail page provides.
///
/// Each field is extracted on its own; a field that is missing or malformed
/// keeps whatever value the listing already had.
pub fn parse_detail_page(html: &str, base_url: &str, listing: &mut PropertyListing) {
    let doc = DetailDocument::parse(html, base_url);
    let mut extracted = 0usize;

    for rule in DETAIL_FIELDS.iter() {
        match rule.apply(&doc, listing) {
            Ok(()) => extracted += 1,
            Err(err) => debug!(
                listing_id = %listing.listing_id,
                field = rule.name(),
                error = %err,
                "Field not extracted"
            ),
        }
    }

    debug!(
        listing_id = %listing.listing_id,
        extracted,
        rules = DETAIL_FIELDS.len(),
        "Parsed detail page"
    );
}
