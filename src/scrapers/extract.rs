//! Field extraction for Huispedia pages.
//!
//! Coercion functions turn the loose text found in the markup into typed
//! values. A [`Field`] pairs one of them with a [`Locator`] so the listing
//! parser can run a whole table of fields through [`FieldRule`].

use crate::error::FieldError;
use crate::models::{PriceType, PropertyListing, ValueComparison};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;

const DESCRIPTION_MIN_CHARS: usize = 500;
const DESCRIPTION_MAX_CHARS: usize = 2000;
const DESCRIPTION_KEYWORDS: [&str; 5] = ["woning", "kamer", "keuken", "tuin", "badkamer"];

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?").unwrap());
static AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?\s*m[²2]").unwrap());
static VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d{3})+|\d+)(?:,\d+)?\s*m[³3]").unwrap());
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"€\s*(\d{1,3}(?:\.\d{3})+|\d+)").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());
static ENERGY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^A-Za-z+])([A-G]\+{0,4})(?:$|[^A-Za-z+])").unwrap());
static ROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*kamer").unwrap());
static BEDROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*slaapkamer").unwrap());
static BATHROOMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*badkamer").unwrap());
static FLOORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*woonla").unwrap());
static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*|\s+en\s+").unwrap());
static RELATIVE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\+?\s*(dagen|dag|weken|week|maanden|maand|jaren|jaar)").unwrap()
});
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})-(\d{1,2})-(\d{4})").unwrap());
static WRITTEN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{1,2})\s+(januari|februari|maart|april|mei|juni|juli|augustus|september|oktober|november|december)\s+(\d{4})",
    )
    .unwrap()
});

pub static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\s*([A-Z]{2})\b").unwrap());
static VALUE_COMPARISON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(onder|binnen|boven) de waarde\b").unwrap());

static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static LIST_OR_NAV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul, nav").unwrap());
static AGENT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href*='/makelaars/kantoor/']").unwrap());
static BREADCRUMB_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav[aria-label] a[href*='/koopwoningen/']").unwrap());

// ---------------------------------------------------------------------------
// Coercions
// ---------------------------------------------------------------------------

/// Text of an element with its text nodes trimmed and joined by single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace-normalized text, `None` when nothing is left
pub fn text(raw: &str) -> Option<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

fn dutch_integer(digits: &str) -> Option<u64> {
    digits.replace('.', "").parse().ok()
}

fn first_capture<T: std::str::FromStr>(pattern: &Regex, raw: &str) -> Option<T> {
    pattern.captures(raw)?.get(1)?.as_str().parse().ok()
}

/// First number in the text; `.` is a thousands separator and decimals are dropped
pub fn parse_number(raw: &str) -> Option<u32> {
    let digits = NUMBER.captures(raw)?.get(1)?.as_str();
    dutch_integer(digits).and_then(|n| u32::try_from(n).ok())
}

/// Surface in m², e.g. `"1.234 m²"`
pub fn parse_area(raw: &str) -> Option<u32> {
    let digits = AREA.captures(raw)?.get(1)?.as_str();
    dutch_integer(digits).and_then(|n| u32::try_from(n).ok())
}

/// Volume in m³
pub fn parse_volume(raw: &str) -> Option<u32> {
    let digits = VOLUME.captures(raw)?.get(1)?.as_str();
    dutch_integer(digits).and_then(|n| u32::try_from(n).ok())
}

/// Euro amount, e.g. `"€ 310.000 k.k."`
pub fn parse_price(raw: &str) -> Option<u64> {
    let digits = PRICE.captures(raw)?.get(1)?.as_str();
    dutch_integer(digits)
}

pub fn parse_price_type(raw: &str) -> Option<PriceType> {
    let lower = raw.to_lowercase();
    if lower.contains("k.k.") {
        Some(PriceType::KostenKoper)
    } else if lower.contains("v.o.n.") {
        Some(PriceType::VrijOpNaam)
    } else {
        None
    }
}

/// Maps the portal's value badge; anything unrecognized yields `None`
pub fn parse_value_comparison(raw: &str) -> Option<ValueComparison> {
    let captures = VALUE_COMPARISON.captures(raw)?;
    match captures.get(1)?.as_str().to_lowercase().as_str() {
        "onder" => Some(ValueComparison::Below),
        "binnen" => Some(ValueComparison::Within),
        "boven" => Some(ValueComparison::Above),
        _ => None,
    }
}

pub fn parse_year(raw: &str) -> Option<i32> {
    first_capture(&YEAR, raw)
}

pub fn parse_energy_label(raw: &str) -> Option<String> {
    Some(ENERGY_LABEL.captures(raw)?.get(1)?.as_str().to_string())
}

pub fn parse_rooms(raw: &str) -> Option<u32> {
    first_capture(&ROOMS, raw)
}

pub fn parse_bedrooms(raw: &str) -> Option<u32> {
    first_capture(&BEDROOMS, raw)
}

pub fn parse_bathrooms(raw: &str) -> Option<u32> {
    first_capture(&BATHROOMS, raw)
}

pub fn parse_floors(raw: &str) -> Option<u32> {
    first_capture(&FLOORS, raw)
}

/// Splits "a, b en c" into a set; an empty set is `None`
pub fn parse_list(raw: &str) -> Option<BTreeSet<String>> {
    let items: BTreeSet<String> = LIST_SEPARATOR
        .split(raw.trim())
        .filter_map(text)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// First part of a comma separated description ("Eengezinswoning, tussenwoning")
pub fn first_part(raw: &str) -> Option<String> {
    raw.split(',').next().and_then(text)
}

pub fn second_part(raw: &str) -> Option<String> {
    raw.split(',').nth(1).and_then(text)
}

/// How long a listing has been on the market, as written on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListedSince {
    DaysAgo(u32),
    On(NaiveDate),
}

impl ListedSince {
    pub fn days_before(self, today: NaiveDate) -> u32 {
        match self {
            ListedSince::DaysAgo(days) => days,
            ListedSince::On(date) => u32::try_from((today - date).num_days()).unwrap_or(0),
        }
    }
}

fn dutch_month(name: &str) -> Option<u32> {
    let month = match name {
        "januari" => 1,
        "februari" => 2,
        "maart" => 3,
        "april" => 4,
        "mei" => 5,
        "juni" => 6,
        "juli" => 7,
        "augustus" => 8,
        "september" => 9,
        "oktober" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Accepts "vandaag", "3 weken", "6+ maanden", "12-03-2024" and "12 maart 2024"
pub fn parse_listed_since(raw: &str) -> Option<ListedSince> {
    let lower = raw.trim().to_lowercase();
    if lower.contains("vandaag") {
        return Some(ListedSince::DaysAgo(0));
    }
    if lower.contains("gisteren") {
        return Some(ListedSince::DaysAgo(1));
    }
    if let Some(caps) = NUMERIC_DATE.captures(&lower) {
        let date = NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        )?;
        return Some(ListedSince::On(date));
    }
    if let Some(caps) = WRITTEN_DATE.captures(&lower) {
        let date = NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            dutch_month(&caps[2])?,
            caps[1].parse().ok()?,
        )?;
        return Some(ListedSince::On(date));
    }
    let caps = RELATIVE_AGE.captures(&lower)?;
    let amount: u32 = caps[1].parse().ok()?;
    let unit_days = match &caps[2] {
        "dag" | "dagen" => 1,
        "week" | "weken" => 7,
        "maand" | "maanden" => 30,
        _ => 365,
    };
    Some(ListedSince::DaysAgo(amount.saturating_mul(unit_days)))
}

/// "den-haag" -> "Den Haag"
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// "1012AB" and "1012 AB" both become "1012 AB"
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let caps = POSTAL_CODE.captures(raw)?;
    Some(format!("{} {}", &caps[1], &caps[2]))
}

// ---------------------------------------------------------------------------
// Documents and locators
// ---------------------------------------------------------------------------

/// A parsed detail page with its feature list items pre-collected
pub struct DetailDocument {
    html: Html,
    items: Vec<String>,
    base_url: String,
}

impl DetailDocument {
    pub fn parse(html: &str, base_url: &str) -> Self {
        let html = Html::parse_document(html);
        let items = html
            .select(&LIST_ITEM)
            .map(element_text)
            .filter(|item| !item.is_empty())
            .collect();
        Self {
            html,
            items,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        }
    }

    fn breadcrumb_slugs(&self) -> impl Iterator<Item = &str> {
        self.html
            .select(&BREADCRUMB_LINK)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| href.split("/koopwoningen/").nth(1))
            .filter_map(|rest| rest.split('/').find(|segment| !segment.is_empty()))
    }
}

fn excluded(text: &str, exclude: &[&str]) -> bool {
    let lower = text.to_lowercase();
    exclude.iter().any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Where in a detail page a field's raw text lives
#[derive(Debug, Clone, Copy)]
pub enum Locator {
    /// First feature item containing `label`; yields the text without the label
    Labeled {
        label: &'static str,
        exclude: &'static [&'static str],
    },
    /// First feature item starting with `prefix`; yields the remainder
    Prefixed {
        prefix: &'static str,
        exclude: &'static [&'static str],
    },
    /// First feature item matching `pattern`; yields the whole item
    Patterned {
        pattern: &'static LazyLock<Regex>,
        exclude: &'static [&'static str],
    },
    /// First match of `pattern` in any text node of the page
    TextMatch(&'static LazyLock<Regex>),
    Title,
    AgentName,
    AgentUrl,
    BreadcrumbCity,
    BreadcrumbProvince,
    Description,
}

impl Locator {
    pub fn locate(&self, doc: &DetailDocument) -> Option<String> {
        match *self {
            Locator::Labeled { label, exclude } => doc
                .items
                .iter()
                .find(|item| item.contains(label) && !excluded(item, exclude))
                .map(|item| item.replacen(label, "", 1).trim().to_string()),
            Locator::Prefixed { prefix, exclude } => doc
                .items
                .iter()
                .find(|item| item.starts_with(prefix) && !excluded(item, exclude))
                .map(|item| item[prefix.len()..].trim().to_string()),
            Locator::Patterned { pattern, exclude } => doc
                .items
                .iter()
                .find(|item| pattern.is_match(item) && !excluded(item, exclude))
                .cloned(),
            Locator::TextMatch(pattern) => doc
                .html
                .root_element()
                .text()
                .find_map(|node| pattern.find(node).map(|m| m.as_str().to_string())),
            Locator::Title => doc.html.select(&TITLE).next().map(element_text),
            Locator::AgentName => doc.html.select(&AGENT_LINK).next().map(element_text),
            Locator::AgentUrl => doc
                .html
                .select(&AGENT_LINK)
                .next()
                .and_then(|link| link.value().attr("href"))
                .map(|href| doc.absolute(href)),
            Locator::BreadcrumbCity => doc
                .breadcrumb_slugs()
                .filter(|slug| !slug.starts_with("provincie-"))
                .last()
                .map(title_case_slug),
            Locator::BreadcrumbProvince => doc
                .breadcrumb_slugs()
                .find_map(|slug| slug.strip_prefix("provincie-"))
                .filter(|slug| !slug.is_empty())
                .map(title_case_slug),
            Locator::Description => doc.html.select(&DIV).find_map(|div| {
                if div.select(&LIST_OR_NAV).next().is_some() {
                    return None;
                }
                let body = element_text(div);
                if body.chars().count() <= DESCRIPTION_MIN_CHARS {
                    return None;
                }
                let lower = body.to_lowercase();
                DESCRIPTION_KEYWORDS
                    .iter()
                    .any(|word| lower.contains(word))
                    .then(|| body.chars().take(DESCRIPTION_MAX_CHARS).collect())
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// One extractable listing field
pub trait FieldRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes the field into `listing`, leaving it untouched on error
    fn apply(&self, doc: &DetailDocument, listing: &mut PropertyListing) -> Result<(), FieldError>;
}

/// A locator, a coercion and the listing slot the value lands in
pub struct Field<T> {
    pub name: &'static str,
    pub locator: Locator,
    pub coerce: fn(&str) -> Option<T>,
    pub assign: fn(&mut PropertyListing, T),
}

impl<T: 'static> FieldRule for Field<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, doc: &DetailDocument, listing: &mut PropertyListing) -> Result<(), FieldError> {
        let raw = self.locator.locate(doc).ok_or(FieldError::Missing)?;
        let value = (self.coerce)(&raw).ok_or(FieldError::Unparsable(raw))?;
        (self.assign)(listing, value);
        Ok(())
    }
}

/// Boxes a [`Field`] for use in a rule table
pub fn field<T: 'static>(
    name: &'static str,
    locator: Locator,
    coerce: fn(&str) -> Option<T>,
    assign: fn(&mut PropertyListing, T),
) -> Box<dyn FieldRule> {
    Box::new(Field {
        name,
        locator,
        coerce,
        assign,
    })
}
