// Micro Center: product metadata from the home store page, then per-location stock.
use crate::fetch::{Fetcher, PageRequest};
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, parse_price, select_text};
use crate::stores::StoreAdapter;
use crate::templates;
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// The web store shows up in the location list but has no shelf.
pub const WEB_STORE_ID: &str = "029";
const STORE_ID_PARAM: &str = "storeID=";
const STORE_ONLY_FLAG: &str = "Available for In-Store Pickup Only.";
const SOLD_OUT: &str = "Sold Out";

static DATA_LAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)dataLayer = \[(.*?)\];").unwrap());
static INVENTORY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"inventory = (.*)").unwrap());
static OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());
static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(\w+)'\s*:\s*'(.*?)'\s*(?:,|$)").unwrap());
static INVENTORY_COUNT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.inventoryCnt").unwrap());
static OPEN_BOX: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span#opCostNew").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductMetadata {
    pub price: Option<i64>,
    pub part_number: Option<String>,
    pub store_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub id: String,
}

/// Stock at one location. Kept only if at least one of the two values was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationStock {
    pub name: String,
    pub id: String,
    pub quantity: Option<String>,
    pub open_box: Option<String>,
}

pub struct MicroCenter {
    fetcher: Arc<dyn Fetcher>,
    home_store: String,
    concurrency: usize,
}

impl MicroCenter {
    pub fn new(fetcher: Arc<dyn Fetcher>, home_store: &str, concurrency: usize) -> Self {
        Self {
            fetcher,
            home_store: home_store.to_string(),
            concurrency: concurrency.max(1),
        }
    }

    fn request(url: &str, store_id: &str) -> PageRequest {
        PageRequest::new(url)
            .header("cookie", format!("storeSelected={}", store_id))
            .header("dnt", "1")
            .header("host", "www.microcenter.com")
    }

    async fn location_stock(
        &self,
        url: &str,
        location: Location,
    ) -> Result<Option<LocationStock>, FetchError> {
        let text = self.fetcher.fetch(&Self::request(url, &location.id)).await?;
        Ok(extract_stock(&text, location))
    }

    /// One fetch per location, at most `concurrency` in flight. Output is sorted by name.
    pub async fn fan_out(
        &self,
        url: &str,
        locations: Vec<Location>,
    ) -> Result<Vec<LocationStock>, FetchError> {
        let mut stock: Vec<LocationStock> = stream::iter(locations)
            .filter(|l| futures::future::ready(l.id != WEB_STORE_ID))
            .map(|l| self.location_stock(url, l))
            .buffer_unordered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flatten()
            .collect();

        stock.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(stock)
    }
}

/// Removes every `storeID=<value>` query parameter (and the `&` that follows it).
/// Parameters that merely end in `storeID` are left alone. Applying it twice
/// changes nothing.
pub fn strip_store_id(url: &str) -> String {
    let mut out = url.to_string();
    let mut from = 0;
    while let Some(found) = out[from..].find(STORE_ID_PARAM) {
        let begin = from + found;
        if !out[..begin].ends_with(['?', '&']) {
            from = begin + STORE_ID_PARAM.len();
            continue;
        }
        let end = match out[begin..].find('&') {
            Some(amp) => begin + amp + 1,
            None => out.len(),
        };
        out.replace_range(begin..end, "");
        from = begin;
    }
    out
}

/// The page embeds single-quoted JS objects; close enough to JSON after a quote swap.
/// A stray `"` or `'` inside a value (`27" Monitor`) breaks that, so the
/// fallback reads the `'key':'value'` pairs of each object one by one.
fn parse_embedded_json(raw: &str) -> Option<Value> {
    let raw = raw.trim().trim_end_matches(';');
    match serde_json::from_str(&raw.replace('\'', "\"")) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Embedded JSON did not parse ({}), reading fields one by one", e);
            let mut objects = OBJECT.captures_iter(raw).map(|c| quoted_fields(&c[1]));
            if raw.starts_with('[') {
                Some(Value::Array(objects.collect()))
            } else {
                let first = objects.next();
                if first.is_none() {
                    warn!("No object found in embedded data");
                }
                first
            }
        }
    }
}

fn quoted_fields(body: &str) -> Value {
    Value::Object(
        FIELD
            .captures_iter(body)
            .map(|c| (c[1].to_string(), Value::String(c[2].to_string())))
            .collect(),
    )
}

fn json_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => {
            debug!("Key {} missing from embedded JSON", key);
            None
        }
    }
}

pub fn extract_metadata(text: &str) -> ProductMetadata {
    let Some(data) = capture(&DATA_LAYER, text).and_then(|raw| parse_embedded_json(&raw)) else {
        return ProductMetadata::default();
    };

    ProductMetadata {
        price: json_string(&data, "productPrice").and_then(|raw| parse_price(&raw)),
        part_number: json_string(&data, "mpn"),
        store_only: json_string(&data, "AvailabilityCode").map(|code| code == STORE_ONLY_FLAG),
    }
}

pub fn extract_locations(text: &str) -> Vec<Location> {
    let Some(Value::Array(entries)) =
        capture(&INVENTORY, text).and_then(|raw| parse_embedded_json(&raw))
    else {
        warn!("No location list found");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = json_string(entry, "storeName")?;
            let id = json_string(entry, "storeNumber")?;
            Some(Location { name, id })
        })
        .filter(|l| l.id != WEB_STORE_ID)
        .collect()
}

pub fn extract_stock(text: &str, location: Location) -> Option<LocationStock> {
    let doc = Html::parse_document(text);
    let quantity = select_text(&doc, &INVENTORY_COUNT).filter(|q| q != SOLD_OUT);
    let open_box = select_text(&doc, &OPEN_BOX);

    if quantity.is_none() && open_box.is_none() {
        debug!("Nothing at {} ({})", location.name, location.id);
        return None;
    }
    Some(LocationStock {
        name: location.name,
        id: location.id,
        quantity,
        open_box,
    })
}

#[async_trait::async_trait]
impl StoreAdapter for MicroCenter {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let url = strip_store_id(url);
        info!("url: {}", url);

        let text = self.fetcher.fetch(&Self::request(&url, &self.home_store)).await?;
        let metadata = extract_metadata(&text);
        let details = ProductDetails {
            part_number: metadata.part_number,
            price: metadata.price,
        };
        if details.part_number.is_none() {
            info!("No part number, not a product page");
            return Ok(AdapterOutput { details, markdown: None });
        }

        let locations = extract_locations(&text);
        info!("Checking {} locations", locations.len());
        let stock = self.fan_out(&url, locations).await?;

        let markdown =
            templates::microcenter::build_markdown(&details, metadata.store_only, &stock, &url);

        Ok(AdapterOutput { details, markdown: Some(markdown) })
    }
}
