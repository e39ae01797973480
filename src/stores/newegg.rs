// Newegg product pages (analytics block embedded in a script tag)
use crate::fetch::Fetcher;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, parse_price};
use crate::stores::{browser_request, StoreAdapter};
use crate::templates;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static PRODUCT_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product_model:\['(.*?)'\]").unwrap());
static SALE_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product_sale_price:\['(.*?)'\]").unwrap());

pub struct Newegg {
    fetcher: Arc<dyn Fetcher>,
}

impl Newegg {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

pub fn extract(text: &str) -> ProductDetails {
    ProductDetails {
        part_number: capture(&PRODUCT_MODEL, text),
        price: capture(&SALE_PRICE, text).and_then(|raw| parse_price(&raw)),
    }
}

#[async_trait::async_trait]
impl StoreAdapter for Newegg {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let text = self.fetcher.fetch(&browser_request(url, "www.newegg.com")).await?;
        let details = extract(&text);
        let markdown = templates::generic(&details);
        Ok(AdapterOutput { details, markdown })
    }
}
