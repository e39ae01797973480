// Rakuten product pages
use crate::fetch::Fetcher;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, parse_price};
use crate::stores::{browser_request, StoreAdapter};
use crate::templates;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static PRICE_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""price" content="(.*?)"\s*/>"#).unwrap());
static MPN_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MPN</th><td>(.*?)</td>").unwrap());

pub struct Rakuten {
    fetcher: Arc<dyn Fetcher>,
}

impl Rakuten {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

pub fn extract(text: &str) -> ProductDetails {
    ProductDetails {
        part_number: capture(&MPN_ROW, text),
        price: capture(&PRICE_META, text).and_then(|raw| parse_price(&raw)),
    }
}

#[async_trait::async_trait]
impl StoreAdapter for Rakuten {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let text = self.fetcher.fetch(&browser_request(url, "www.rakuten.com")).await?;
        let details = extract(&text);
        let markdown = templates::generic(&details);
        Ok(AdapterOutput { details, markdown })
    }
}
