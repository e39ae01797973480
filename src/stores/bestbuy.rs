// Best Buy product pages
use crate::fetch::Fetcher;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, parse_price, select_text};
use crate::stores::{browser_request, StoreAdapter};
use crate::templates;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};

static CUSTOMER_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"customerPrice":(.*?),"#).unwrap());
static MODEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span#model-value").unwrap());

pub struct BestBuy {
    fetcher: Arc<dyn Fetcher>,
}

impl BestBuy {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

pub fn extract(text: &str) -> ProductDetails {
    let doc = Html::parse_document(text);
    ProductDetails {
        part_number: select_text(&doc, &MODEL),
        price: capture(&CUSTOMER_PRICE, text).and_then(|raw| parse_price(&raw)),
    }
}

#[async_trait::async_trait]
impl StoreAdapter for BestBuy {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let text = self.fetcher.fetch(&browser_request(url, "www.bestbuy.com")).await?;
        let details = extract(&text);
        let markdown = templates::generic(&details);
        Ok(AdapterOutput { details, markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_embedded_price_and_model() {
        let html = r#"<script>window.__STATE__ = {"sku":"5293502","customerPrice":379.99,"regularPrice":449.99};</script>
            <div class="model"><span class="product-data-label">Model:</span><span id="model-value" class="product-data-value">S2716DGR</span></div>"#;
        let details = extract(html);
        assert_eq!(details.part_number.as_deref(), Some("S2716DGR"));
        assert_eq!(details.price, Some(380));
    }

    #[test]
    fn category_page_has_neither() {
        let html = r#"<html><h1>Refrigerators</h1><script>{"customerPrice":null,"x":1}</script></html>"#;
        assert_eq!(extract(html), ProductDetails::default());
    }
}
