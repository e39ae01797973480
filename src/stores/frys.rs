// Fry's product pages
use crate::fetch::Fetcher;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{element_text, first_price, select_nth};
use crate::stores::{browser_request, StoreAdapter};
use crate::templates;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::warn;

static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#did_price1valuediv").unwrap());
static LABEL_VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.product-label-value").unwrap());

pub struct Frys {
    fetcher: Arc<dyn Fetcher>,
}

impl Frys {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

/// The manufacturer number is the second label value; the first is the Fry's SKU.
pub fn extract(text: &str) -> ProductDetails {
    let doc = Html::parse_document(text);
    ProductDetails {
        part_number: select_nth(&doc, &LABEL_VALUE, 1).and_then(element_text),
        price: first_price(&doc, &[&PRICE]),
    }
}

#[async_trait::async_trait]
impl StoreAdapter for Frys {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let text = self.fetcher.fetch(&browser_request(url, "www.frys.com")).await?;
        if text.trim().is_empty() {
            // Mailers and multi-product links come back empty.
            warn!("Empty page for {}", url);
            return Ok(AdapterOutput::default());
        }
        let details = extract(&text);
        let markdown = templates::generic(&details);
        Ok(AdapterOutput { details, markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fetcher::testing::StubFetcher;

    #[test]
    fn second_label_is_the_part_number() {
        let html = r#"<div>
            <span class="product-label-value">8760481</span>
            <span class="product-label-value"> BX80684I78700K </span>
            <span id="did_price1valuediv">$349.99</span></div>"#;
        let details = extract(html);
        assert_eq!(details.part_number.as_deref(), Some("BX80684I78700K"));
        assert_eq!(details.price, Some(350));
    }

    #[test]
    fn single_label_means_no_part_number() {
        let html = r#"<span class="product-label-value">8760481</span><span id="did_price1valuediv">See price in cart</span>"#;
        assert_eq!(extract(html), ProductDetails::default());
    }

    #[tokio::test]
    async fn empty_page_returns_empty_output() {
        let url = "https://frys.hs.llnwd.net/e1/art/email/BF1_web.html";
        let out = Frys::new(Arc::new(StubFetcher::default())).run(url).await.unwrap();
        assert_eq!(out, AdapterOutput::default());
    }
}
