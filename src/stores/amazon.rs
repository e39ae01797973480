// Amazon product pages
use crate::fetch::Fetcher;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, first_price};
use crate::stores::{browser_request, StoreAdapter};
use crate::templates;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};

static OUR_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#priceblock_ourprice").unwrap());
static DEAL_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#priceblock_dealprice").unwrap());
static MODEL_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Item model number(.*?)/td>").unwrap());
static MODEL_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)base">(.*?)<"#).unwrap());

pub struct Amazon {
    fetcher: Arc<dyn Fetcher>,
}

impl Amazon {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

/// Combo deals and splash pages carry neither field.
pub fn extract(text: &str) -> ProductDetails {
    let doc = Html::parse_document(text);
    let part_number = capture(&MODEL_ROW, text).and_then(|row| capture(&MODEL_VALUE, &row));
    let price = first_price(&doc, &[&OUR_PRICE, &DEAL_PRICE]);
    ProductDetails { part_number, price }
}

#[async_trait::async_trait]
impl StoreAdapter for Amazon {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let text = self.fetcher.fetch(&browser_request(url, "www.amazon.com")).await?;
        let details = extract(&text);
        let markdown = templates::generic(&details);
        Ok(AdapterOutput { details, markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fetcher::testing::StubFetcher;

    const PRODUCT: &str = r#"<html><body>
        <span id="priceblock_ourprice" class="a-size-medium">$84.99</span>
        <table><tr><th class="a-color-secondary">Item model number</th>
        <td class="a-size-base">CT500MX500SSD1</td></tr></table>
        </body></html>"#;

    #[test]
    fn extracts_model_and_price() {
        let details = extract(PRODUCT);
        assert_eq!(details.part_number.as_deref(), Some("CT500MX500SSD1"));
        assert_eq!(details.price, Some(85));
    }

    #[test]
    fn falls_back_to_deal_price() {
        let html = r#"<span id="priceblock_dealprice">$129.50</span>"#;
        assert_eq!(extract(html), ProductDetails { part_number: None, price: Some(130) });
    }

    #[test]
    fn splash_page_yields_nothing() {
        assert_eq!(extract("<html><body><h1>Home Audio</h1></body></html>"), ProductDetails::default());
    }

    #[tokio::test]
    async fn run_sends_store_host_and_renders_comment() {
        let url = "https://www.amazon.com/Crucial-MX500-NAND-SATA-Internal/dp/B077SF8KMG";
        let fetcher = Arc::new(StubFetcher::default().page(url, PRODUCT));
        let out = Amazon::new(fetcher.clone()).run(url).await.unwrap();

        assert_eq!(out.details.price, Some(85));
        assert!(out.markdown.unwrap().contains("CT500MX500SSD1|85|"));
        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].header_value("host"), Some("www.amazon.com"));
    }
}
