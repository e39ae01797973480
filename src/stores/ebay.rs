// eBay listings. Catalogue (`/p/`) links are resolved to a concrete `/itm/` listing first.
use crate::fetch::{Fetcher, PageRequest};
use crate::fetch::fetcher::DEFAULT_USER_AGENT;
use crate::model::{AdapterOutput, FetchError, ProductDetails};
use crate::stores::extract::{capture, first_price, select_attr, select_text};
use crate::stores::StoreAdapter;
use crate::templates;
use crate::utils::group_thousands;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

const ITEM_BASE_URL: &str = "https://www.ebay.com/itm/";
const NBSP: char = '\u{a0}';

static CATALOGUE_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)data-itemid="(.*?)""#).unwrap());
static FEEDBACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)feedback score: (.*?)""#).unwrap());
static MPN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)itemprop="mpn">(.*?)<"#).unwrap());
static ITEM_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#descItemNumber").unwrap());
static PRICE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span#prcIsum").unwrap());
static SALE_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#mm-saleDscPrc").unwrap());
static SELLER: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a#mbgLink").unwrap());
static SCORE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#si-fb").unwrap());
static SHIPPING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span#fshippingCost").unwrap());

/// Everything read off one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub seller: Option<String>,
    /// Feedback count, already thousands-separated.
    pub feedback: Option<String>,
    /// Positive feedback percentage, e.g. `99.2%`.
    pub score: Option<String>,
    pub item_number: Option<String>,
    pub free_shipping: Option<bool>,
    pub part_number: Option<String>,
    pub price: Option<i64>,
}

impl Listing {
    /// The detailed comment is only worth posting with the full seller picture.
    pub fn is_markdown_worthy(&self) -> bool {
        self.seller.is_some() && self.feedback.is_some() && self.score.is_some()
    }

    pub fn details(&self) -> ProductDetails {
        ProductDetails {
            part_number: self.part_number.clone(),
            price: self.price,
        }
    }
}

pub struct Ebay {
    fetcher: Arc<dyn Fetcher>,
}

impl Ebay {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    fn request(url: &str) -> PageRequest {
        PageRequest::new(url)
            .header("dnt", "1")
            .header("user-agent", DEFAULT_USER_AGENT)
    }

    /// Catalogue pages list many sellers; follow the featured listing.
    async fn listing_url(&self, url: &str) -> Result<Option<String>, FetchError> {
        if !url.contains("ebay.com/p/") {
            return Ok(Some(url.to_string()));
        }
        let text = self.fetcher.fetch(&Self::request(url)).await?;
        let resolved = item_url_from_catalogue(&text);
        match &resolved {
            Some(item) => info!("catalogue page resolved to {}", item),
            None => warn!("No listing found on catalogue page {}", url),
        }
        Ok(resolved)
    }
}

pub fn item_url_from_catalogue(text: &str) -> Option<String> {
    capture(&CATALOGUE_ITEM, text).map(|id| format!("{}{}", ITEM_BASE_URL, id))
}

pub fn extract(text: &str) -> Listing {
    let doc = Html::parse_document(text);
    Listing {
        seller: select_attr(&doc, &SELLER, "aria-label")
            .and_then(|label| label.rsplit(NBSP).next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty()),
        feedback: capture(&FEEDBACK, text).and_then(|raw| parse_feedback(&raw)),
        score: select_text(&doc, &SCORE)
            .and_then(|text| text.split(NBSP).next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty()),
        item_number: select_text(&doc, &ITEM_NUMBER),
        free_shipping: select_text(&doc, &SHIPPING).map(|s| s.to_uppercase().contains("FREE")),
        part_number: capture(&MPN, text),
        price: first_price(&doc, &[&PRICE, &SALE_PRICE]),
    }
}

fn parse_feedback(raw: &str) -> Option<String> {
    match raw.replace(',', "").parse::<i64>() {
        Ok(count) => Some(group_thousands(count)),
        Err(_) => {
            warn!("Unparseable feedback count: {:?}", raw);
            None
        }
    }
}

#[async_trait::async_trait]
impl StoreAdapter for Ebay {
    async fn run(&self, url: &str) -> Result<AdapterOutput, FetchError> {
        let Some(listing_url) = self.listing_url(url).await? else {
            return Ok(AdapterOutput::default());
        };

        let text = self.fetcher.fetch(&Self::request(&listing_url)).await?;
        let listing = extract(&text);

        let markdown = if listing.is_markdown_worthy() {
            Some(templates::ebay::build_markdown(&listing))
        } else {
            info!("Seller details incomplete, skipping comment");
            None
        };

        Ok(AdapterOutput { details: listing.details(), markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fetcher::testing::StubFetcher;

    const LISTING: &str = "<html><body>\
        <a id=\"mbgLink\" aria-label=\"Member ID:\u{a0}techdeals4u\" href=\"#\">techdeals4u</a>\
        <span class=\"mbg-l\"><a title=\"feedback score: 12345\" href=\"#\">12345</a></span>\
        <div id=\"si-fb\">99.2%\u{a0}Positive feedback</div>\
        <div id=\"descItemNumber\">273199602622</div>\
        <span id=\"fshippingCost\"><span>FREE</span></span>\
        <h2 itemprop=\"mpn\">YD270XBGAFBOX</h2>\
        <span id=\"prcIsum\" itemprop=\"price\">US $284.99</span>\
        </body></html>";

    #[test]
    fn extracts_full_listing() {
        let listing = extract(LISTING);
        assert_eq!(
            listing,
            Listing {
                seller: Some("techdeals4u".into()),
                feedback: Some("12,345".into()),
                score: Some("99.2%".into()),
                item_number: Some("273199602622".into()),
                free_shipping: Some(true),
                part_number: Some("YD270XBGAFBOX".into()),
                price: Some(285),
            }
        );
        assert!(listing.is_markdown_worthy());
    }

    #[test]
    fn sale_price_used_when_buy_it_now_missing() {
        let listing = extract(r#"<span id="mm-saleDscPrc">US $19.49</span>"#);
        assert_eq!(listing.price, Some(19));
        assert!(!listing.is_markdown_worthy());
    }

    #[test]
    fn catalogue_page_resolves_to_item_url() {
        let text = r#"<li class="item" data-itemid="182641297525" data-x="1">"#;
        assert_eq!(
            item_url_from_catalogue(text).as_deref(),
            Some("https://www.ebay.com/itm/182641297525")
        );
        assert_eq!(item_url_from_catalogue("<html></html>"), None);
    }

    #[tokio::test]
    async fn incomplete_seller_details_suppress_comment() {
        let url = "https://www.ebay.com/itm/Landmann-City-Lights-Fire-Pit/182641297525";
        let html = r#"<h2 itemprop="mpn">28345</h2><span id="prcIsum">US $89.00</span>"#;
        let fetcher = Arc::new(StubFetcher::default().page(url, html));
        let out = Ebay::new(fetcher).run(url).await.unwrap();
        assert_eq!(out.details, ProductDetails { part_number: Some("28345".into()), price: Some(89) });
        assert_eq!(out.markdown, None);
    }

    #[tokio::test]
    async fn catalogue_link_follows_featured_listing() {
        let catalogue = "https://www.ebay.com/p/AMD-Ryzen-7-2700X/240556937";
        let item = "https://www.ebay.com/itm/273199602622";
        let fetcher = Arc::new(
            StubFetcher::default()
                .page(catalogue, r#"<div data-itemid="273199602622"></div>"#)
                .page(item, LISTING),
        );
        let out = Ebay::new(fetcher.clone()).run(catalogue).await.unwrap();
        assert_eq!(fetcher.requested_urls(), vec![catalogue.to_string(), item.to_string()]);
        assert!(out.markdown.unwrap().contains("Seller|[techdeals4u]"));
    }

    #[tokio::test]
    async fn catalogue_without_listing_is_empty() {
        let catalogue = "https://www.ebay.com/p/Sold-Out/1";
        let fetcher = Arc::new(StubFetcher::default().page(catalogue, "<html></html>"));
        let out = Ebay::new(fetcher.clone()).run(catalogue).await.unwrap();
        assert_eq!(out, AdapterOutput::default());
        assert_eq!(fetcher.requested_urls().len(), 1);
    }
}
