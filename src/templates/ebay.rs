use crate::stores::ebay::Listing;
use crate::templates::{escape_cell, footer, LINE_SPLIT};

const SELLER_URL: &str = "https://www.ebay.com/usr/";
const ITEM_URL: &str = "https://www.ebay.com/itm/";

pub fn build_markdown(listing: &Listing) -> String {
    [detail_section(listing), footer(listing.part_number.as_deref())].join(LINE_SPLIT)
}

fn detail_section(listing: &Listing) -> String {
    let rows: [(&str, Option<String>); 7] = [
        (
            "Seller",
            listing.seller.as_ref().map(|s| format!("[{}]({}{})", escape_cell(s), SELLER_URL, s)),
        ),
        ("Seller Feedback", listing.feedback.clone()),
        ("Seller Score", listing.score.clone()),
        (
            "Ebay Item Number",
            listing.item_number.as_ref().map(|n| format!("[{}]({}{})", n, ITEM_URL, n)),
        ),
        ("Free Shipping", listing.free_shipping.map(|f| if f { "Yes" } else { "No" }.to_string())),
        ("MPN (probably)", listing.part_number.as_deref().map(escape_cell)),
        ("Price", listing.price.map(|p| p.to_string())),
    ];

    let body: Vec<String> = rows
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("{}|{}", key, v)))
        .collect();

    format!("Item|Notes\n:-:|:-:\n{}", body.join("\n"))
}
