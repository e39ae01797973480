// Comment rendering. Pure functions over already-extracted fields.

pub mod ebay;
pub mod microcenter;

use crate::model::ProductDetails;

pub(crate) const LINE_SPLIT: &str = "  \n\n";

const SEARCH_SITES: &[(&str, &str)] = &[
    ("Google", "https://www.google.com/search?q="),
    ("PCPP", "https://pcpartpicker.com/search/?q="),
    ("UserBench", "http://userbenchmark.com/Search?searchTerm="),
    ("Ebay", "https://www.ebay.com/sch/i.html?_nkw="),
    ("Amazon", "https://www.amazon.com/s/keywords="),
    ("Frys", "https://www.frys.com/search?query_string="),
    ("BestBuy", "https://www.bestbuy.com/site/searchpage.jsp?st="),
    ("Newegg", "https://www.newegg.com/Product/ProductList.aspx?Submit=ENE&DEPA=0&Description="),
];

const CONTACT: &str = "Please PM for errors";

/// `MPN|Price|Store Only` table; absent values render as empty cells.
pub fn header(details: &ProductDetails, store_only: Option<bool>) -> String {
    let mpn = details.part_number.as_deref().unwrap_or("");
    let price = details.price.map(|p| p.to_string()).unwrap_or_default();
    let store_only = match store_only {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "",
    };
    format!("MPN|Price|Store Only\n:-|-:|:-:\n{}|{}|{}", escape_cell(mpn), price, store_only)
}

/// Search links for the part number plus the contact line.
pub fn footer(part_number: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(mpn) = part_number {
        let query = mpn.split_whitespace().collect::<Vec<_>>().join("+");
        let links: Vec<String> = SEARCH_SITES
            .iter()
            .map(|(site, base)| format!("[{}]({}{})", site, base, query))
            .collect();
        out.push_str(&links.join("|"));
        out.push_str(LINE_SPLIT);
    }
    out.push_str(CONTACT);
    out
}

/// Comment for stores without a dedicated template. Needs a part number to be useful.
pub fn generic(details: &ProductDetails) -> Option<String> {
    details.part_number.as_ref()?;
    Some([header(details, None), footer(details.part_number.as_deref())].join(LINE_SPLIT))
}

/// Table cells cannot contain pipes or newlines.
pub(crate) fn escape_cell(value: &str) -> String {
    value.replace('|', "/").replace('\n', " ")
}
