use crate::model::ProductDetails;
use crate::stores::microcenter::LocationStock;
use crate::templates::{escape_cell, footer, header, LINE_SPLIT};

/// Header, per-location stock table and footer.
pub fn build_markdown(
    details: &ProductDetails,
    store_only: Option<bool>,
    locations: &[LocationStock],
    url: &str,
) -> String {
    [
        header(details, store_only),
        inventory_section(locations, url),
        footer(details.part_number.as_deref()),
    ]
    .join(LINE_SPLIT)
}

fn inventory_section(locations: &[LocationStock], url: &str) -> String {
    if locations.is_empty() {
        return "No inventory found".to_string();
    }

    let with_open_box = locations.iter().any(|l| l.open_box.is_some());
    let mut out = if with_open_box {
        String::from("Location|Quantity|Open Box\n:-|-:|-:\n")
    } else {
        String::from("Location|Quantity\n:-|-:\n")
    };

    let rows: Vec<String> = locations
        .iter()
        .map(|l| {
            let link = format!("[{}]({})", escape_cell(&l.name), location_url(url, &l.id));
            let quantity = l.quantity.as_deref().map(escape_cell).unwrap_or_default();
            if with_open_box {
                let open_box = l.open_box.as_deref().map(escape_cell).unwrap_or_default();
                format!("{}|{}|{}", link, quantity, open_box)
            } else {
                format!("{}|{}", link, quantity)
            }
        })
        .collect();
    out.push_str(&rows.join("\n"));
    out
}

fn location_url(url: &str, store_id: &str) -> String {
    let sep = if url.ends_with('?') || url.ends_with('&') {
        ""
    } else if url.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}storeID={}", url, sep, store_id)
}
