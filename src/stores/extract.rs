// Shared extraction helpers. Every lookup returns None on a miss and logs why.
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// First capture group of `pattern` in `text`, trimmed. Empty captures count as a miss.
pub fn capture(pattern: &Regex, text: &str) -> Option<String> {
    match pattern.captures(text).and_then(|c| c.get(1)) {
        Some(m) => {
            let value = m.as_str().trim();
            if value.is_empty() {
                debug!("Empty match for pattern {}", pattern.as_str());
                None
            } else {
                Some(value.to_string())
            }
        }
        None => {
            debug!("Pattern not found: {}", pattern.as_str());
            None
        }
    }
}

/// The `nth` element matching `selector`.
pub fn select_nth<'a>(doc: &'a Html, selector: &Selector, nth: usize) -> Option<ElementRef<'a>> {
    let found = doc.select(selector).nth(nth);
    if found.is_none() {
        debug!("Selector not found: {:?} (index {})", selector, nth);
    }
    found
}

/// Trimmed text of the first element matching `selector`.
pub fn select_text(doc: &Html, selector: &Selector) -> Option<String> {
    select_nth(doc, selector, 0).and_then(element_text)
}

/// Attribute value of the first element matching `selector`.
pub fn select_attr(doc: &Html, selector: &Selector, attr: &str) -> Option<String> {
    let element = select_nth(doc, selector, 0)?;
    let value = element.value().attr(attr);
    if value.is_none() {
        debug!("Attribute {} missing on {:?}", attr, selector);
    }
    value.map(str::to_string)
}

pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Normalizes a raw price token to whole currency units.
///
/// Currency symbols, whitespace, thousands commas and a leading alphabetic
/// currency code (`US $`, `USD`, `C$`) are dropped; the remainder must parse as
/// a finite float. Rounding is half away from zero.
pub fn parse_price(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '¥' | ','))
        .collect();
    let cleaned = cleaned.trim_start_matches(|c: char| c.is_ascii_uppercase());

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value.round() as i64),
        _ => {
            warn!("Unparseable price: {:?}", raw);
            None
        }
    }
}

/// Tries each selector in order and returns the first price that parses.
pub fn first_price(doc: &Html, selectors: &[&Selector]) -> Option<i64> {
    selectors
        .iter()
        .filter_map(|sel| select_text(doc, sel))
        .find_map(|raw| parse_price(&raw))
}
