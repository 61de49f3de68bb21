//! Small helpers over `scraper` shared by the page-scraping skills.

use erabee_core::{Listing, SkillError};
use scraper::{ElementRef, Html, Selector};

pub fn selector(origin: &str, css: &str) -> Result<Selector, SkillError> {
    Selector::parse(css)
        .map_err(|error| SkillError::parse(origin, format!("selector `{css}`: {error}")))
}

/// Concatenated text of an element and its descendants.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

pub fn first_in<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// First element of the document matching `css`, or a parse error naming it.
pub fn require_first<'a>(
    origin: &str,
    document: &'a Html,
    css: &str,
) -> Result<ElementRef<'a>, SkillError> {
    let selector = selector(origin, css)?;
    document
        .select(&selector)
        .next()
        .ok_or_else(|| SkillError::parse(origin, format!("no element matches `{css}`")))
}

pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|candidate| candidate == class)
}

/// The first anchor below `scope` as a listing; `href` is passed through
/// `make_url` so callers can absolutize it.
pub fn first_anchor<F>(scope: ElementRef<'_>, anchors: &Selector, make_url: F) -> Option<Listing>
where
    F: Fn(&str) -> String,
{
    let anchor = first_in(scope, anchors)?;
    let href = anchor.value().attr("href")?;
    Some(Listing::new(text_of(anchor), make_url(href)))
}
