use serde::{Deserialize, Serialize};

/// A shop, hotel or article scraped from an external source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub url: String,
}

impl Listing {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }

    /// Slack link markup: `<url|title>`.
    pub fn to_slack_link(&self) -> String {
        format!("<{}|{}>", self.url, self.title)
    }
}

pub fn link_lines(listings: &[Listing]) -> String {
    listings.iter().map(Listing::to_slack_link).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::{link_lines, Listing};

    #[test]
    fn renders_slack_link_markup() {
        let listing = Listing::new("新着記事", "https://example.com/a");
        assert_eq!(listing.to_slack_link(), "<https://example.com/a|新着記事>");
    }

    #[test]
    fn joins_links_with_newlines() {
        let lines = link_lines(&[
            Listing::new("one", "https://example.com/1"),
            Listing::new("two", "https://example.com/2"),
        ]);
        assert_eq!(lines, "<https://example.com/1|one>\n<https://example.com/2|two>");
        assert_eq!(link_lines(&[]), "");
    }
}
