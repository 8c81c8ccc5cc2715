/// One element-lookup strategy. Lookups walk an ordered list of these and
/// stop at the first hit; the list order encodes "most specific first".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// Any element whose visible text contains the given string.
    TextContains(String),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::XPath(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Locator::TextContains(s.into())
    }

    /// W3C `{using, value}` strategy pair for the element-find endpoint.
    pub fn strategy(&self) -> (&'static str, String) {
        match self {
            Locator::Css(v) => ("css selector", v.clone()),
            Locator::XPath(v) => ("xpath", v.clone()),
            Locator::TextContains(text) => (
                "xpath",
                format!(
                    "//*[contains(normalize-space(.), {})][not(.//*[contains(normalize-space(.), {})])]",
                    xpath_literal(text),
                    xpath_literal(text)
                ),
            ),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::TextContains(v) => write!(f, "text~={}", v),
        }
    }
}

/// Quote a string as an XPath literal. XPath 1.0 has no escape syntax, so
/// strings containing both quote kinds need a concat() split.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_strategy_pair() {
        let (using, value) = Locator::css("#submit").strategy();
        assert_eq!(using, "css selector");
        assert_eq!(value, "#submit");
    }

    #[test]
    fn text_containment_becomes_xpath() {
        let (using, value) = Locator::text("Badminton").strategy();
        assert_eq!(using, "xpath");
        assert!(value.contains("contains(normalize-space(.), 'Badminton')"));
    }

    #[test]
    fn xpath_literal_handles_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert!(xpath_literal("a'b\"c").starts_with("concat("));
    }
}
