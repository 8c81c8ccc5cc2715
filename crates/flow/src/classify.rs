//! Page-source heuristics: inline retry prompts, the verification
//! requirement, and classification of the post-submission page.

use scraper::Html;

/// Visible text content of a page, whitespace-normalized and lowercased.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text: Vec<&str> = document.root_element().text().collect();
    text.join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Inline indicator that the last click did not take and should be
/// re-issued. Distinct from the click call failing.
pub fn needs_retry(html: &str) -> bool {
    let text = visible_text(html);
    ["please retry", "please try again", "something went wrong, try again"]
        .iter()
        .any(|k| text.contains(k))
}

/// Text-level signal that the site wants an emailed code. The dedicated
/// input field check lives with the flow; this is the fallback.
pub fn verification_required(html: &str) -> bool {
    let text = visible_text(html);
    ["verification code", "verify your email", "code we sent", "enter the code"]
        .iter()
        .any(|k| text.contains(k))
}

#[derive(Debug, PartialEq, Eq)]
pub enum PageVerdict {
    Success,
    Failure(String),
    Ambiguous,
}

/// Classify the post-submission page. Failure signals are checked first:
/// sites render error banners on otherwise confirmation-shaped pages.
pub fn classify_result(html: &str) -> PageVerdict {
    let text = visible_text(html);

    let failures = [
        ("fully booked", "slot is fully booked"),
        ("not available", "slot no longer available"),
        ("booking failed", "booking failed"),
        ("reservation failed", "reservation failed"),
        ("invalid code", "verification code rejected"),
        ("session expired", "session expired"),
    ];
    for (needle, reason) in failures {
        if text.contains(needle) {
            return PageVerdict::Failure(reason.to_string());
        }
    }

    let successes = [
        "booking confirmed",
        "reservation confirmed",
        "successfully booked",
        "your reservation is complete",
        "confirmation number",
        "thank you for your booking",
    ];
    if successes.iter().any(|k| text.contains(k)) {
        return PageVerdict::Success;
    }

    PageVerdict::Ambiguous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_page_is_success() {
        let html = "<html><body><h1>Booking confirmed!</h1><p>See you Tuesday.</p></body></html>";
        assert_eq!(classify_result(html), PageVerdict::Success);
    }

    #[test]
    fn error_banner_beats_confirmation_copy() {
        let html = "<html><body><p>Booking confirmed</p>\
                    <div class='error'>Slot not available anymore</div></body></html>";
        assert!(matches!(classify_result(html), PageVerdict::Failure(_)));
    }

    #[test]
    fn unrelated_page_is_ambiguous() {
        let html = "<html><body><p>Welcome back.</p></body></html>";
        assert_eq!(classify_result(html), PageVerdict::Ambiguous);
    }

    #[test]
    fn retry_prompt_detected() {
        assert!(needs_retry("<body><span>Please try again</span></body>"));
        assert!(!needs_retry("<body><span>All good</span></body>"));
    }

    #[test]
    fn verification_text_detected() {
        assert!(verification_required("<body>Enter the code we sent to your email</body>"));
        assert!(!verification_required("<body>Pick a time slot</body>"));
    }

    #[test]
    fn visible_text_strips_markup() {
        let text = visible_text("<html><body><p>Hello <b>World</b></p><script>var x;</script></body></html>");
        assert!(text.contains("hello world"));
        assert!(!text.contains("<p>"));
    }
}
