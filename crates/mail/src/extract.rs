use regex::Regex;

/// Ordered extraction heuristics over a fetched body. Labeled patterns
/// ("code: NNNN", "verification code 123456") rank above bare digit
/// runs; results are deduplicated preserving that order.
pub fn extract_codes(body: &str) -> Vec<String> {
    let mut codes = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let patterns = [
        // Labeled: a code word within short reach of the digits.
        r"(?i)\bcode\b[^0-9\r\n]{0,24}([0-9]{4,8})",
        r"(?i)\b(?:pin|otp)\b[^0-9\r\n]{0,24}([0-9]{4,8})",
        // Bare numeric run, last resort.
        r"\b([0-9]{4,8})\b",
    ];

    for pattern in patterns {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };
        for caps in re.captures_iter(body) {
            if let Some(m) = caps.get(1) {
                let code = m.as_str().to_string();
                if seen.insert(code.clone()) {
                    codes.push(code);
                }
            }
        }
    }

    codes
}

/// The single code a flow should enter: the highest-priority match in
/// this body. The caller feeds bodies most-recent-message-first.
pub fn select_code(body: &str) -> Option<String> {
    extract_codes(body).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_pattern_beats_bare_scan() {
        let body = "Order #5678 received.\nYour code is: 1234\nThanks!";
        assert_eq!(select_code(body), Some("1234".to_string()));
    }

    #[test]
    fn bare_runs_found_without_label() {
        let body = "Use 987654 to continue.";
        assert_eq!(select_code(body), Some("987654".to_string()));
    }

    #[test]
    fn extraction_is_idempotent() {
        let body = "code: 1234, backup code: 5678, ref 1234";
        let first = extract_codes(body);
        let second = extract_codes(body);
        assert_eq!(first, second);
        // Dedup: 1234 appears once despite two occurrences.
        assert_eq!(first.iter().filter(|c| c.as_str() == "1234").count(), 1);
    }

    #[test]
    fn no_digits_yields_nothing() {
        assert_eq!(select_code("nothing to see here"), None);
        // Runs outside the 4-8 length band don't count.
        assert_eq!(select_code("call 123 or 123456789"), None);
    }

    #[test]
    fn otp_label_recognized() {
        let body = "id 9999 / your OTP 4321 expires soon";
        assert_eq!(select_code(body), Some("4321".to_string()));
    }
}
