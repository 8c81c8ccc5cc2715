//! Selector candidate lists for the booking site's page structure.
//! Ordered most-specific-first; lookups stop at the first hit. The site
//! ships several layout variants, hence the breadth per field.

use courtbot_webdriver::Locator;

pub fn sport_tile(sport: &str) -> Vec<Locator> {
    let lower = sport.to_lowercase();
    vec![
        Locator::css(format!("[data-sport='{}']", lower)),
        Locator::xpath(format!(
            "//button[contains(normalize-space(.), '{}')] | //a[contains(normalize-space(.), '{}')]",
            sport, sport
        )),
        Locator::text(sport),
    ]
}

pub fn group_size_input() -> Vec<Locator> {
    vec![
        Locator::css("input[name='participants']"),
        Locator::css("input[name*='persons']"),
        Locator::css("input[name*='group']"),
        Locator::css("select[name*='participants']"),
        Locator::css("input[type='number']"),
    ]
}

pub fn next_button() -> Vec<Locator> {
    vec![
        Locator::css("button[type='submit']"),
        Locator::css(".btn-next"),
        Locator::text("Next"),
        Locator::text("Continue"),
    ]
}

pub fn confirm_button() -> Vec<Locator> {
    vec![
        Locator::css("button.confirm"),
        Locator::css("button[type='submit']"),
        Locator::text("Confirm"),
        Locator::text("Book"),
    ]
}

pub fn slot_list() -> Vec<Locator> {
    vec![
        Locator::css(".time-slot"),
        Locator::css("[data-slot]"),
        Locator::css(".timeslot"),
        Locator::xpath("//*[contains(@class, 'slot')]"),
    ]
}

pub fn time_slot(day: &str, time: &str) -> Vec<Locator> {
    vec![
        Locator::css(format!("[data-day='{}'] [data-time='{}']", day, time)),
        Locator::xpath(format!(
            "//*[contains(normalize-space(.), '{}')]/descendant-or-self::*[contains(normalize-space(.), '{}')][self::button or self::a or self::td]",
            day, time
        )),
        Locator::text(time),
    ]
}

pub fn name_input() -> Vec<Locator> {
    vec![
        Locator::css("input[name='name']"),
        Locator::css("input[name*='fullname']"),
        Locator::css("input[autocomplete='name']"),
    ]
}

pub fn phone_input() -> Vec<Locator> {
    vec![
        Locator::css("input[name='phone']"),
        Locator::css("input[type='tel']"),
        Locator::css("input[name*='telefoon']"),
    ]
}

pub fn email_input() -> Vec<Locator> {
    vec![
        Locator::css("input[name='email']"),
        Locator::css("input[type='email']"),
    ]
}

pub fn verification_input() -> Vec<Locator> {
    vec![
        Locator::css("input[name*='verification']"),
        Locator::css("input[name*='code']"),
        Locator::css("#verificationCode"),
        Locator::css("input[autocomplete='one-time-code']"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sport_candidates_are_ordered_specific_first() {
        let candidates = sport_tile("Badminton");
        assert!(matches!(candidates[0], Locator::Css(_)));
        assert!(matches!(candidates.last().unwrap(), Locator::TextContains(_)));
    }

    #[test]
    fn every_field_has_candidates() {
        assert!(!group_size_input().is_empty());
        assert!(!next_button().is_empty());
        assert!(!confirm_button().is_empty());
        assert!(!slot_list().is_empty());
        assert!(!time_slot("Tuesday", "8:30 AM").is_empty());
        assert!(!name_input().is_empty());
        assert!(!phone_input().is_empty());
        assert!(!email_input().is_empty());
        assert!(!verification_input().is_empty());
    }
}
