use chrono::{DateTime, Utc};

/// Sequential command tags: a001, a002, ...
pub struct TagGen {
    next: u32,
}

impl TagGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> String {
        let tag = format!("a{:03}", self.next);
        self.next += 1;
        tag
    }
}

impl Default for TagGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates raw socket reads and yields complete CRLF-terminated
/// lines. Partial reads stay buffered until their terminator arrives.
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { pending: String::new() }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
    }

    pub fn pop_line(&mut self) -> Option<String> {
        let idx = self.pending.find('\n')?;
        let mut line: String = self.pending.drain(..=idx).collect();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Ok,
    No,
    Bad,
}

/// A command's full response: the tagged completion plus every untagged
/// line that arrived before it.
#[derive(Debug)]
pub struct TaggedResponse {
    pub status: CompletionStatus,
    pub detail: String,
    pub untagged: Vec<String>,
}

/// Parse `<tag> OK|NO|BAD ...`; None when the line belongs to a
/// different exchange or is untagged data.
pub fn parse_completion(line: &str, tag: &str) -> Option<(CompletionStatus, String)> {
    let rest = line.strip_prefix(tag)?.strip_prefix(' ')?;
    let (word, detail) = match rest.split_once(' ') {
        Some((w, d)) => (w, d.to_string()),
        None => (rest, String::new()),
    };
    let status = match word {
        "OK" => CompletionStatus::Ok,
        "NO" => CompletionStatus::No,
        "BAD" => CompletionStatus::Bad,
        _ => return None,
    };
    Some((status, detail))
}

/// Message sequence numbers from an untagged `* SEARCH 1 2 3` line.
pub fn parse_search_ids(untagged: &[String]) -> Vec<u32> {
    for line in untagged {
        if let Some(rest) = line.strip_prefix("* SEARCH") {
            return rest
                .split_whitespace()
                .filter_map(|w| w.parse().ok())
                .collect();
        }
    }
    Vec::new()
}

/// Body text from a FETCH response: everything between the `* <n> FETCH`
/// header line and the closing paren line, with the size literal already
/// consumed as part of the header.
pub fn body_from_fetch(untagged: &[String]) -> Option<String> {
    let start = untagged
        .iter()
        .position(|l| l.starts_with("* ") && l.contains("FETCH"))?;

    let mut lines: &[String] = &untagged[start + 1..];
    if let Some(last) = lines.last() {
        if last.trim() == ")" {
            lines = &lines[..lines.len() - 1];
        }
    }
    Some(lines.join("\n"))
}

/// Whether the peer advertised the in-band transport upgrade.
pub fn advertises_starttls(lines: &[String]) -> bool {
    lines.iter().any(|l| l.to_ascii_uppercase().contains("STARTTLS"))
}

/// Date in the protocol's SEARCH SINCE format, e.g. 06-Aug-2026.
pub fn search_date(when: DateTime<Utc>) -> String {
    when.format("%d-%b-%Y").to_string()
}

/// Quote a string argument, escaping backslashes and double quotes.
pub fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tags_are_sequential() {
        let mut tags = TagGen::new();
        assert_eq!(tags.next(), "a001");
        assert_eq!(tags.next(), "a002");
    }

    #[test]
    fn line_buffer_holds_partial_reads() {
        let mut buf = LineBuffer::new();
        buf.push(b"* OK Dove");
        assert_eq!(buf.pop_line(), None);
        buf.push(b"cot ready\r\n* CAPA");
        assert_eq!(buf.pop_line(), Some("* OK Dovecot ready".to_string()));
        assert_eq!(buf.pop_line(), None);
        buf.push(b"BILITY IMAP4rev1 STARTTLS\r\n");
        assert_eq!(buf.pop_line(), Some("* CAPABILITY IMAP4rev1 STARTTLS".to_string()));
    }

    #[test]
    fn completion_parsing() {
        assert_eq!(
            parse_completion("a001 OK LOGIN completed", "a001"),
            Some((CompletionStatus::Ok, "LOGIN completed".to_string()))
        );
        assert_eq!(
            parse_completion("a002 NO invalid credentials", "a002"),
            Some((CompletionStatus::No, "invalid credentials".to_string()))
        );
        assert_eq!(parse_completion("* 3 EXISTS", "a001"), None);
        assert_eq!(parse_completion("a001 OK done", "a002"), None);
        // A tag prefix of a longer tag must not match.
        assert_eq!(parse_completion("a0010 OK done", "a001"), None);
    }

    #[test]
    fn search_ids_parse() {
        let lines = vec!["* SEARCH 4 11 23".to_string()];
        assert_eq!(parse_search_ids(&lines), vec![4, 11, 23]);
        assert!(parse_search_ids(&["* SEARCH".to_string()]).is_empty());
        assert!(parse_search_ids(&[]).is_empty());
    }

    #[test]
    fn fetch_body_extraction() {
        let lines = vec![
            "* 23 FETCH (BODY[TEXT] {48}".to_string(),
            "Hello,".to_string(),
            "Your code is: 1234".to_string(),
            ")".to_string(),
        ];
        let body = body_from_fetch(&lines).unwrap();
        assert!(body.contains("Your code is: 1234"));
        assert!(!body.contains("FETCH"));
        assert!(!body.ends_with(')'));
    }

    #[test]
    fn starttls_detection() {
        assert!(advertises_starttls(&["* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN".to_string()]));
        assert!(!advertises_starttls(&["* CAPABILITY IMAP4rev1 AUTH=PLAIN".to_string()]));
    }

    #[test]
    fn search_date_format() {
        let when = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        assert_eq!(search_date(when), "06-Aug-2026");
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
