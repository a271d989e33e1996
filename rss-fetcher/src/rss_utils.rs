//! Text and date helpers shared by the feed parser

/// Best-effort markup cleaning for titles and descriptions.
///
/// Not an HTML decoder: tags are stripped with a plain
/// `<...>` pattern and only six named entities are replaced. Numeric
/// references and any other named entity (`&#39;`, `&eacute;`, ...) are left
/// exactly as they appear.
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());
    static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    static HREF_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"href=["'](https?://[^"']+)["']"#).unwrap());

    const ENTITIES: [(&str, &str); 6] = [
        ("&nbsp;", " "),
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&apos;", "'"),
    ];

    fn clean_once(input: &str) -> String {
        let mut text = TAG_RE.replace_all(input, "").into_owned();
        for (entity, literal) in ENTITIES {
            text = text.replace(entity, literal);
        }
        WS_RE.replace_all(&text, " ").trim().to_string()
    }

    /// Strip tags, replace the six supported entities, collapse whitespace.
    ///
    /// Decoding `&lt;b&gt;` can reveal a new tag, so the pass is repeated until
    /// the output is stable. Every pass that changes the text after the first
    /// one makes it strictly shorter, so this terminates.
    ///
    /// Known loss: escaped comparison signs look like a tag once decoded, so
    /// `5 &lt; 6 and 7 &gt; 3` cleans to `5 3`. Doubly escaped markup such as
    /// `&amp;lt;b&amp;gt;` is removed the same way.
    pub fn clean(input: &str) -> String {
        let mut current = clean_once(input);
        loop {
            let next = clean_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// First absolute `href="http(s)://..."` target inside an HTML fragment.
    pub fn extract_href(html: &str) -> Option<String> {
        HREF_RE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

}

/// Date normalization for item ranking
pub mod date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use tracing::warn;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NormalizedDate {
        pub timestamp: DateTime<Utc>,
        /// True when nothing matched and `timestamp` is the time of the call.
        pub fallback: bool,
    }

    type Pattern = fn(&str) -> Option<DateTime<Utc>>;

    // Order matters: a string accepted by an earlier pattern never reaches a
    // later one.
    const PATTERNS: [Pattern; 6] = [
        rfc822_numeric_offset,
        iso8601_zulu,
        iso8601_offset,
        date_time,
        date_only,
        rfc2822_named_zone,
    ];

    // Day names are not checked against the date.
    fn without_weekday(s: &str) -> &str {
        match s.split_once(',') {
            Some((day, rest)) if !day.is_empty() && day.chars().all(|c| c.is_ascii_alphabetic()) => rest.trim_start(),
            _ => s,
        }
    }

    fn rfc822_numeric_offset(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(without_weekday(s), "%d %b %Y %H:%M:%S %z")
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn iso8601_zulu(s: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn iso8601_offset(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z")
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn date_time(s: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn date_only(s: &str) -> Option<DateTime<Utc>> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    // Catches "GMT", "EST" and friends that the numeric-offset form rejects.
    fn rfc2822_named_zone(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(without_weekday(s))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parse `raw` with the known patterns, or fall back to the current time.
    pub fn normalize(raw: &str) -> NormalizedDate {
        let trimmed = raw.trim();
        for pattern in PATTERNS {
            if let Some(timestamp) = pattern(trimmed) {
                return NormalizedDate { timestamp, fallback: false };
            }
        }

        warn!("DateParseFallback: unrecognised date {:?}, using current time", raw);
        NormalizedDate {
            timestamp: Utc::now(),
            fallback: true,
        }
    }

}
