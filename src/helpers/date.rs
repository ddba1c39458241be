//! Date helper functions
//!
//! Publication dates travel through the pipeline as the store's opaque
//! ISO-8601 strings and are only turned into human-readable text here, at
//! render time.

use chrono::{DateTime, FixedOffset, Locale, Utc};
use chrono_tz::Tz;

/// Parse a store timestamp (`2021-03-15T19:25:28+0000` or RFC 3339)
pub fn parse_publication_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

/// Format a store timestamp with a Moment.js-compatible format string
///
/// Month and weekday names follow `language`; the wall clock follows
/// `timezone` (UTC when the zone is empty or unknown).
///
/// # Examples
/// ```ignore
/// format_publication_date("2021-03-15T19:25:28+0000", "DD MMM YYYY", "pt-BR", "America/Sao_Paulo")
/// // -> Some("15 mar 2021")
/// ```
pub fn format_publication_date(
    value: &str,
    format: &str,
    language: &str,
    timezone: &str,
) -> Option<String> {
    let date = parse_publication_date(value)?;
    let chrono_format = moment_to_chrono_format(format);
    let locale = locale_for(language);

    let formatted = match timezone.parse::<Tz>() {
        Ok(tz) => date
            .with_timezone(&tz)
            .format_localized(&chrono_format, locale)
            .to_string(),
        Err(_) => date
            .with_timezone(&Utc)
            .format_localized(&chrono_format, locale)
            .to_string(),
    };

    Some(formatted)
}

/// Format a store timestamp in ISO 8601 / XML format (for `datetime` attributes)
pub fn date_xml(value: &str) -> Option<String> {
    parse_publication_date(value).map(|d| d.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
}

/// Map a site language tag to a chrono locale
pub fn locale_for(language: &str) -> Locale {
    match language.replace('-', "_").as_str() {
        "pt" | "pt_BR" => Locale::pt_BR,
        "pt_PT" => Locale::pt_PT,
        "es" | "es_ES" => Locale::es_ES,
        "fr" | "fr_FR" => Locale::fr_FR,
        "de" | "de_DE" => Locale::de_DE,
        _ => Locale::en_US,
    }
}

/// Convert Moment.js format to chrono format
///
/// Text inside `[...]` is copied verbatim.
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each category
    const TOKENS: [(&str, &str); 15] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
        ("SSS", "%3f"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            let literal = &rest[1..];
            let end = literal.find(']').unwrap_or(literal.len());
            result.push_str(&literal[..end].replace('%', "%%"));
            rest = literal.get(end + 1..).unwrap_or("");
            continue;
        }

        match TOKENS.iter().find(|(from, _)| rest.starts_with(from)) {
            Some((from, to)) => {
                result.push_str(to);
                rest = &rest[from.len()..];
            }
            None => {
                if c == '%' {
                    result.push('%');
                }
                result.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    result
}
