use std::fmt::{self, Display, Write};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Displays its text with the five HTML-significant characters escaped.
pub struct Escaped<'a>(pub &'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '&' => f.write_str("&amp;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#x27;")?,
                other => f.write_char(other)?,
            }
        }
        Ok(())
    }
}

pub fn escape(value: &str) -> String {
    Escaped(value).to_string()
}

/// Escapes `text` and turns its line breaks into `<br>`.
pub fn linebreaksbr(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len());
    for (index, line) in normalized.split('\n').enumerate() {
        if index > 0 {
            out.push_str("<br>");
        }
        let _ = write!(out, "{}", Escaped(line));
    }
    out
}

pub fn datetime_attr(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

/// `14 October 2026`
pub fn display_date(ts: OffsetDateTime) -> String {
    format!("{} {} {}", ts.day(), ts.month(), ts.year())
}
