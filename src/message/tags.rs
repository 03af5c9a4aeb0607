//! IRCv3 message tags: parsing, escaping, and the tag list itself.

use std::fmt::{Result as FmtResult, Write};

/// A single message tag: key and optional value (already unescaped).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag(pub String, pub Option<String>);

/// Escape a tag value for serialization per the message-tags spec.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Unescape a tag value from wire format.
///
/// `\` followed by a character outside the escape table yields that
/// character; a trailing lone `\` is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Parse the raw tag section (between `@` and the first space) into a tag
/// list. Keys are unique; when a key repeats, the last value wins.
pub fn parse_tags(raw: &str) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for pair in raw.split(';') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.find('=') {
            Some(eq) => (&pair[..eq], Some(unescape_tag_value(&pair[eq + 1..]))),
            None => (pair, None),
        };
        if let Some(existing) = tags.iter_mut().find(|t| t.0 == key) {
            existing.1 = value;
        } else {
            tags.push(Tag(key.to_owned(), value));
        }
    }
    tags
}

/// Serialize a tag list back into the wire form (without the leading `@`).
pub fn format_tags(f: &mut dyn Write, tags: &[Tag]) -> FmtResult {
    for (i, Tag(key, value)) in tags.iter().enumerate() {
        if i > 0 {
            f.write_char(';')?;
        }
        f.write_str(key)?;
        if let Some(value) = value {
            f.write_char('=')?;
            escape_tag_value(f, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_table() {
        assert_eq!(unescape_tag_value(r"a\:b\s\\\r\n"), "a;b \\\r\n");
        assert_eq!(unescape_tag_value(r"\x"), "x");
        assert_eq!(unescape_tag_value("trailing\\"), "trailing");
    }

    #[test]
    fn test_escape_round_trip() {
        let value = "a;b \\\r\nc";
        let mut escaped = String::new();
        escape_tag_value(&mut escaped, value).unwrap();
        assert_eq!(unescape_tag_value(&escaped), value);
    }

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("time=2023-01-01T00:00:00Z;msgid=abc;flag");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], Tag("time".into(), Some("2023-01-01T00:00:00Z".into())));
        assert_eq!(tags[1], Tag("msgid".into(), Some("abc".into())));
        assert_eq!(tags[2], Tag("flag".into(), None));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let tags = parse_tags("k=1;k=2");
        assert_eq!(tags, vec![Tag("k".into(), Some("2".into()))]);
    }

    #[test]
    fn test_format_tags() {
        let tags = vec![
            Tag("time".into(), Some("x y".into())),
            Tag("flag".into(), None),
        ];
        let mut out = String::new();
        format_tags(&mut out, &tags).unwrap();
        assert_eq!(out, r"time=x\sy;flag");
    }
}
