//! Doc comment tags.
//!
//! A tag starts with `@` at the beginning of a comment line (after the
//! leading `*`) or after whitespace, followed by an ASCII letter. Its text
//! runs up to the next tag. `@\w+` inside a pattern is therefore text, not a
//! tag, because the character after `@` is not a letter.

use crate::ast::Annotation;

/// Extract the tags of a `/** ... */` comment found at `base` in its file.
pub fn parse_tags(comment: &str, base: usize) -> Vec<Annotation> {
    let body_start = if comment.starts_with("/**") { 3 } else { 0 };
    let body_end = comment
        .strip_suffix("*/")
        .map(str::len)
        .unwrap_or(comment.len())
        .max(body_start);
    let body = &comment[body_start..body_end];

    let starts = tag_starts(body);
    let mut tags = Vec::with_capacity(starts.len());

    for (i, &at) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(body.len());
        let raw = &body[at + 1..end];
        let name_len = raw
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(raw.len());
        let (name, rest) = raw.split_at(name_len);
        tags.push(Annotation {
            tag: name.to_string(),
            text: clean_text(rest),
            offset: base + body_start + at,
        });
    }

    tags
}

/// Byte positions of `@` characters that begin a tag.
fn tag_starts(body: &str) -> Vec<usize> {
    let bytes = body.as_bytes();
    let mut starts = Vec::new();
    // Only whitespace and the leading `*` seen so far on this line.
    let mut line_prefix = true;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => {
                line_prefix = true;
                continue;
            }
            b'@' => {
                let prev_ok = line_prefix || i == 0 || bytes[i - 1].is_ascii_whitespace();
                let next_ok = bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic);
                if prev_ok && next_ok {
                    starts.push(i);
                }
            }
            b'*' if line_prefix => continue,
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            line_prefix = false;
        }
    }

    starts
}

fn clean_text(raw: &str) -> Option<String> {
    let text = raw
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(comment: &str) -> Vec<(String, Option<String>)> {
        parse_tags(comment, 0)
            .into_iter()
            .map(|a| (a.tag, a.text))
            .collect()
    }

    #[test]
    fn test_single_line_tags() {
        assert_eq!(
            tags(r"/** @unique sub-value  @pattern ^\S+$ */"),
            vec![
                ("unique".to_string(), Some("sub-value".to_string())),
                ("pattern".to_string(), Some(r"^\S+$".to_string())),
            ]
        );
    }

    #[test]
    fn test_at_inside_pattern_is_text() {
        assert_eq!(
            tags("/**\n * @pattern @\\w+\n */"),
            vec![("pattern".to_string(), Some("@\\w+".to_string()))]
        );
    }

    #[test]
    fn test_tag_without_text() {
        assert_eq!(tags("/** @pattern */"), vec![("pattern".to_string(), None)]);
        assert_eq!(tags("/** @unique */"), vec![("unique".to_string(), None)]);
    }

    #[test]
    fn test_description_is_not_a_tag() {
        assert_eq!(
            tags("/**\n * The user's mail, e.g. me@example.com\n * @uuid 4\n */"),
            vec![("uuid".to_string(), Some("4".to_string()))]
        );
    }

    #[test]
    fn test_offsets_point_at_the_at_sign() {
        let comment = "/** @a x @b */";
        let found = parse_tags(comment, 100);
        assert_eq!(found[0].offset, 100 + comment.find("@a").unwrap_or_default());
        assert_eq!(found[1].offset, 100 + comment.find("@b").unwrap_or_default());
    }
}
