//! # Template Tokens
//!
//! Scans string parameters for `{name}` placeholders.
//!
//! - `{name}` and `{name:spec}` are tokens; `name` is `[A-Za-z0-9_]+`.
//! - `{{ ... }}` is an escape reserved for secret templating and is never
//!   a token, whatever it contains.
//! - Anything else involving a brace (`{}`, `{a b}`, an unclosed `{`, a
//!   stray `}`) is reported as [`Malformed`] instead of failing.

/// A placeholder found in a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Placeholder name without braces or format spec.
    pub name: &'a str,
    /// Byte offset of the opening brace.
    pub offset: usize,
}

/// A brace sequence that is neither a token nor an escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    /// Byte offset where the problem starts.
    pub offset: usize,
    /// The offending text.
    pub fragment: String,
    /// What is wrong with it.
    pub reason: &'static str,
}

/// Tokens and malformed sequences found in one string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenScan<'a> {
    /// Placeholders in order of appearance.
    pub tokens: Vec<Token<'a>>,
    /// Malformed brace sequences in order of appearance.
    pub malformed: Vec<Malformed>,
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Scan `text` for tokens.
pub fn scan_tokens(text: &str) -> TokenScan<'_> {
    let mut scan = TokenScan::default();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => match text[i + 2..].find("}}") {
                Some(end) => i += 2 + end + 2,
                None => {
                    scan.malformed.push(Malformed {
                        offset: i,
                        fragment: text[i..].to_string(),
                        reason: "escaped placeholder is never closed with '}}'",
                    });
                    break;
                }
            },
            b'{' => {
                let body_start = i + 1;
                let close = text[body_start..].find(['{', '}']).map(|n| body_start + n);
                match close {
                    Some(end) if bytes[end] == b'}' => {
                        let body = &text[body_start..end];
                        let name = body.split_once(':').map_or(body, |(name, _)| name);
                        if is_name(name) {
                            scan.tokens.push(Token { name, offset: i });
                        } else {
                            scan.malformed.push(Malformed {
                                offset: i,
                                fragment: text[i..=end].to_string(),
                                reason: if body.is_empty() {
                                    "placeholder is empty"
                                } else {
                                    "placeholder name must contain only letters, digits, and underscores"
                                },
                            });
                        }
                        i = end + 1;
                    }
                    Some(end) => {
                        scan.malformed.push(Malformed {
                            offset: i,
                            fragment: text[i..end].to_string(),
                            reason: "'{' is opened again before the placeholder is closed",
                        });
                        i = end;
                    }
                    None => {
                        scan.malformed.push(Malformed {
                            offset: i,
                            fragment: text[i..].to_string(),
                            reason: "'{' is never closed",
                        });
                        break;
                    }
                }
            }
            b'}' => {
                scan.malformed.push(Malformed {
                    offset: i,
                    fragment: "}".to_string(),
                    reason: "'}' has no matching '{'",
                });
                i += 1;
            }
            _ => i += 1,
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<&str> {
        scan_tokens(text).tokens.iter().map(|t| t.name).collect()
    }

    #[test]
    fn finds_tokens_in_order() {
        assert_eq!(names("{supplier_name}_{invoice_amount}.json"), vec!["supplier_name", "invoice_amount"]);
        assert_eq!(names("{nanoid}"), vec!["nanoid"]);
        assert_eq!(names("plain.json"), Vec::<&str>::new());
    }

    #[test]
    fn format_spec_is_not_part_of_the_name() {
        assert_eq!(names("{amount:.2f}"), vec!["amount"]);
    }

    #[test]
    fn escapes_are_skipped() {
        let scan = scan_tokens("{{secret.api_key}}/{id}");
        assert_eq!(scan.tokens.len(), 1);
        assert_eq!(scan.tokens[0].name, "id");
        assert_eq!(scan.tokens[0].offset, 19);
        assert!(scan.malformed.is_empty());
        assert!(scan_tokens("{{escaped}}").tokens.is_empty());
    }

    #[test]
    fn malformed_sequences_are_reported() {
        let cases = [
            ("{}", "placeholder is empty"),
            ("{a b}", "placeholder name must contain only letters, digits, and underscores"),
            ("prefix_{open", "'{' is never closed"),
            ("stray}", "'}' has no matching '{'"),
            ("{{never", "escaped placeholder is never closed with '}}'"),
        ];
        for (text, reason) in cases {
            let scan = scan_tokens(text);
            assert_eq!(scan.malformed.len(), 1, "{text}");
            assert_eq!(scan.malformed[0].reason, reason, "{text}");
        }
    }

    #[test]
    fn reopened_brace_recovers_at_the_inner_token() {
        let scan = scan_tokens("{a{b}");
        assert_eq!(scan.malformed.len(), 1);
        assert_eq!(scan.malformed[0].fragment, "{a");
        assert_eq!(names("{a{b}"), vec!["b"]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics(text in "\\PC{0,64}") {
                let _ = scan_tokens(&text);
            }

            #[test]
            fn escaped_names_never_become_tokens(
                name in "[A-Za-z0-9_]{1,12}",
                prefix in "[a-z_./]{0,8}",
                suffix in "[a-z_./]{0,8}",
            ) {
                let text = format!("{prefix}{{{{{name}}}}}{suffix}");
                let scan = scan_tokens(&text);
                prop_assert!(scan.tokens.is_empty());
                prop_assert!(scan.malformed.is_empty());
            }

            #[test]
            fn single_braced_names_are_found(name in "[A-Za-z0-9_]{1,12}") {
                let text = format!("out/{{{name}}}.json");
                let scan = scan_tokens(&text);
                prop_assert_eq!(scan.tokens.len(), 1);
                prop_assert_eq!(scan.tokens[0].name, name.as_str());
            }
        }
    }
}
