//! Single-line syntax highlighting for code excerpts.
//!
//! A regex tokenizer over JavaScript/TypeScript source. Token classes are
//! applied in fixed order: comments and strings first, then numeric
//! literals, language keywords, type-system keywords, property-access
//! identifiers, and bare call identifiers. Each recognized token is masked
//! behind a paired sentinel (`\u{1}index\u{2}`) as soon as it is claimed, and
//! later patterns only run on the text between sentinels, so keyword and
//! number patterns can never match inside a string or comment. Sentinels are
//! substituted back with their styled text at the end.
//!
//! When colors are disabled the function is the identity.

use std::sync::OnceLock;

use regex::Regex;

use crate::style::{Style, ThemeColors};

const MASK_OPEN: char = '\u{1}';
const MASK_CLOSE: char = '\u{2}';

fn re_comment_or_string() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"/\*.*?\*/|/\*.*$|//.*$|"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#,
        )
        .expect("comment/string pattern is a compile-time constant and must be valid")
    })
}

fn re_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b",
        )
        .expect("number pattern is a compile-time constant and must be valid")
    })
}

fn re_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:async|await|break|case|catch|class|const|continue|debugger|default|delete|do|else|export|extends|false|finally|for|function|if|import|in|instanceof|let|new|null|of|return|static|super|switch|this|throw|true|try|typeof|undefined|var|void|while|with|yield)\b",
        )
        .expect("keyword pattern is a compile-time constant and must be valid")
    })
}

fn re_type_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:abstract|any|as|asserts|bigint|boolean|declare|enum|implements|infer|interface|is|keyof|namespace|never|number|object|readonly|satisfies|string|symbol|type|unknown)\b",
        )
        .expect("type keyword pattern is a compile-time constant and must be valid")
    })
}

fn re_property() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.([A-Za-z_$][A-Za-z0-9_$]*)")
            .expect("property pattern is a compile-time constant and must be valid")
    })
}

fn re_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_$][A-Za-z0-9_$]*)\s*\(")
            .expect("call pattern is a compile-time constant and must be valid")
    })
}

fn re_mask() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("\u{1}(\\d+)\u{2}")
            .expect("mask pattern is a compile-time constant and must be valid")
    })
}

/// Highlight one source line for terminal display.
///
/// With colors disabled the input is returned unchanged.
pub fn highlight_line(line: &str, theme: &ThemeColors, enabled: bool) -> String {
    if !enabled {
        return line.to_string();
    }

    // Stray control characters in the input would collide with the sentinel
    // encoding; drop them up front.
    let mut text: String = line
        .chars()
        .filter(|c| *c != MASK_OPEN && *c != MASK_CLOSE)
        .collect();

    let mut masker = Masker::default();

    let comment_style = Style::fg(theme.palette[8]).italic();
    let string_style = Style::fg(theme.palette[2]);
    text = masker.mask(&text, re_comment_or_string(), |tok| {
        if tok.starts_with('/') {
            comment_style
        } else {
            string_style
        }
    });
    text = masker.mask(&text, re_number(), |_| Style::fg(theme.palette[3]));
    text = masker.mask(&text, re_keyword(), |_| Style::fg(theme.palette[5]));
    text = masker.mask(&text, re_type_keyword(), |_| Style::fg(theme.palette[6]));
    text = masker.mask_group(&text, re_property(), Style::fg(theme.palette[12]));
    text = masker.mask_group(&text, re_call(), Style::fg(theme.palette[4]));

    masker.unmask(&text)
}

/// Claimed tokens and the machinery to splice them back in, styled.
#[derive(Default)]
struct Masker {
    tokens: Vec<(String, Style)>,
}

impl Masker {
    /// Replace every whole match of `re` (outside existing masks) with a
    /// sentinel placeholder.
    fn mask(&mut self, text: &str, re: &Regex, style_for: impl Fn(&str) -> Style) -> String {
        self.for_each_plain_span(text, |masker, span| {
            let mut out = String::new();
            let mut last = 0;
            for m in re.find_iter(span) {
                out.push_str(&span[last..m.start()]);
                out.push_str(&masker.claim(m.as_str(), style_for(m.as_str())));
                last = m.end();
            }
            out.push_str(&span[last..]);
            out
        })
    }

    /// Replace capture group 1 of every match of `re` (outside existing
    /// masks) with a sentinel placeholder, leaving the rest of the match
    /// as-is.
    fn mask_group(&mut self, text: &str, re: &Regex, style: Style) -> String {
        self.for_each_plain_span(text, |masker, span| {
            let mut out = String::new();
            let mut last = 0;
            for caps in re.captures_iter(span) {
                let Some(group) = caps.get(1) else { continue };
                out.push_str(&span[last..group.start()]);
                out.push_str(&masker.claim(group.as_str(), style));
                last = group.end();
            }
            out.push_str(&span[last..]);
            out
        })
    }

    /// Apply `f` only to the stretches of `text` between mask placeholders.
    fn for_each_plain_span(
        &mut self,
        text: &str,
        mut f: impl FnMut(&mut Self, &str) -> String,
    ) -> String {
        let mut out = String::new();
        let mut last = 0;
        // Collect placeholder ranges first; `f` may claim new tokens.
        let spans: Vec<(usize, usize)> = re_mask()
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        for (start, end) in spans {
            out.push_str(&f(self, &text[last..start]));
            out.push_str(&text[start..end]);
            last = end;
        }
        out.push_str(&f(self, &text[last..]));
        out
    }

    /// Record a token and return its placeholder.
    fn claim(&mut self, token: &str, style: Style) -> String {
        let idx = self.tokens.len();
        self.tokens.push((token.to_string(), style));
        format!("{MASK_OPEN}{idx}{MASK_CLOSE}")
    }

    /// Strip sentinels, substituting each placeholder with its styled token.
    fn unmask(&self, text: &str) -> String {
        re_mask()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let idx: usize = caps[1].parse().unwrap_or(0);
                match self.tokens.get(idx) {
                    Some((token, style)) => style.paint(token, true),
                    None => String::new(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> ThemeColors {
        ThemeColors::default()
    }

    fn painted(color: [u8; 3], text: &str) -> String {
        Style::fg(color).paint(text, true)
    }

    #[test]
    fn test_disabled_is_identity() {
        let line = "const x = foo.bar(42); // done";
        assert_eq!(highlight_line(line, &theme(), false), line);
    }

    #[test]
    fn test_plain_identifier_unchanged() {
        // No recognized tokens at all: output equals input even when enabled.
        assert_eq!(highlight_line("somename", &theme(), true), "somename");
    }

    #[test]
    fn test_keyword_colored() {
        let t = theme();
        let out = highlight_line("return x", &t, true);
        assert_eq!(out, format!("{} x", painted(t.palette[5], "return")));
    }

    #[test]
    fn test_number_colored() {
        let t = theme();
        let out = highlight_line("x = 0xFF", &t, true);
        assert_eq!(out, format!("x = {}", painted(t.palette[3], "0xFF")));
    }

    #[test]
    fn test_keyword_inside_string_not_matched() {
        let t = theme();
        let out = highlight_line(r#"x = "return 42""#, &t, true);
        let string_style = Style::fg(t.palette[2]);
        assert_eq!(
            out,
            format!("x = {}", string_style.paint("\"return 42\"", true))
        );
    }

    #[test]
    fn test_number_inside_comment_not_matched() {
        let t = theme();
        let out = highlight_line("x // retry 42 times", &t, true);
        let comment_style = Style::fg(t.palette[8]).italic();
        assert_eq!(
            out,
            format!("x {}", comment_style.paint("// retry 42 times", true))
        );
    }

    #[test]
    fn test_url_in_string_not_treated_as_comment() {
        let t = theme();
        let out = highlight_line(r#"fetch("http://x.test")"#, &t, true);
        // The string (including its //) is one green token.
        assert!(out.contains(&painted(t.palette[2], "\"http://x.test\"")));
        // `fetch` is a call identifier.
        assert!(out.contains(&painted(t.palette[4], "fetch")));
    }

    #[test]
    fn test_property_access_colored() {
        let t = theme();
        let out = highlight_line("a.length", &t, true);
        assert_eq!(out, format!("a.{}", painted(t.palette[12], "length")));
    }

    #[test]
    fn test_call_identifier_colored() {
        let t = theme();
        let out = highlight_line("doWork(x)", &t, true);
        assert_eq!(out, format!("{}(x)", painted(t.palette[4], "doWork")));
    }

    #[test]
    fn test_method_call_is_property_not_call() {
        let t = theme();
        // The property pass claims `bar` before the call pass runs.
        let out = highlight_line("foo.bar()", &t, true);
        assert_eq!(out, format!("foo.{}()", painted(t.palette[12], "bar")));
    }

    #[test]
    fn test_type_keyword_colored() {
        let t = theme();
        let out = highlight_line("x: string", &t, true);
        assert_eq!(out, format!("x: {}", painted(t.palette[6], "string")));
    }

    #[test]
    fn test_escaped_quote_stays_in_string() {
        let t = theme();
        let out = highlight_line(r#"s = "a\"b""#, &t, true);
        let string_style = Style::fg(t.palette[2]);
        assert_eq!(
            out,
            format!("s = {}", string_style.paint(r#""a\"b""#, true))
        );
    }

    #[test]
    fn test_mixed_line() {
        let t = theme();
        let out = highlight_line("const n = 10; // count", &t, true);
        assert!(out.contains(&painted(t.palette[5], "const")));
        assert!(out.contains(&painted(t.palette[3], "10")));
        assert!(out.contains(&Style::fg(t.palette[8]).italic().paint("// count", true)));
    }

    #[test]
    fn test_stray_sentinel_chars_stripped() {
        let t = theme();
        let out = highlight_line("a\u{1}b\u{2}c", &t, true);
        assert_eq!(out, "abc");
    }
}
