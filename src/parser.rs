//! Template Parser - Source Text to Node Sequence
//!
//! Pure function of the source and the delimiter syntax. A doubled open
//! delimiter is the escape for a literal open delimiter.

use thiserror::Error;
use tracing::debug;

use crate::config::{Syntax, DEFAULT_MAX_CHAIN_LENGTH};
use crate::template::{Arg, ModifierCall, Node, Template, VariableNode};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static PARSE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_parse_call_count() -> u32 {
    PARSE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_parse_call_count() {
    PARSE_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unterminated placeholder")]
    UnterminatedPlaceholder,

    #[error("empty variable name")]
    EmptyVariableName,

    #[error("invalid variable name")]
    InvalidVariableName,

    #[error("malformed modifier syntax")]
    MalformedModifierSyntax,

    #[error("modifier chain longer than {max}")]
    ChainTooLong { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at byte {offset}: {kind}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// Parses with the default `{{ }}` syntax and chain limit.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    Parser::default().parse(source)
}

#[derive(Debug, Clone)]
pub struct Parser {
    syntax: Syntax,
    max_chain_length: usize,
}

impl Parser {
    pub fn new(syntax: Syntax, max_chain_length: usize) -> Self {
        Self { syntax, max_chain_length }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        #[cfg(feature = "test-hooks")]
        PARSE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let open = self.syntax.open();
        let close = self.syntax.close();

        let mut nodes = vec![];
        let mut text = String::new();
        let mut pos = 0;

        while pos < source.len() {
            let rest = &source[pos..];
            let Some(rel) = rest.find(open) else {
                text.push_str(rest);
                break;
            };

            text.push_str(&rest[..rel]);
            let start = pos + rel;
            let inner_start = start + open.len();

            if source[inner_start..].starts_with(open) {
                text.push_str(open);
                pos = inner_start + open.len();
                continue;
            }

            let inner_end = find_close(source, inner_start, close)
                .ok_or_else(|| ParseError::new(start, ParseErrorKind::UnterminatedPlaceholder))?;

            let variable = self.parse_placeholder(source, start, inner_start, inner_end)?;
            if !text.is_empty() {
                nodes.push(Node::Text { text: std::mem::take(&mut text) });
            }
            nodes.push(Node::Variable(variable));
            pos = inner_end + close.len();
        }

        if !text.is_empty() {
            nodes.push(Node::Text { text });
        }

        debug!(nodes = nodes.len(), bytes = source.len(), "parsed template");
        Ok(Template::new(nodes, self.syntax.clone()))
    }

    fn parse_placeholder(
        &self,
        source: &str,
        open_offset: usize,
        inner_start: usize,
        inner_end: usize,
    ) -> Result<VariableNode, ParseError> {
        let inner = &source[inner_start..inner_end];
        let segments = split_unquoted(inner, inner_start, b'|');

        let (name_offset, raw_name) = segments[0];
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(ParseError::new(open_offset, ParseErrorKind::EmptyVariableName));
        }
        if !is_valid_path(name) {
            return Err(ParseError::new(
                name_offset + leading_ws(raw_name),
                ParseErrorKind::InvalidVariableName,
            ));
        }

        let chain = &segments[1..];
        if chain.len() > self.max_chain_length {
            return Err(ParseError::new(
                open_offset,
                ParseErrorKind::ChainTooLong { max: self.max_chain_length },
            ));
        }

        let modifiers = chain
            .iter()
            .map(|&(offset, segment)| parse_modifier(offset, segment))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VariableNode {
            name: name.to_string(),
            modifiers,
            offset: open_offset,
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Syntax::default(), DEFAULT_MAX_CHAIN_LENGTH)
    }
}

fn parse_modifier(offset: usize, segment: &str) -> Result<ModifierCall, ParseError> {
    let malformed = |at| ParseError::new(at, ParseErrorKind::MalformedModifierSyntax);
    let seg_offset = offset + leading_ws(segment);

    let (name_part, args_part) = match segment.find(':') {
        Some(i) => (&segment[..i], Some((offset + i + 1, &segment[i + 1..]))),
        None => (segment, None),
    };

    let name = name_part.trim();
    if !is_ident(name) {
        return Err(malformed(seg_offset));
    }

    let args = match args_part {
        None => vec![],
        Some((args_offset, raw)) => {
            if raw.trim().is_empty() {
                return Err(malformed(args_offset));
            }
            split_unquoted(raw, args_offset, b',')
                .into_iter()
                .map(|(at, raw_arg)| parse_arg(raw_arg).ok_or_else(|| malformed(at)))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(ModifierCall {
        name: name.to_string(),
        args,
        offset: seg_offset,
    })
}

fn parse_arg(raw: &str) -> Option<Arg> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let Some(body) = text.strip_prefix('"') else {
        return (!text.contains('"')).then(|| Arg::bare(text));
    };

    let mut value = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?),
            // Closing quote must end the argument
            '"' => return chars.as_str().is_empty().then(|| Arg::quoted(value)),
            _ => value.push(c),
        }
    }
    None
}

/// Finds the close delimiter, skipping over quoted argument text.
fn find_close(source: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let close = close.as_bytes();
    let mut in_quote = false;
    let mut i = from;

    while i < bytes.len() {
        if in_quote {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'"' => in_quote = false,
                _ => {}
            }
        } else if bytes[i] == b'"' {
            in_quote = true;
        } else if bytes[i..].starts_with(close) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Splits on an ASCII separator outside double quotes, keeping absolute offsets.
fn split_unquoted(s: &str, base: usize, sep: u8) -> Vec<(usize, &str)> {
    let bytes = s.as_bytes();
    let mut parts = vec![];
    let mut start = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b if b == sep && !in_quote => {
                parts.push((base + start, &s[start..i]));
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push((base + start, &s[start..]));
    parts
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_valid_path(s: &str) -> bool {
    let mut segments = s.split('.');
    let head_ok = segments.next().is_some_and(is_ident);
    head_ok && segments.all(|seg| is_ident(seg) || (!seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, offset: usize, modifiers: Vec<ModifierCall>) -> Node {
        Node::Variable(VariableNode { name: name.into(), modifiers, offset })
    }

    fn call(name: &str, args: Vec<Arg>, offset: usize) -> ModifierCall {
        ModifierCall { name: name.into(), args, offset }
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_plain_text_single_node() {
        let t = parse("hello } world }}").unwrap();
        assert_eq!(t.nodes(), &[Node::text("hello } world }}")]);
    }

    #[test]
    fn test_placeholder_with_chain() {
        let t = parse("Hi {{ name | upper | truncate:2 }}!").unwrap();
        assert_eq!(
            t.nodes(),
            &[
                Node::text("Hi "),
                var(
                    "name",
                    3,
                    vec![
                        call("upper", vec![], 13),
                        call("truncate", vec![Arg::bare("2")], 21),
                    ],
                ),
                Node::text("!"),
            ]
        );
    }

    #[test]
    fn test_escape_merges_into_text() {
        let t = parse("a {{{{ b }} c").unwrap();
        assert_eq!(t.nodes(), &[Node::text("a {{ b }} c")]);
    }

    #[test]
    fn test_argument_whitespace() {
        let t = parse(r#"{{x|replace: a b ," , "}}"#).unwrap();
        let Node::Variable(v) = &t.nodes()[0] else { panic!("expected variable") };
        assert_eq!(v.modifiers[0].args, vec![Arg::bare("a b"), Arg::quoted(" , ")]);
    }

    #[test]
    fn test_quoted_arg_may_contain_delimiters() {
        let t = parse(r#"{{x|default:"}} | \" ok"}}"#).unwrap();
        let Node::Variable(v) = &t.nodes()[0] else { panic!("expected variable") };
        assert_eq!(v.modifiers[0].args, vec![Arg::quoted(r#"}} | " ok"#)]);
    }

    #[test]
    fn test_dotted_variable_path() {
        let t = parse("{{ user.items.0 }}").unwrap();
        assert_eq!(t.nodes(), &[var("user.items.0", 0, vec![])]);
    }

    #[test]
    fn test_unterminated() {
        let err = parse("ok {{x").unwrap_err();
        assert_eq!(err, ParseError::new(3, ParseErrorKind::UnterminatedPlaceholder));

        let err = parse(r#"{{x|default:"}}"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedPlaceholder);
    }

    #[test]
    fn test_empty_variable_name() {
        for src in ["{{}}", "{{  }}", "{{|upper}}", "ab{{ | upper }}"] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::EmptyVariableName, "{src}");
        }
        assert_eq!(parse("ab{{}}").unwrap_err().offset, 2);
    }

    #[test]
    fn test_invalid_variable_name() {
        let err = parse("{{ 9lives }}").unwrap_err();
        assert_eq!(err, ParseError::new(3, ParseErrorKind::InvalidVariableName));
        assert!(parse("{{a..b}}").is_err());
        assert!(parse("{{{x}}}").is_err());
    }

    #[test]
    fn test_malformed_modifiers() {
        for src in [
            "{{x|}}",
            "{{x||upper}}",
            "{{x|up per}}",
            "{{x|truncate:}}",
            "{{x|replace:a,,b}}",
            r#"{{x|default:"a"b}}"#,
            r#"{{x|default:a"b"}}"#,
        ] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::MalformedModifierSyntax, "{src}");
        }
        assert_eq!(parse("{{x| 1up}}").unwrap_err().offset, 5);
    }

    #[test]
    fn test_chain_limit() {
        let parser = Parser::new(Syntax::default(), 2);
        assert!(parser.parse("{{x|a|b}}").is_ok());
        let err = parser.parse("{{x|a|b|c}}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ChainTooLong { max: 2 });
    }

    #[test]
    fn test_custom_syntax() {
        let parser = Parser::new(Syntax::new("<%", "%>").unwrap(), 8);
        let t = parser.parse("{{ raw }} <% name|lower %> <%<% x").unwrap();
        assert_eq!(
            t.nodes(),
            &[
                Node::text("{{ raw }} "),
                var("name", 10, vec![call("lower", vec![], 18)]),
                Node::text(" <% x"),
            ]
        );
    }

    #[test]
    fn test_normalized_reparses_equal() {
        let src = r#"a{{{{b {{ x | replace: "," , ";" | upper }} {{y}}"#;
        let t = parse(src).unwrap();
        assert_eq!(t.normalized(), r#"a{{{{b {{x|replace:",",";"|upper}} {{y}}"#);

        let again = parse(&t.normalized()).unwrap();
        assert_eq!(t.normalized(), again.normalized());
        assert_eq!(t.nodes().len(), again.nodes().len());
    }

    #[test]
    fn test_multibyte_text() {
        let err = parse("héllo {{ naïve_ok }} ✓").unwrap_err();
        // non-ASCII identifiers are rejected
        assert_eq!(err.kind, ParseErrorKind::InvalidVariableName);

        let t = parse("héllo {{ name }} ✓").unwrap();
        assert_eq!(t.nodes().len(), 3);
    }
}
