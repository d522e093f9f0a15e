//! Compiled Templates - Immutable Node Sequences

use serde::Serialize;

use crate::config::Syntax;

/// A literal argument to a modifier call.
///
/// The source text is kept as written; typed readings are derived on demand
/// so a modifier decides how to interpret its own arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quoted: bool,
}

impl Arg {
    pub fn bare(text: impl Into<String>) -> Self {
        Self { text: text.into(), quoted: false }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self { text: text.into(), quoted: true }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Integer reading. Quoted arguments are always strings.
    pub fn as_int(&self) -> Option<i64> {
        if self.quoted {
            return None;
        }
        self.text.parse().ok()
    }

    pub fn as_float(&self) -> Option<f64> {
        if self.quoted {
            return None;
        }
        self.text.parse().ok()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match (self.quoted, self.text.as_str()) {
            (false, "true") => Some(true),
            (false, "false") => Some(false),
            _ => None,
        }
    }

    /// The most specific value this literal denotes. A number is typed only
    /// when it prints back as the same text, so `007` or `+5` stay strings.
    pub fn to_value(&self) -> crate::Value {
        if let Some(i) = self.as_int().filter(|i| i.to_string() == self.text) {
            crate::Value::Int(i)
        } else if let Some(b) = self.as_bool() {
            crate::Value::Bool(b)
        } else {
            crate::Value::String(self.text.clone())
        }
    }

    fn write_normalized(&self, out: &mut String) {
        if self.quoted || needs_quotes(&self.text) {
            out.push('"');
            for c in self.text.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(&self.text);
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.trim() != text
        || text.contains(|c| matches!(c, ',' | '|' | '"'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifierCall {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
    /// Byte offset of the modifier segment in the source.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableNode {
    /// Variable path, possibly dotted (`user.name`).
    pub name: String,
    pub modifiers: Vec<ModifierCall>,
    /// Byte offset of the open delimiter in the source.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Text { text: String },
    Variable(VariableNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }
}

/// The compiled form of one template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    nodes: Vec<Node>,
    #[serde(skip)]
    syntax: Syntax,
}

impl Template {
    pub(crate) fn new(nodes: Vec<Node>, syntax: Syntax) -> Self {
        Self { nodes, syntax }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableNode> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Variable(var) => Some(var),
            Node::Text { .. } => None,
        })
    }

    /// Rebuilds source text in canonical spacing.
    ///
    /// Re-parsing the result with the same syntax yields an equal node
    /// sequence (offsets aside).
    pub fn normalized(&self) -> String {
        let open = self.syntax.open();
        let close = self.syntax.close();
        let mut out = String::new();

        for node in &self.nodes {
            match node {
                Node::Text { text } => {
                    let mut rest = text.as_str();
                    while let Some(pos) = rest.find(open) {
                        out.push_str(&rest[..pos]);
                        out.push_str(open);
                        out.push_str(open);
                        rest = &rest[pos + open.len()..];
                    }
                    out.push_str(rest);
                }
                Node::Variable(var) => {
                    out.push_str(open);
                    out.push_str(&var.name);
                    for call in &var.modifiers {
                        out.push('|');
                        out.push_str(&call.name);
                        for (i, arg) in call.args.iter().enumerate() {
                            out.push(if i == 0 { ':' } else { ',' });
                            arg.write_normalized(&mut out);
                        }
                    }
                    out.push_str(close);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_typed_readings() {
        assert_eq!(Arg::bare("12").as_int(), Some(12));
        assert_eq!(Arg::quoted("12").as_int(), None);
        assert_eq!(Arg::bare("true").as_bool(), Some(true));
        assert_eq!(Arg::bare("1.5").as_float(), Some(1.5));
        assert_eq!(Arg::bare("n/a").to_value(), crate::Value::from("n/a"));
        assert_eq!(Arg::bare("42").to_value(), crate::Value::Int(42));
        assert_eq!(Arg::bare("007").to_value(), crate::Value::from("007"));
        assert_eq!(Arg::bare("+5").to_value(), crate::Value::from("+5"));
        assert_eq!(Arg::bare("-0").to_value(), crate::Value::from("-0"));
    }

    #[test]
    fn test_normalized_escapes_text_delimiters() {
        let template = Template::new(
            vec![
                Node::text("a {{ b "),
                Node::Variable(VariableNode {
                    name: "x".into(),
                    modifiers: vec![ModifierCall {
                        name: "replace".into(),
                        args: vec![Arg::bare("a"), Arg::quoted(" , ")],
                        offset: 11,
                    }],
                    offset: 8,
                }),
            ],
            Syntax::default(),
        );
        assert_eq!(template.normalized(), r#"a {{{{ b {{x|replace:a," , "}}"#);
    }
}
