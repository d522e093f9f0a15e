//! Renderer - Template x Context x Registry to Output
//!
//! All-or-nothing: any failure discards the partially built output.

use thiserror::Error;
use tracing::{trace, warn};

use crate::registry::{ModifierError, ModifierRegistry};
use crate::template::{Node, Template, VariableNode};
use crate::value::{Context, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Unknown modifier '{name}' at byte {offset}")]
    UnknownModifier { name: String, offset: usize },

    #[error("Modifier '{name}' failed at byte {offset}: {source}")]
    ModifierFailed {
        name: String,
        offset: usize,
        #[source]
        source: ModifierError,
    },
}

impl RenderError {
    /// Name of the modifier the error refers to.
    pub fn modifier(&self) -> &str {
        match self {
            RenderError::UnknownModifier { name, .. } | RenderError::ModifierFailed { name, .. } => name,
        }
    }
}

pub fn render(
    template: &Template,
    context: &Context,
    registry: &ModifierRegistry,
) -> Result<String, RenderError> {
    let mut output = String::new();

    for node in template.nodes() {
        match node {
            Node::Text { text } => output.push_str(text),
            Node::Variable(var) => {
                let value = evaluate(var, context, registry)?;
                output.push_str(&value.to_string());
            }
        }
    }

    Ok(output)
}

/// Resolves a variable and folds its modifier chain left to right.
pub fn evaluate(
    var: &VariableNode,
    context: &Context,
    registry: &ModifierRegistry,
) -> Result<Value, RenderError> {
    let mut value = context.resolve(&var.name);

    for call in &var.modifiers {
        let Some(modifier) = registry.resolve(&call.name) else {
            warn!(modifier = %call.name, offset = call.offset, "unknown modifier");
            return Err(RenderError::UnknownModifier {
                name: call.name.clone(),
                offset: call.offset,
            });
        };

        trace!(modifier = %call.name, variable = %var.name, "applying modifier");
        value = modifier
            .apply(value, &call.args, context)
            .map_err(|source| RenderError::ModifierFailed {
                name: call.name.clone(),
                offset: call.offset,
                source,
            })?;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn render_str(src: &str, ctx: &Context) -> Result<String, RenderError> {
        render(&parse(src).unwrap(), ctx, &ModifierRegistry::with_builtins())
    }

    #[test]
    fn test_text_and_variables() {
        let ctx = Context::new().with("name", "World").with("n", 3i64);
        assert_eq!(render_str("Hello {{ name }} x{{n}}", &ctx).unwrap(), "Hello World x3");
    }

    #[test]
    fn test_missing_renders_empty() {
        assert_eq!(render_str("[{{missing}}]", &Context::new()).unwrap(), "[]");
        assert_eq!(render_str("[{{missing|upper}}]", &Context::new()).unwrap(), "[]");
    }

    #[test]
    fn test_null_renders_empty() {
        let ctx = Context::new().with("x", Value::Null);
        assert_eq!(render_str("[{{x}}]", &ctx).unwrap(), "[]");
    }

    #[test]
    fn test_unknown_modifier_has_offset() {
        let err = render_str("ab {{ x | nope }}", &Context::new()).unwrap_err();
        assert_eq!(err, RenderError::UnknownModifier { name: "nope".into(), offset: 10 });
        assert_eq!(err.modifier(), "nope");
    }

    #[test]
    fn test_unknown_modifier_on_missing_variable_still_fails() {
        assert!(render_str("{{missing|nope}}", &Context::new()).is_err());
    }

    #[test]
    fn test_modifier_failure_wraps_source() {
        let ctx = Context::new().with("x", "hello");
        let err = render_str("{{x|truncate:many}}", &ctx).unwrap_err();
        match err {
            RenderError::ModifierFailed { name, source, .. } => {
                assert_eq!(name, "truncate");
                assert!(matches!(source, ModifierError::InvalidArgument { index: 0, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_context_reaches_modifiers() {
        let mut registry = ModifierRegistry::new();
        registry.register_modifier("greet", |value, _args, ctx| {
            let greeting = ctx.resolve("greeting");
            Ok(Value::String(format!("{}, {}", greeting, value)))
        });
        let ctx = Context::new().with("greeting", "Hola").with("who", "Ana");
        let out = render(&parse("{{who|greet}}").unwrap(), &ctx, &registry).unwrap();
        assert_eq!(out, "Hola, Ana");
    }
}
