//! Sauce - placeholder and modifier-chain templates
//!
//! Source text compiles once into an immutable [`Template`]; each render
//! folds every placeholder's value through its modifier chain.
//!
//! ```
//! use sauce::{parse, render, Context, ModifierRegistry};
//!
//! let template = parse("Hello {{ name | upper }}{{ punct | default:! }}").unwrap();
//! let registry = ModifierRegistry::with_builtins();
//! let context = Context::new().with("name", "world");
//!
//! assert_eq!(render(&template, &context, &registry).unwrap(), "Hello WORLD!");
//! ```

pub mod builtins;
pub mod check;
pub mod config;
pub mod engine;
pub mod hashing;
pub mod parser;
pub mod registry;
pub mod renderer;
pub mod template;
pub mod value;

pub use check::{CheckReport, CheckViolation, Checker, Severity};
pub use config::{ConfigError, EngineConfig, Syntax};
pub use engine::Engine;
pub use parser::{parse, ParseError, ParseErrorKind, Parser};
pub use registry::{Modifier, ModifierError, ModifierRegistry};
pub use renderer::{render, RenderError};
pub use template::{Arg, ModifierCall, Node, Template, VariableNode};
pub use value::{Context, Value};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
