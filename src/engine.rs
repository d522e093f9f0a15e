//! Engine - Single Entry Point
//!
//! Bundles configuration, the modifier registry and a cache of compiled
//! templates. Registration takes `&mut self`; compiling and rendering take
//! `&self` and are safe to call from many threads at once.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::check::{CheckReport, Checker};
use crate::config::{ConfigError, EngineConfig, Syntax};
use crate::hashing::template_fingerprint;
use crate::parser::{ParseError, Parser};
use crate::registry::{Modifier, ModifierError, ModifierRegistry};
use crate::renderer::{self, RenderError};
use crate::template::{Arg, Template};
use crate::value::{Context, Value};
use crate::Error;

pub struct Engine {
    config: EngineConfig,
    parser: Parser,
    registry: ModifierRegistry,
    checker: Checker,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl Engine {
    /// Builds an engine with the built-in modifiers installed.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_registry(config, ModifierRegistry::with_builtins())
    }

    pub fn with_registry(config: EngineConfig, registry: ModifierRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        let syntax = config.syntax()?;
        Ok(Self::assemble(config, syntax, registry))
    }

    /// `config` must already be validated and `syntax` derived from it.
    fn assemble(config: EngineConfig, syntax: Syntax, registry: ModifierRegistry) -> Self {
        let parser = Parser::new(syntax, config.max_chain_length);
        Self {
            config,
            parser,
            registry,
            checker: Checker::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModifierRegistry {
        &self.registry
    }

    pub fn register_modifier<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value, &[Arg], &Context) -> Result<Value, ModifierError> + Send + Sync + 'static,
    {
        self.registry.register_modifier(name, f);
    }

    pub fn register(&mut self, name: impl Into<String>, modifier: impl Modifier + 'static) {
        self.registry.register(name, modifier);
    }

    /// Parses `source`, reusing a cached template when caching is enabled.
    pub fn compile(&self, source: &str) -> Result<Arc<Template>, ParseError> {
        if !self.config.cache_templates {
            return self.parser.parse(source).map(Arc::new);
        }

        let key = template_fingerprint(source, self.parser.syntax());
        if let Some(template) = self.cache.read().get(&key) {
            debug!(fingerprint = %key, "template cache hit");
            return Ok(Arc::clone(template));
        }

        let template = Arc::new(self.parser.parse(source)?);
        debug!(fingerprint = %key, "template cache miss");
        let mut cache = self.cache.write();
        if !cache.contains_key(&key) && cache.len() >= self.config.max_cached_templates {
            debug!(evicted = cache.len(), "template cache full, clearing");
            cache.clear();
        }
        Ok(Arc::clone(cache.entry(key).or_insert(template)))
    }

    pub fn render(&self, template: &Template, context: &Context) -> Result<String, RenderError> {
        renderer::render(template, context, &self.registry)
    }

    /// Compile and render in one step.
    pub fn render_str(&self, source: &str, context: &Context) -> Result<String, Error> {
        let template = self.compile(source)?;
        Ok(self.render(&template, context)?)
    }

    pub fn check(&self, template: &Template) -> CheckReport {
        self.checker.check(template, &self.registry)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::assemble(EngineConfig::default(), Syntax::default(), ModifierRegistry::with_builtins())
    }
}
