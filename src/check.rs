//! Static Template Checks
//!
//! Rules produce structured violations ahead of any render, so a template
//! that would fail with an unknown modifier is caught at load time.

use serde::Serialize;

use crate::registry::ModifierRegistry;
use crate::template::Template;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckViolation {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub variable: String,
    pub modifier: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckReport {
    pub valid: bool,
    pub violations: Vec<CheckViolation>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Error)
    }
}

pub trait CheckRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, template: &Template, registry: &ModifierRegistry) -> Vec<CheckViolation>;
}

/// Every modifier call must resolve in the registry.
pub struct UnknownModifierRule;

impl CheckRule for UnknownModifierRule {
    fn name(&self) -> &'static str { "unknown_modifier" }

    fn check(&self, template: &Template, registry: &ModifierRegistry) -> Vec<CheckViolation> {
        template
            .variables()
            .flat_map(|var| var.modifiers.iter().map(move |call| (var, call)))
            .filter(|(_, call)| !registry.contains(&call.name))
            .map(|(var, call)| CheckViolation {
                rule: self.name().to_string(),
                severity: Severity::Error,
                message: format!("Modifier '{}' is not registered", call.name),
                variable: var.name.clone(),
                modifier: call.name.clone(),
                offset: call.offset,
            })
            .collect()
    }
}

/// The same argument-less modifier applied twice in a row.
pub struct RepeatedModifierRule;

impl CheckRule for RepeatedModifierRule {
    fn name(&self) -> &'static str { "repeated_modifier" }

    fn check(&self, template: &Template, _registry: &ModifierRegistry) -> Vec<CheckViolation> {
        let mut violations = vec![];

        for var in template.variables() {
            for pair in var.modifiers.windows(2) {
                let (prev, call) = (&pair[0], &pair[1]);
                if prev.name == call.name && prev.args.is_empty() && call.args.is_empty() {
                    violations.push(CheckViolation {
                        rule: self.name().to_string(),
                        severity: Severity::Warning,
                        message: format!("Modifier '{}' is applied twice in a row", call.name),
                        variable: var.name.clone(),
                        modifier: call.name.clone(),
                        offset: call.offset,
                    });
                }
            }
        }

        violations
    }
}

pub struct Checker {
    rules: Vec<Box<dyn CheckRule>>,
}

impl Checker {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(UnknownModifierRule),
                Box::new(RepeatedModifierRule),
            ],
        }
    }

    pub fn check(&self, template: &Template, registry: &ModifierRegistry) -> CheckReport {
        let mut violations = vec![];
        for rule in &self.rules {
            violations.extend(rule.check(template, registry));
        }
        violations.sort_by_key(|v| v.offset);

        // Warnings never invalidate
        let valid = !violations.iter().any(|v| v.severity == Severity::Error);
        CheckReport { valid, violations }
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_clean_template() {
        let t = parse("{{a|upper}} {{b|default:x}}").unwrap();
        let report = Checker::new().check(&t, &ModifierRegistry::with_builtins());
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_unknown_modifier_reported() {
        let t = parse("{{a|shout}} {{b|upper|whisper}}").unwrap();
        let report = Checker::new().check(&t, &ModifierRegistry::with_builtins());
        assert!(!report.valid);
        let names: Vec<_> = report.violations.iter().map(|v| v.modifier.as_str()).collect();
        assert_eq!(names, vec!["shout", "whisper"]);
        assert_eq!(report.violations[1].variable, "b");
    }

    #[test]
    fn test_repeated_modifier_is_warning_only() {
        let t = parse("{{a|upper|upper}}").unwrap();
        let report = Checker::new().check(&t, &ModifierRegistry::with_builtins());
        assert!(report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].severity, Severity::Warning);
        assert!(!report.has_errors());
    }
}
