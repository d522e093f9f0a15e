//! Parse-count hooks live in their own test binary so no other test touches
//! the global counter concurrently.

#![cfg(feature = "test-hooks")]

use sauce::parser::{get_parse_call_count, reset_parse_call_count};
use sauce::{Context, Engine};

#[test]
fn invariant_engine_parses_each_source_once() {
    let engine = Engine::default();
    reset_parse_call_count();

    for _ in 0..5 {
        engine.render_str("{{x}}", &Context::new()).unwrap();
    }
    engine.render_str("{{y}}", &Context::new()).unwrap();

    assert_eq!(get_parse_call_count(), 2);
}
