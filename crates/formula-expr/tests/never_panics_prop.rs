#![cfg(not(target_arch = "wasm32"))]

use formula_expr::{Context, Engine, Value};
use proptest::prelude::*;

fn arb_context() -> impl Strategy<Value = Context> {
    let value = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1e6f64..1e6).prop_map(Value::Number),
        "[ -~]{0,8}".prop_map(Value::String),
    ];
    proptest::collection::vec(("[a-c]", value), 0..4)
        .prop_map(|pairs| pairs.into_iter().collect::<Context>())
}

/// Token soup drawn from the language's alphabet, so most inputs get past the lexer.
fn arb_source() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        Just("a".to_string()),
        Just("b".to_string()),
        Just("c".to_string()),
        Just("1".to_string()),
        Just("2.5".to_string()),
        Just("'x'".to_string()),
        Just("true".to_string()),
        Just("null".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just(",".to_string()),
        Just("==".to_string()),
        Just("!=".to_string()),
        Just("<".to_string()),
        Just(">=".to_string()),
        Just("&&".to_string()),
        Just("||".to_string()),
        Just("!".to_string()),
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("/".to_string()),
        Just("LEN(".to_string()),
        Just("IF(".to_string()),
        Just("ROUND(".to_string()),
        Just("DATE_ADD(".to_string()),
        Just("contains(".to_string()),
    ];
    proptest::collection::vec(piece, 0..24).prop_map(|pieces| pieces.join(" "))
}

/// Flat chains of one operator, long enough to cross the default nesting limit.
fn arb_long_chain() -> impl Strategy<Value = String> {
    let operator = prop::sample::select(vec!["+", "-", "*", "&&", "||", "==", "<"]);
    let operand = prop::sample::select(vec!["a", "1", "'x'", "LEN(b)", "(c)"]);
    (operator, operand, 100usize..1_500).prop_map(|(op, term, len)| vec![term; len].join(op))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn token_soup_never_panics(src in arb_source(), ctx in arb_context()) {
        let engine = Engine::new();
        let _ = engine.evaluate(&src, &ctx);
        let _ = engine.evaluate_as_bool(&src, &ctx);
        let _ = engine.to_sql(&src);
    }

    #[test]
    fn arbitrary_text_never_panics(src in "\\PC{0,64}", ctx in arb_context()) {
        let engine = Engine::new();
        let _ = engine.evaluate_as_bool(&src, &ctx);
        let _ = engine.validate(&src);
    }

    #[test]
    fn long_flat_chains_never_overflow(src in arb_long_chain(), ctx in arb_context()) {
        let engine = Engine::new();
        let _ = engine.evaluate_as_bool(&src, &ctx);
        let _ = engine.to_sql(&src);
        if let Ok(compiled) = engine.compile(&src) {
            let _ = compiled.root.to_string();
        }
    }

    #[test]
    fn compile_is_idempotent(src in arb_source()) {
        let engine = Engine::new();
        if let Ok(first) = engine.compile(&src) {
            engine.clear_cache();
            let second = engine.compile(&src).expect("recompile");
            prop_assert_eq!(&first.root, &second.root);

            // Re-stringified trees parse back to the same tree.
            let printed = first.root.to_string();
            let reparsed = engine.compile(&printed).expect("reparse");
            prop_assert_eq!(&first.root, &reparsed.root);
        }
    }

    #[test]
    fn condition_matches_truthiness_of_evaluate(src in arb_source(), ctx in arb_context()) {
        let engine = Engine::new();
        let expected = engine
            .evaluate(&src, &ctx)
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        prop_assert_eq!(engine.evaluate_as_bool(&src, &ctx), expected);
    }
}
