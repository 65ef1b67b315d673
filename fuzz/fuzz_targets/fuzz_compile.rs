#![no_main]

use formula_expr::{Engine, EngineConfig};
use libfuzzer_sys::fuzz_target;

/// Slightly above the default source limit so the length check itself is exercised.
const MAX_INPUT_BYTES: usize = 8 * 1024 + 256;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };
    let source = String::from_utf8_lossy(data);

    let engine = Engine::with_config(EngineConfig::default());
    let Ok(compiled) = engine.compile(&source) else {
        let validation = engine.validate(&source);
        assert!(!validation.valid);
        return;
    };

    // Recompiling (cached and cold) must agree with the first result.
    let cached = engine.compile(&source).expect("cached compile");
    assert_eq!(compiled.root, cached.root);
    engine.clear_cache();
    let cold = engine.compile(&source).expect("cold compile");
    assert_eq!(compiled.root, cold.root);

    let _ = engine.to_sql(&source);
});
