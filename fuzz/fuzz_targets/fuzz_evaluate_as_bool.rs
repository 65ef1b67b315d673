#![no_main]

use formula_expr::{Context, Engine, Value};
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 4 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };

    // First byte picks the record shape; the rest is the expression.
    let shape = data[0];
    let source = String::from_utf8_lossy(&data[1..]);

    let mut ctx = Context::new();
    if shape & 1 != 0 {
        ctx.insert("amount", f64::from(shape));
    }
    if shape & 2 != 0 {
        ctx.insert("stage", "Closed Won");
    }
    if shape & 4 != 0 {
        ctx.insert("name", Value::Null);
    }
    if shape & 8 != 0 {
        ctx.insert("active", shape & 16 != 0);
    }

    let engine = Engine::new();
    let as_bool = engine.evaluate_as_bool(&source, &ctx);
    let truthy = engine
        .evaluate(&source, &ctx)
        .map(|v| v.is_truthy())
        .unwrap_or(false);
    // Clock-dependent expressions may straddle a tick; everything else must agree.
    let upper = source.to_ascii_uppercase();
    if !upper.contains("NOW") && !upper.contains("TODAY") {
        assert_eq!(as_bool, truthy);
    }
});
