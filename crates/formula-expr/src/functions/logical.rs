use crate::error::EvalError;
use crate::functions::{FunctionCategory, FunctionContext, FunctionSpec};
use crate::value::Value;

pub(super) fn __force_link() {}

inventory::submit! {
    FunctionSpec {
        name: "IF",
        min_args: 3,
        max_args: 3,
        category: FunctionCategory::Logic,
        description: "Returns the second argument when the condition is truthy, otherwise the third.",
        usage: "IF(condition, when_true, when_false)",
        implementation: if_fn,
    }
}

// Arguments arrive already evaluated, so both branches run before selection.
fn if_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let picked = if args.first().is_some_and(Value::is_truthy) {
        args.get(1)
    } else {
        args.get(2)
    };
    Ok(picked.cloned().unwrap_or(Value::Null))
}
