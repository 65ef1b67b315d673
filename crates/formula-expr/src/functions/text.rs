use crate::error::EvalError;
use crate::functions::{text_arg, FunctionCategory, FunctionContext, FunctionSpec};
use crate::value::Value;

pub(super) fn __force_link() {}

inventory::submit! {
    FunctionSpec {
        name: "CONTAINS",
        min_args: 2,
        max_args: 2,
        category: FunctionCategory::Text,
        description: "True when the text contains the search string (case-sensitive).",
        usage: "CONTAINS(text, search)",
        implementation: contains_fn,
    }
}

fn contains_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let haystack = text_arg(args, 0);
    let needle = text_arg(args, 1);
    Ok(Value::Bool(haystack.contains(needle.as_str())))
}

inventory::submit! {
    FunctionSpec {
        name: "STARTS_WITH",
        min_args: 2,
        max_args: 2,
        category: FunctionCategory::Text,
        description: "True when the text begins with the prefix (case-sensitive).",
        usage: "STARTS_WITH(text, prefix)",
        implementation: starts_with_fn,
    }
}

fn starts_with_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let prefix = text_arg(args, 1);
    Ok(Value::Bool(text.starts_with(prefix.as_str())))
}

inventory::submit! {
    FunctionSpec {
        name: "ENDS_WITH",
        min_args: 2,
        max_args: 2,
        category: FunctionCategory::Text,
        description: "True when the text ends with the suffix (case-sensitive).",
        usage: "ENDS_WITH(text, suffix)",
        implementation: ends_with_fn,
    }
}

fn ends_with_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let suffix = text_arg(args, 1);
    Ok(Value::Bool(text.ends_with(suffix.as_str())))
}

inventory::submit! {
    FunctionSpec {
        name: "LEN",
        min_args: 1,
        max_args: 1,
        category: FunctionCategory::Text,
        description: "Number of characters in the text.",
        usage: "LEN(text)",
        implementation: len_fn,
    }
}

fn len_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let count = text_arg(args, 0).chars().count();
    Ok(Value::Number(count as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "UPPER",
        min_args: 1,
        max_args: 1,
        category: FunctionCategory::Text,
        description: "Converts the text to upper case.",
        usage: "UPPER(text)",
        implementation: upper_fn,
    }
}

fn upper_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text_arg(args, 0).to_uppercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "LOWER",
        min_args: 1,
        max_args: 1,
        category: FunctionCategory::Text,
        description: "Converts the text to lower case.",
        usage: "LOWER(text)",
        implementation: lower_fn,
    }
}

fn lower_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(text_arg(args, 0).to_lowercase()))
}

#[cfg(test)]
mod tests {
    use crate::functions::call_function;
    use crate::functions::test_support::FixedClock;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> Value {
        let ctx = FixedClock::at(2024, 1, 1, 0, 0, 0);
        call_function(&ctx, name, args).unwrap()
    }

    #[test]
    fn substring_tests_are_case_sensitive() {
        let name = Value::from("Acme Corporation");
        assert_eq!(call("CONTAINS", &[name.clone(), "Corp".into()]), Value::Bool(true));
        assert_eq!(call("contains", &[name.clone(), "corp".into()]), Value::Bool(false));
        assert_eq!(call("STARTS_WITH", &[name.clone(), "Acme".into()]), Value::Bool(true));
        assert_eq!(call("ENDS_WITH", &[name, "tion".into()]), Value::Bool(true));
    }

    #[test]
    fn non_text_arguments_are_coerced() {
        assert_eq!(call("CONTAINS", &[Value::Number(1500.0), "50".into()]), Value::Bool(true));
        assert_eq!(call("CONTAINS", &[Value::Null, "".into()]), Value::Bool(true));
        assert_eq!(call("LEN", &[Value::Number(12.5)]), Value::Number(4.0));
        assert_eq!(call("LEN", &[Value::Null]), Value::Number(0.0));
        assert_eq!(call("UPPER", &[Value::Bool(true)]), Value::from("TRUE"));
    }

    #[test]
    fn len_counts_characters_not_bytes() {
        assert_eq!(call("LEN", &["héllo".into()]), Value::Number(5.0));
        assert_eq!(call("LOWER", &["ÀB".into()]), Value::from("àb"));
    }
}
