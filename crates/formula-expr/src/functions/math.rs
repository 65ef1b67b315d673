use crate::error::EvalError;
use crate::functions::{number_arg, FunctionCategory, FunctionContext, FunctionSpec};
use crate::value::Value;

pub(super) fn __force_link() {}

const MAX_ROUND_DIGITS: f64 = 15.0;

inventory::submit! {
    FunctionSpec {
        name: "ROUND",
        min_args: 1,
        max_args: 2,
        category: FunctionCategory::Math,
        description: "Rounds a number to the given number of decimal places (halves away from zero).",
        usage: "ROUND(number, [precision])",
        implementation: round_fn,
    }
}

fn round_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let number = number_arg("ROUND", args, 0)?;
    let digits = if args.len() > 1 {
        number_arg("ROUND", args, 1)?
    } else {
        0.0
    };
    let digits = digits.trunc().clamp(-MAX_ROUND_DIGITS, MAX_ROUND_DIGITS) as i32;
    Ok(Value::Number(round_half_away(number, digits)))
}

fn round_half_away(n: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits.saturating_abs());
    if !factor.is_finite() || factor == 0.0 {
        return n;
    }

    let scaled = if digits >= 0 { n * factor } else { n / factor };
    let base = scaled.trunc();
    let rounded = if scaled.fract().abs() < 0.5 {
        base
    } else {
        base + scaled.signum()
    };

    let out = if digits >= 0 {
        rounded / factor
    } else {
        rounded * factor
    };
    if out.is_finite() {
        out
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use crate::error::EvalErrorKind;
    use crate::functions::call_function;
    use crate::functions::test_support::FixedClock;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn round(args: &[Value]) -> Result<Value, crate::error::EvalError> {
        let ctx = FixedClock::at(2024, 1, 1, 0, 0, 0);
        call_function(&ctx, "ROUND", args)
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(round(&[2.5.into()]).unwrap(), Value::Number(3.0));
        assert_eq!(round(&[(-2.5).into()]).unwrap(), Value::Number(-3.0));
        assert_eq!(round(&[1.25.into(), 1.0.into()]).unwrap(), Value::Number(1.3));
        assert_eq!(round(&[1234.0.into(), (-2.0).into()]).unwrap(), Value::Number(1200.0));
    }

    #[test]
    fn precision_is_truncated_and_clamped() {
        assert_eq!(round(&[7.456.into(), 2.9.into()]).unwrap(), Value::Number(7.46));
        assert_eq!(round(&[1.5.into(), 400.0.into()]).unwrap(), Value::Number(1.5));
        assert_eq!(round(&[1.5.into(), (-400.0).into()]).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(round(&["7.6".into()]).unwrap(), Value::Number(8.0));
        let err = round(&["seven".into()]).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeMismatch);
        assert!(round(&[Value::Null]).is_err());
    }
}
