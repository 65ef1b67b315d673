use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::EvalError;
use crate::functions::{number_arg, FunctionCategory, FunctionContext, FunctionSpec};
use crate::value::Value;

pub(super) fn __force_link() {}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

inventory::submit! {
    FunctionSpec {
        name: "TODAY",
        min_args: 0,
        max_args: 0,
        category: FunctionCategory::Date,
        description: "Current UTC date as YYYY-MM-DD.",
        usage: "TODAY()",
        implementation: today_fn,
    }
}

fn today_fn(ctx: &dyn FunctionContext, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(
        ctx.now_utc().format(DATE_FORMAT).to_string(),
    ))
}

inventory::submit! {
    FunctionSpec {
        name: "NOW",
        min_args: 0,
        max_args: 0,
        category: FunctionCategory::Date,
        description: "Current UTC date and time as YYYY-MM-DD HH:MM:SS.",
        usage: "NOW()",
        implementation: now_fn,
    }
}

fn now_fn(ctx: &dyn FunctionContext, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::String(
        ctx.now_utc().format(DATE_TIME_FORMAT).to_string(),
    ))
}

inventory::submit! {
    FunctionSpec {
        name: "DATE_ADD",
        min_args: 2,
        max_args: 2,
        category: FunctionCategory::Date,
        description: "Adds a whole number of days to a date and returns YYYY-MM-DD.",
        usage: "DATE_ADD(date, days)",
        implementation: date_add_fn,
    }
}

fn date_add_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let date = match args.first() {
        Some(Value::String(raw)) => parse_date(raw).ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "DATE_ADD expects a YYYY-MM-DD date, got '{raw}'"
            ))
        })?,
        other => {
            return Err(EvalError::type_mismatch(format!(
                "DATE_ADD expects a date string, got {}",
                other.map_or("nothing", Value::kind_name)
            )))
        }
    };

    let days = number_arg("DATE_ADD", args, 1)?;
    if days.fract() != 0.0 {
        return Err(EvalError::type_mismatch(format!(
            "DATE_ADD expects a whole number of days, got {days}"
        )));
    }

    let shifted = Duration::try_days(days as i64)
        .filter(|_| days.abs() <= i64::MAX as f64)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| {
            EvalError::type_mismatch(format!("DATE_ADD result is out of range ({days} days)"))
        })?;
    Ok(Value::String(shifted.format(DATE_FORMAT).to_string()))
}

/// Accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`; the time of day is dropped.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
                .ok()
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use crate::error::EvalErrorKind;
    use crate::functions::call_function;
    use crate::functions::test_support::FixedClock;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn clock() -> FixedClock {
        FixedClock::at(2024, 2, 28, 23, 5, 9)
    }

    #[test]
    fn today_and_now_use_the_context_clock() {
        let ctx = clock();
        assert_eq!(
            call_function(&ctx, "TODAY", &[]).unwrap(),
            Value::from("2024-02-28")
        );
        assert_eq!(
            call_function(&ctx, "now", &[]).unwrap(),
            Value::from("2024-02-28 23:05:09")
        );
    }

    #[test]
    fn date_add_crosses_month_and_leap_day() {
        let ctx = clock();
        let add = |date: &str, days: f64| {
            call_function(&ctx, "DATE_ADD", &[date.into(), days.into()])
        };
        assert_eq!(add("2024-02-28", 1.0).unwrap(), Value::from("2024-02-29"));
        assert_eq!(add("2024-02-28", 2.0).unwrap(), Value::from("2024-03-01"));
        assert_eq!(add("2024-01-10 08:30:00", -10.0).unwrap(), Value::from("2023-12-31"));
    }

    #[test]
    fn date_add_rejects_bad_input() {
        let ctx = clock();
        for args in [
            vec![Value::from("28/02/2024"), Value::from(1.0)],
            vec![Value::from("2024-02-30"), Value::from(1.0)],
            vec![Value::Null, Value::from(1.0)],
            vec![Value::from("2024-02-28"), Value::from(1.5)],
            vec![Value::from("2024-02-28"), Value::from("soon")],
            vec![Value::from("2024-02-28"), Value::from(1e300)],
        ] {
            let err = call_function(&ctx, "DATE_ADD", &args).unwrap_err();
            assert_eq!(err.kind, EvalErrorKind::TypeMismatch, "{args:?}");
        }
    }
}
