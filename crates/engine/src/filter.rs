//! Filter engine: evaluates a pipeline's declarative predicate against a
//! single event. Pure and side-effect-free.

use log::warn;
use schema::{Condition, Event, Filter, FilterOp, Value};

use crate::fields::{
    collect_accounts, collect_mints, collect_wallets, derive_direction, derive_sol_amount,
    derive_token_amount,
};

/// Evaluate a filter against an event.
///
/// An empty filter matches everything. `$and`/`$or` recurse with
/// short-circuiting; convenience fields are AND-composed; `isBuy` and the
/// amount ranges are skipped (never reject) when the underlying value cannot
/// be derived from the event.
pub fn evaluate(filter: &Filter, event: &Event) -> bool {
    if filter.is_empty() {
        return true;
    }

    if let Some(and) = &filter.and {
        if !and.is_empty() && !and.iter().all(|f| evaluate(f, event)) {
            return false;
        }
    } else if let Some(or) = &filter.or {
        if !or.is_empty() && !or.iter().any(|f| evaluate(f, event)) {
            return false;
        }
    }

    if let Some(instructions) = &filter.instructions {
        if !instructions.is_empty() && !instructions.iter().any(|n| *n == event.name) {
            return false;
        }
    }

    if let Some(mints) = &filter.mints {
        if !mints.is_empty() {
            let candidates = collect_mints(event);
            if !mints.iter().any(|m| candidates.iter().any(|c| *c == m.as_str())) {
                return false;
            }
        }
    }

    if let Some(wallets) = &filter.wallets {
        if !wallets.is_empty() {
            let candidates = collect_wallets(event);
            if !wallets.iter().any(|w| candidates.iter().any(|c| *c == w.as_str())) {
                return false;
            }
        }
    }

    if let Some(want_buy) = filter.is_buy {
        // Skipped when direction is underivable.
        if let Some(is_buy) = derive_direction(event) {
            if is_buy != want_buy {
                return false;
            }
        }
    }

    if let Some(range) = &filter.sol_amount {
        if let Some(amount) = derive_sol_amount(event) {
            if range.min.map(|min| amount < min).unwrap_or(false)
                || range.max.map(|max| amount > max).unwrap_or(false)
            {
                return false;
            }
        }
    }

    if let Some(range) = &filter.token_amount {
        if let Some(amount) = derive_token_amount(event) {
            if range.min.map(|min| amount < min).unwrap_or(false)
                || range.max.map(|max| amount > max).unwrap_or(false)
            {
                return false;
            }
        }
    }

    if let Some(accounts) = &filter.accounts {
        let present = collect_accounts(event);
        if let Some(include) = &accounts.include {
            if !include.is_empty() && !include.iter().any(|a| present.iter().any(|p| p == a)) {
                return false;
            }
        }
        if let Some(exclude) = &accounts.exclude {
            if exclude.iter().any(|a| present.iter().any(|p| p == a)) {
                return false;
            }
        }
    }

    if let Some(conditions) = &filter.conditions {
        if !conditions.iter().all(|c| check_condition(c, event)) {
            return false;
        }
    }

    true
}

fn check_condition(condition: &Condition, event: &Event) -> bool {
    let actual = event.lookup(&condition.field);

    match condition.op {
        FilterOp::Eq => values_equal(actual.as_ref(), &condition.value),
        FilterOp::Neq => !values_equal(actual.as_ref(), &condition.value),
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            let (Some(lhs), Some(rhs)) =
                (actual.as_ref().and_then(Value::as_f64), condition.value.as_f64())
            else {
                return false;
            };
            match condition.op {
                FilterOp::Gt => lhs > rhs,
                FilterOp::Gte => lhs >= rhs,
                FilterOp::Lt => lhs < rhs,
                FilterOp::Lte => lhs <= rhs,
                _ => unreachable!(),
            }
        }
        FilterOp::In | FilterOp::Nin => {
            let Some(actual) = actual.as_ref() else {
                return false;
            };
            let found = condition
                .value
                .as_list()
                .map(|list| list.iter().any(|v| values_equal(Some(actual), v)))
                .unwrap_or_else(|| {
                    warn!("in/nin condition on field `{}` without a list value", condition.field);
                    false
                });
            if condition.op == FilterOp::In {
                found
            } else {
                !found
            }
        }
        FilterOp::Contains => {
            let (Some(haystack), Some(needle)) =
                (actual.as_ref().and_then(Value::as_str), condition.value.as_str())
            else {
                return false;
            };
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
    }
}

/// Loose equality: numeric when both sides coerce, otherwise stringified.
/// A missing value equals null.
fn values_equal(actual: Option<&Value>, expected: &Value) -> bool {
    let Some(actual) = actual else {
        return expected.is_null();
    };
    if actual.is_null() {
        return expected.is_null();
    }
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a == b;
    }
    actual.to_display_string() == expected.to_display_string()
}
