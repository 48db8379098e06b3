//! Pure tree-walking evaluator.

use assay_core::{Record, Value};
use regex::Regex;

use super::{BinaryOp, Expr, UnaryOp};

/// Absent fields and this sentinel are equally matchable by the regex
/// operators, so a null left operand is substituted with it.
const NOT_APPLICABLE: &str = "Not applicable";

/// Lookup scope for one rule evaluation: the input record overlaid with the
/// working context accumulated by earlier note rules. Notes win on key
/// collision. Missing identifiers resolve to null.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    record: &'a Record,
    notes: &'a Record,
}

impl<'a> Scope<'a> {
    pub fn new(record: &'a Record, notes: &'a Record) -> Self {
        Self { record, notes }
    }

    /// Resolve an identifier; absent names yield null, never a fault.
    pub fn lookup(&self, name: &str) -> Value {
        self.notes
            .get(name)
            .or_else(|| self.record.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Runtime type/shape error raised while evaluating a syntactically valid
/// expression. The chain wraps these into rule logic errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalFault {
    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    Operands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("cannot order {lhs} against {rhs}")]
    Unordered {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("`in` requires a list or string on the right, got {0}")]
    Membership(&'static str),
    #[error("cannot index {0}")]
    NotIndexable(&'static str),
    #[error("list index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("list index must be an integer, got {0}")]
    IndexType(&'static str),
    #[error("regex pattern must be a string, got {0}")]
    PatternType(&'static str),
    #[error("invalid regex pattern `{pattern}`: {detail}")]
    BadPattern { pattern: String, detail: String },
    #[error("unknown accessor `{name}` on {receiver}")]
    UnknownAccessor {
        name: String,
        receiver: &'static str,
    },
    #[error("cannot convert `{value}` via `{name}`")]
    Conversion { name: &'static str, value: String },
    #[error("record literal key evaluated to {0}, expected a string")]
    MapKey(&'static str),
    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),
}

/// Truthiness used by `and`/`or`/`not` and by match-expression results:
/// null, false, zero, and empty strings/lists/records are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(entries) => !entries.is_empty(),
    }
}

pub(super) fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalFault> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => Ok(scope.lookup(name)),
        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, scope)?);
            }
            Ok(Value::List(out))
        }
        Expr::Map(pairs) => {
            let mut out = Record::new();
            for (key_expr, value_expr) in pairs {
                let key = match eval(key_expr, scope)? {
                    Value::Str(s) => s,
                    other => return Err(EvalFault::MapKey(other.type_name())),
                };
                let value = eval(value_expr, scope)?;
                out.insert(key, value);
            }
            Ok(Value::Map(out))
        }
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                UnaryOp::Neg => match value {
                    Value::Int(i) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or(EvalFault::Overflow("-")),
                    Value::Float(x) => Ok(Value::Float(-x)),
                    other => Err(EvalFault::Operands {
                        op: "-",
                        lhs: "nothing",
                        rhs: other.type_name(),
                    }),
                },
            }
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, scope),
        Expr::Index { base, index } => {
            let base = eval(base, scope)?;
            let index = eval(index, scope)?;
            let items = match base {
                Value::List(items) => items,
                other => return Err(EvalFault::NotIndexable(other.type_name())),
            };
            let raw = match index {
                Value::Int(i) => i,
                other => return Err(EvalFault::IndexType(other.type_name())),
            };
            let len = items.len();
            // Negative indexes count from the end.
            let resolved = if raw < 0 { raw + len as i64 } else { raw };
            if resolved < 0 || resolved as usize >= len {
                return Err(EvalFault::IndexOutOfRange { index: raw, len });
            }
            Ok(items[resolved as usize].clone())
        }
        Expr::Accessor { base, name } => {
            let receiver = eval(base, scope)?;
            eval_accessor(name, receiver)
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    scope: &Scope<'_>,
) -> Result<Value, EvalFault> {
    // Boolean operators short-circuit.
    match op {
        BinaryOp::And => {
            let left = eval(lhs, scope)?;
            if !truthy(&left) {
                return Ok(Value::Bool(false));
            }
            let right = eval(rhs, scope)?;
            return Ok(Value::Bool(truthy(&right)));
        }
        BinaryOp::Or => {
            let left = eval(lhs, scope)?;
            if truthy(&left) {
                return Ok(Value::Bool(true));
            }
            let right = eval(rhs, scope)?;
            return Ok(Value::Bool(truthy(&right)));
        }
        _ => {}
    }

    let left = eval(lhs, scope)?;
    let right = eval(rhs, scope)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare_ordered(op, &left, &right)
        }
        BinaryOp::In => Ok(Value::Bool(membership(&left, &right)?)),
        BinaryOp::NotIn => Ok(Value::Bool(!membership(&left, &right)?)),
        BinaryOp::RegexMatch => regex_test(&left, &right, true),
        BinaryOp::RegexSearch => regex_test(&left, &right, false),
        BinaryOp::Add => add(&left, &right),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Structural equality; integers and floats compare numerically, and null is
/// an ordinary value (`null == null` is true).
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(i), Value::Float(x)) | (Value::Float(x), Value::Int(i)) => *i as f64 == *x,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Ordering comparisons: numeric pairs and string pairs compare; anything
/// against null is false; other type mixes are a fault.
fn compare_ordered(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalFault> {
    if matches!(left, Value::Null) || matches!(right, Value::Null) {
        return Ok(Value::Bool(false));
    }

    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (a, b) => match (as_f64(a), as_f64(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalFault::Unordered {
                    lhs: left.type_name(),
                    rhs: right.type_name(),
                });
            }
        },
    };

    // NaN never compares.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("not an ordering operator"),
    };
    Ok(Value::Bool(result))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn membership(needle: &Value, haystack: &Value) -> Result<bool, EvalFault> {
    match haystack {
        Value::List(items) => Ok(items.iter().any(|item| values_equal(needle, item))),
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(s.contains(sub.as_str())),
            other => Err(EvalFault::Operands {
                op: "in",
                lhs: other.type_name(),
                rhs: "string",
            }),
        },
        other => Err(EvalFault::Membership(other.type_name())),
    }
}

/// Regex operators. The pattern is the right operand and must be a string;
/// a null left operand stands in for the "Not applicable" sentinel so that
/// an absent field and the explicit sentinel match the same patterns.
fn regex_test(left: &Value, right: &Value, anchored: bool) -> Result<Value, EvalFault> {
    let pattern = match right {
        Value::Str(s) => s,
        other => return Err(EvalFault::PatternType(other.type_name())),
    };
    let subject = match left {
        Value::Str(s) => s.clone(),
        Value::Null => NOT_APPLICABLE.to_string(),
        other => {
            return Err(EvalFault::Operands {
                op: if anchored { "=~" } else { "=~~" },
                lhs: other.type_name(),
                rhs: "string",
            });
        }
    };

    let effective = if anchored {
        format!("^(?:{})$", pattern)
    } else {
        pattern.clone()
    };
    let regex = Regex::new(&effective).map_err(|e| EvalFault::BadPattern {
        pattern: pattern.clone(),
        detail: e.to_string(),
    })?;
    Ok(Value::Bool(regex.is_match(&subject)))
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalFault> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or(EvalFault::Overflow("+")),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (a, b) => match (as_f64(a), as_f64(b)) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(EvalFault::Operands {
                op: "+",
                lhs: left.type_name(),
                rhs: right.type_name(),
            }),
        },
    }
}

/// Derived accessors on scalars: `to_str`, `to_int`, `lower`, `upper`.
fn eval_accessor(name: &str, receiver: Value) -> Result<Value, EvalFault> {
    match (name, &receiver) {
        ("to_str", Value::Int(i)) => Ok(Value::Str(i.to_string())),
        ("to_str", Value::Float(x)) => Ok(Value::Str(x.to_string())),
        ("to_str", Value::Bool(b)) => Ok(Value::Str(b.to_string())),
        ("to_str", Value::Str(_)) => Ok(receiver),
        ("to_int", Value::Int(_)) => Ok(receiver),
        ("to_int", Value::Float(x)) => Ok(Value::Int(*x as i64)),
        ("to_int", Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalFault::Conversion {
                name: "to_int",
                value: s.clone(),
            }
        }),
        ("lower", Value::Str(s)) => Ok(Value::Str(s.to_lowercase())),
        ("upper", Value::Str(s)) => Ok(Value::Str(s.to_uppercase())),
        _ => Err(EvalFault::UnknownAccessor {
            name: name.to_string(),
            receiver: receiver.type_name(),
        }),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval_str(src: &str, rec: &Record) -> Result<Value, EvalFault> {
        let notes = Record::new();
        Expr::parse(src).unwrap().eval(&Scope::new(rec, &notes))
    }

    fn eval_ok(src: &str, rec: &Record) -> Value {
        eval_str(src, rec).unwrap()
    }

    #[test]
    fn missing_identifier_is_null_not_an_error() {
        let rec = Record::new();
        assert_eq!(eval_ok("missing_field", &rec), Value::Null);
        assert_eq!(eval_ok("missing_field == 'x'", &rec), Value::Bool(false));
        assert_eq!(eval_ok("missing_field == null", &rec), Value::Bool(true));
    }

    #[test]
    fn ordering_against_null_is_false() {
        let rec = record(&[("version", Value::Null)]);
        assert_eq!(eval_ok("version < 2", &rec), Value::Bool(false));
        assert_eq!(eval_ok("version >= 2", &rec), Value::Bool(false));
        assert_eq!(eval_ok("2 > absent", &rec), Value::Bool(false));
    }

    #[test]
    fn numeric_cross_type_equality() {
        let rec = record(&[("umi_size", Value::Int(8))]);
        assert_eq!(eval_ok("umi_size == 8", &rec), Value::Bool(true));
        assert_eq!(eval_ok("umi_size == 8.0", &rec), Value::Bool(true));
        assert_eq!(eval_ok("umi_size != 9", &rec), Value::Bool(true));
        assert_eq!(eval_ok("umi_size <= 8", &rec), Value::Bool(true));
        assert_eq!(eval_ok("umi_size < 8.5", &rec), Value::Bool(true));
    }

    #[test]
    fn string_ordering() {
        let rec = record(&[("name", Value::from("abc"))]);
        assert_eq!(eval_ok("name < 'abd'", &rec), Value::Bool(true));
        assert!(matches!(
            eval_str("name < 3", &rec),
            Err(EvalFault::Unordered { .. })
        ));
    }

    #[test]
    fn boolean_operators_use_truthiness() {
        let rec = record(&[
            ("not_dcwg", Value::Bool(true)),
            ("count", Value::Int(0)),
            ("label", Value::from("")),
        ]);
        assert_eq!(eval_ok("not_dcwg and is_derived == null", &rec), Value::Bool(true));
        assert_eq!(eval_ok("count or label", &rec), Value::Bool(false));
        assert_eq!(eval_ok("not count", &rec), Value::Bool(true));
        // Short-circuit: the failing right side never evaluates.
        assert_eq!(eval_ok("count and (1 in 2)", &rec), Value::Bool(false));
    }

    #[test]
    fn membership_in_lists_and_strings() {
        let rec = record(&[(
            "assay_type",
            Value::from("snRNAseq"),
        )]);
        assert_eq!(
            eval_ok("assay_type in ['snRNAseq', 'scRNAseq']", &rec),
            Value::Bool(true)
        );
        assert_eq!(
            eval_ok("assay_type not in ['CODEX']", &rec),
            Value::Bool(true)
        );
        assert_eq!(eval_ok("'RNA' in assay_type", &rec), Value::Bool(true));
        assert!(matches!(
            eval_str("assay_type in 5", &rec),
            Err(EvalFault::Membership("int"))
        ));
        // Null right side cannot be coerced to a list.
        assert!(matches!(
            eval_str("assay_type in absent_list", &rec),
            Err(EvalFault::Membership("null"))
        ));
    }

    #[test]
    fn membership_against_identifier_list() {
        let rec = record(&[(
            "data_types",
            Value::List(vec![Value::from("codex_cytokit")]),
        )]);
        assert_eq!(
            eval_ok("'codex_cytokit' in data_types", &rec),
            Value::Bool(true)
        );
        assert_eq!(eval_ok("data_types[0]", &rec), Value::from("codex_cytokit"));
        assert_eq!(eval_ok("data_types[-1]", &rec), Value::from("codex_cytokit"));
        assert!(matches!(
            eval_str("data_types[3]", &rec),
            Err(EvalFault::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn extreme_negative_index_is_out_of_range() {
        let rec = record(&[(
            "data_types",
            Value::List(vec![Value::from("codex_cytokit")]),
        )]);
        // Most negative representable index: resolves cleanly, no wrap.
        assert!(matches!(
            eval_str("data_types['-9223372036854775808'.to_int]", &rec),
            Err(EvalFault::IndexOutOfRange {
                index: i64::MIN,
                len: 1
            })
        ));
    }

    #[test]
    fn regex_search_and_anchored_match() {
        let rec = record(&[("barcode_read", Value::from("Read 1"))]);
        assert_eq!(
            eval_ok("barcode_read =~~ 'Read'", &rec),
            Value::Bool(true)
        );
        // Anchored form requires the whole string to match.
        assert_eq!(eval_ok("barcode_read =~ 'Read'", &rec), Value::Bool(false));
        assert_eq!(
            eval_ok("barcode_read =~ 'Read [12]'", &rec),
            Value::Bool(true)
        );
        // Case sensitive.
        assert_eq!(eval_ok("barcode_read =~~ 'read'", &rec), Value::Bool(false));
    }

    #[test]
    fn regex_null_operand_matches_not_applicable() {
        let rec = record(&[("umi_read", Value::from("Not applicable"))]);
        assert_eq!(
            eval_ok("umi_read =~~ 'Not applicable'", &rec),
            Value::Bool(true)
        );
        // Absent field behaves like the sentinel string.
        assert_eq!(
            eval_ok("missing_read =~~ 'Not applicable'", &rec),
            Value::Bool(true)
        );
        assert_eq!(
            eval_ok("missing_read =~ 'Read 1'", &rec),
            Value::Bool(false)
        );
    }

    #[test]
    fn bad_regex_pattern_is_a_fault() {
        let rec = Record::new();
        assert!(matches!(
            eval_str("x =~~ '('", &rec),
            Err(EvalFault::BadPattern { .. })
        ));
    }

    #[test]
    fn concat_and_arithmetic() {
        let rec = record(&[("version", Value::Int(2))]);
        assert_eq!(
            eval_ok("'rnaseq-v' + version.to_str", &rec),
            Value::from("rnaseq-v2")
        );
        assert_eq!(eval_ok("1 + 2", &rec), Value::Int(3));
        assert_eq!(eval_ok("1 + 2.5", &rec), Value::Float(3.5));
        assert_eq!(eval_ok("-version", &rec), Value::Int(-2));
        assert!(matches!(
            eval_str("'a' + 1", &rec),
            Err(EvalFault::Operands { op: "+", .. })
        ));
    }

    #[test]
    fn accessors() {
        let rec = record(&[
            ("version", Value::from("3")),
            ("stain", Value::from("PAS")),
        ]);
        assert_eq!(eval_ok("version.to_int", &rec), Value::Int(3));
        assert_eq!(eval_ok("stain.lower", &rec), Value::from("pas"));
        assert_eq!(eval_ok("stain.upper", &rec), Value::from("PAS"));
        assert!(matches!(
            eval_str("stain.to_float", &rec),
            Err(EvalFault::UnknownAccessor { .. })
        ));
        assert!(matches!(
            eval_str("stain.to_int", &rec),
            Err(EvalFault::Conversion { .. })
        ));
    }

    #[test]
    fn record_literal_evaluates_values() {
        let rec = record(&[("version", Value::Int(1))]);
        let value = eval_ok(
            "{'assaytype': 'CODEX', 'tbl-schema': 'codex-v' + version.to_str}",
            &rec,
        );
        match value {
            Value::Map(m) => {
                assert_eq!(m["assaytype"], Value::from("CODEX"));
                assert_eq!(m["tbl-schema"], Value::from("codex-v1"));
            }
            other => panic!("expected record, got {}", other.type_name()),
        }
    }

    #[test]
    fn notes_override_record_fields() {
        let rec = record(&[("flag", Value::Bool(false))]);
        let notes = record(&[("flag", Value::Bool(true))]);
        let expr = Expr::parse("flag == true").unwrap();
        let value = expr.eval(&Scope::new(&rec, &notes)).unwrap();
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn evaluation_never_mutates_the_scope() {
        let rec = record(&[("a", Value::Int(1))]);
        let notes = Record::new();
        let before = rec.clone();
        let expr = Expr::parse("{'k': a + 1} == {'k': 2}").unwrap();
        expr.eval(&Scope::new(&rec, &notes)).unwrap();
        assert_eq!(rec, before);
    }
}
