//! Condition mini-language: `<identifier> <op> <literal>`.
//!
//! Parsing never fails loudly. Anything that does not fit the grammar comes
//! back as [`ParsedCondition::Unparseable`] and evaluates to `false`.

use crate::variables::{display_value, VariableStore};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

fn comparison_regex() -> Result<&'static Regex, &'static regex::Error> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^\s*([A-Za-z_][\w.\[\]]*)\s*(===|!==|==|!=|>=|<=|>|<)\s*(\S.*?)\s*$",
            )
        })
        .as_ref()
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl ComparisonOp {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" | "===" => Some(Self::Eq),
            "!=" | "!==" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed `<identifier> <op> <literal>` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub identifier: String,
    pub op: ComparisonOp,
    /// Literal with surrounding quotes removed.
    pub literal: String,
}

/// 条件解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCondition {
    Comparison(Comparison),
    Unparseable { expression: String, reason: String },
}

impl ParsedCondition {
    pub fn is_parseable(&self) -> bool {
        matches!(self, Self::Comparison(_))
    }

    pub fn evaluate(&self, variables: &VariableStore) -> bool {
        match self {
            Self::Comparison(comparison) => comparison.evaluate(variables),
            Self::Unparseable { .. } => false,
        }
    }
}

/// Parses a condition expression. Total: never panics, never errors.
pub fn parse_condition(expression: &str) -> ParsedCondition {
    let unparseable = |reason: &str| ParsedCondition::Unparseable {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    let re = match comparison_regex() {
        Ok(re) => re,
        Err(_) => return unparseable("comparison pattern unavailable"),
    };
    let Some(caps) = re.captures(expression) else {
        return unparseable("expected `<identifier> <op> <literal>`");
    };
    let Some(op) = ComparisonOp::from_symbol(&caps[2]) else {
        return unparseable("unknown operator");
    };

    ParsedCondition::Comparison(Comparison {
        identifier: caps[1].to_string(),
        op,
        literal: strip_quotes(&caps[3]).to_string(),
    })
}

/// Parses and evaluates `expression`; malformed input yields `false`.
pub fn evaluate_condition(expression: &str, variables: &VariableStore) -> bool {
    let parsed = parse_condition(expression);
    if let ParsedCondition::Unparseable { reason, .. } = &parsed {
        tracing::warn!(expression = %expression, reason = %reason, "unparseable condition treated as no-match");
    }
    parsed.evaluate(variables)
}

impl Comparison {
    /// `==`/`!=` compare string forms; relational operators compare numbers
    /// and are false when either side is absent or not numeric.
    pub fn evaluate(&self, variables: &VariableStore) -> bool {
        let actual = variables.lookup(&self.identifier);
        match self.op {
            ComparisonOp::Eq => actual
                .map(|v| display_value(v) == self.literal)
                .unwrap_or(false),
            ComparisonOp::Ne => actual
                .map(|v| display_value(v) != self.literal)
                .unwrap_or(true),
            op => {
                let (Some(left), Some(right)) = (
                    actual.and_then(numeric_value),
                    parse_number(&self.literal),
                ) else {
                    return false;
                };
                match op {
                    ComparisonOp::Gt => left > right,
                    ComparisonOp::Lt => left < right,
                    ComparisonOp::Ge => left >= right,
                    ComparisonOp::Le => left <= right,
                    ComparisonOp::Eq | ComparisonOp::Ne => false,
                }
            }
        }
    }
}

fn strip_quotes(literal: &str) -> &str {
    let literal = literal.trim();
    for quote in ['"', '\''] {
        if literal.len() >= 2
            && literal.starts_with(quote)
            && literal.ends_with(quote)
        {
            return &literal[1..literal.len() - 1];
        }
    }
    literal
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> VariableStore {
        let mut vars = VariableStore::new();
        vars.set("budget", "high");
        vars.set("score", 72);
        vars.set("age", "30");
        vars.set("lead", json!({ "status": "hot" }));
        vars
    }

    #[test]
    fn test_parse_structure() {
        let parsed = parse_condition(r#"budget == "high""#);
        assert_eq!(
            parsed,
            ParsedCondition::Comparison(Comparison {
                identifier: "budget".into(),
                op: ComparisonOp::Eq,
                literal: "high".into(),
            })
        );

        match parse_condition("score>=50") {
            ParsedCondition::Comparison(c) => {
                assert_eq!(c.op, ComparisonOp::Ge);
                assert_eq!(c.literal, "50");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_is_unparseable_and_false() {
        let malformed = [
            "",
            "budget",
            "budget ==",
            "budget == ",
            "budget ==\t",
            "== high",
            "1x == 2",
            "a ~ b",
        ];
        for expr in malformed {
            let parsed = parse_condition(expr);
            assert!(!parsed.is_parseable(), "{expr} should not parse");
            assert!(!evaluate_condition(expr, &vars()));
        }

        let mut blank = VariableStore::new();
        blank.set("budget", "");
        assert!(!evaluate_condition("budget == ", &blank));
    }

    #[test]
    fn test_equality_uses_string_form() {
        let vars = vars();
        assert!(evaluate_condition("budget == 'high'", &vars));
        assert!(evaluate_condition("budget == high", &vars));
        assert!(evaluate_condition("score == 72", &vars));
        assert!(evaluate_condition("score === \"72\"", &vars));
        assert!(evaluate_condition("budget != low", &vars));
        assert!(evaluate_condition("lead.status == hot", &vars));
    }

    #[test]
    fn test_relational_coerces_numbers() {
        let vars = vars();
        assert!(evaluate_condition("score > 50", &vars));
        assert!(evaluate_condition("age <= 30", &vars));
        assert!(!evaluate_condition("age < 30", &vars));
        assert!(!evaluate_condition("budget > 1", &vars));
        assert!(!evaluate_condition("score > abc", &vars));
    }

    #[test]
    fn test_absent_identifier() {
        let vars = vars();
        assert!(!evaluate_condition("missing == x", &vars));
        assert!(evaluate_condition("missing != x", &vars));
        assert!(!evaluate_condition("missing > 0", &vars));
    }
}
