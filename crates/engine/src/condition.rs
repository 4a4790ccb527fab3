//! Scope condition expressions.
//!
//! A constraint's scope may carry a condition that narrows which events it
//! governs beyond action and target:
//!
//! ```text
//! target == "Ally" OR target == "Mentor"
//! actor STARTS_WITH "the captain"
//! target MATCHES "^(Ally|Mentor)$"
//! sequence_index > 40 AND NOT justified == true
//! voluntariness != "coerced"
//! ```
//!
//! Grammar (informal):
//! ```text
//! expr     = conj ("OR" conj)*
//! conj     = clause ("AND" clause)*
//! clause   = "NOT" clause | "(" expr ")" | atom
//! atom     = field ["NOT"] TEXT_OP value | field CMP_OP value
//! field    = "actor" | "action" | "target" | "voluntariness"
//!          | "sequence_index" | "narrative_time" | "justified"
//! TEXT_OP  = "CONTAINS" | "MATCHES" | "STARTS_WITH" | "ENDS_WITH"
//! CMP_OP   = "==" | "!=" | ">" | "<" | ">=" | "<="
//! value    = QUOTED_STRING | NUMBER | IDENT
//! ```
//!
//! Text comparisons are case-insensitive; `MATCHES` uses the pattern as
//! written. Patterns are compiled once, when the condition is parsed.

use loreguard_core::Event;
use loreguard_core::constraint::normalize_term;
use regex_lite::Regex;

/// A parsed condition tree.
#[derive(Debug, Clone)]
pub enum Condition {
    /// A single comparison.
    Atom(Atom),
    /// Logical AND of two sub-conditions.
    And(Box<Condition>, Box<Condition>),
    /// Logical OR of two sub-conditions.
    Or(Box<Condition>, Box<Condition>),
    /// Negation.
    Not(Box<Condition>),
    /// Always true (empty condition).
    Always,
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub field: Field,
    pub op: Op,
    pub value: Value,
}

/// An event field referenced in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Actor,
    Action,
    Target,
    Voluntariness,
    SequenceIndex,
    NarrativeTime,
    Justified,
}

/// Comparison operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Contains,
    NotContains,
    Matches,
    NotMatches,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// A literal value in a condition.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Num(f64),
    /// Compiled `MATCHES` pattern.
    Pattern(Regex),
}

impl Condition {
    /// Evaluate this condition against an event.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Condition::Always => true,
            Condition::Atom(atom) => atom.evaluate(event),
            Condition::And(a, b) => a.evaluate(event) && b.evaluate(event),
            Condition::Or(a, b) => a.evaluate(event) || b.evaluate(event),
            Condition::Not(inner) => !inner.evaluate(event),
        }
    }
}

impl Atom {
    fn evaluate(&self, event: &Event) -> bool {
        let field_value = self.resolve_field(event);
        let raw = field_value.as_deref();
        let folded = raw.map(normalize_term);
        let needle = self.value.folded();
        let needle = needle.as_str();

        match &self.op {
            Op::Contains => folded.is_some_and(|fv| fv.contains(needle)),
            Op::NotContains => folded.is_none_or(|fv| !fv.contains(needle)),
            Op::StartsWith => folded.is_some_and(|fv| fv.starts_with(needle)),
            Op::NotStartsWith => folded.is_none_or(|fv| !fv.starts_with(needle)),
            Op::EndsWith => folded.is_some_and(|fv| fv.ends_with(needle)),
            Op::NotEndsWith => folded.is_none_or(|fv| !fv.ends_with(needle)),
            Op::Matches => match &self.value {
                Value::Pattern(re) => raw.is_some_and(|fv| re.is_match(fv)),
                _ => false,
            },
            Op::NotMatches => match &self.value {
                Value::Pattern(re) => raw.is_none_or(|fv| !re.is_match(fv)),
                _ => true,
            },
            Op::Eq => match (&folded, &self.value) {
                (Some(fv), Value::Num(n)) => fv
                    .parse::<f64>()
                    .is_ok_and(|x| (x - n).abs() < f64::EPSILON),
                (Some(fv), _) => fv == needle,
                (None, _) => false,
            },
            Op::NotEq => match (&folded, &self.value) {
                (Some(fv), Value::Num(n)) => fv
                    .parse::<f64>()
                    .is_ok_and(|x| (x - n).abs() >= f64::EPSILON),
                (Some(fv), _) => fv != needle,
                (None, _) => true,
            },
            Op::Gt => self.compare_num(raw, |a, b| a > b),
            Op::Lt => self.compare_num(raw, |a, b| a < b),
            Op::Gte => self.compare_num(raw, |a, b| a >= b),
            Op::Lte => self.compare_num(raw, |a, b| a <= b),
        }
    }

    fn resolve_field(&self, event: &Event) -> Option<String> {
        match self.field {
            Field::Actor => Some(event.actor.clone()),
            Field::Action => Some(event.action.clone()),
            Field::Target => event.target.clone(),
            Field::Voluntariness => Some(event.voluntariness.to_string()),
            Field::SequenceIndex => Some(event.sequence_index.to_string()),
            Field::NarrativeTime => event.narrative_time.map(|t| t.to_string()),
            Field::Justified => Some(event.justified.to_string()),
        }
    }

    fn compare_num(&self, field_value: Option<&str>, cmp: impl Fn(f64, f64) -> bool) -> bool {
        match (field_value, &self.value) {
            (Some(fv), Value::Num(n)) => fv.trim().parse::<f64>().is_ok_and(|x| cmp(x, *n)),
            _ => false,
        }
    }
}

impl Value {
    /// Comparison form of the literal.
    fn folded(&self) -> String {
        match self {
            Value::Str(s) => normalize_term(s),
            Value::Num(n) => n.to_string(),
            Value::Pattern(re) => re.as_str().to_string(),
        }
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

/// Parse a condition expression string into a [`Condition`] tree.
///
/// Returns `Ok(Condition::Always)` for empty input.
pub fn parse_condition(input: &str) -> Result<Condition, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Condition::Always);
    }
    let mut parser = Parser::new(tokenize(input)?);
    let cond = parser.disjunction()?;
    match parser.tokens.next() {
        None => Ok(cond),
        Some(extra) => Err(format!("unexpected token after expression: {extra:?}")),
    }
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "actor" => Field::Actor,
            "action" => Field::Action,
            "target" => Field::Target,
            "voluntariness" => Field::Voluntariness,
            "sequence_index" => Field::SequenceIndex,
            "narrative_time" => Field::NarrativeTime,
            "justified" => Field::Justified,
            _ => return None,
        })
    }
}

/// Lexical units. Keywords stay words and are recognized by the parser.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Num(f64),
    Sym(&'static str),
}

/// Two-character symbols first, so `>=` is not read as `>`.
const SYMBOLS: [&str; 8] = ["==", "!=", ">=", "<=", ">", "<", "(", ")"];

/// Text operators with their `NOT`-prefixed counterparts.
const TEXT_OPS: [(&str, Op, Op); 4] = [
    ("CONTAINS", Op::Contains, Op::NotContains),
    ("MATCHES", Op::Matches, Op::NotMatches),
    ("STARTS_WITH", Op::StartsWith, Op::NotStartsWith),
    ("ENDS_WITH", Op::EndsWith, Op::NotEndsWith),
];

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while let Some(c) = rest.chars().next() {
        let tail = if let Some(sym) = SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
            tokens.push(Token::Sym(sym));
            &rest[sym.len()..]
        } else if c == '"' || c == '\'' {
            let (text, tail) = lex_string(rest, c)?;
            tokens.push(Token::Str(text));
            tail
        } else if c.is_ascii_digit() || c == '-' {
            let (digits, _) = split_while(&rest[1..], |ch| ch.is_ascii_digit() || ch == '.');
            let (literal, tail) = rest.split_at(1 + digits.len());
            let n = literal
                .parse::<f64>()
                .map_err(|_| format!("invalid number: {literal}"))?;
            tokens.push(Token::Num(n));
            tail
        } else if c.is_alphanumeric() || c == '_' {
            let (word, tail) = split_while(rest, |ch| ch.is_alphanumeric() || ch == '_');
            tokens.push(Token::Word(word.to_string()));
            tail
        } else {
            return Err(format!("unexpected character: {c}"));
        };
        rest = tail.trim_start();
    }

    Ok(tokens)
}

fn split_while(s: &str, keep: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|&(_, ch)| !keep(ch))
        .map_or(s.len(), |(i, _)| i);
    s.split_at(end)
}

/// Read a quoted literal starting at `rest[0]`; backslash escapes the next char.
fn lex_string(rest: &str, quote: char) -> Result<(String, &str), String> {
    let mut text = String::new();
    let mut escaped = false;
    for (i, ch) in rest.char_indices().skip(1) {
        if escaped {
            text.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Ok((text, &rest[i + ch.len_utf8()..]));
        } else {
            text.push(ch);
        }
    }
    Err("unterminated string literal".into())
}

/// Recursive-descent parser over a token cursor. `AND` binds tighter than `OR`.
struct Parser {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token>>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn eat_word(&mut self, keyword: &str) -> bool {
        let hit = matches!(
            self.tokens.peek(),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword)
        );
        if hit {
            self.tokens.next();
        }
        hit
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        let hit = matches!(self.tokens.peek(), Some(Token::Sym(s)) if *s == sym);
        if hit {
            self.tokens.next();
        }
        hit
    }

    fn disjunction(&mut self) -> Result<Condition, String> {
        let mut left = self.conjunction()?;
        while self.eat_word("OR") {
            let right = self.conjunction()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Condition, String> {
        let mut left = self.clause()?;
        while self.eat_word("AND") {
            let right = self.clause()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `NOT clause`, a parenthesized expression, or a comparison.
    fn clause(&mut self) -> Result<Condition, String> {
        if self.eat_word("NOT") {
            return Ok(Condition::Not(Box::new(self.clause()?)));
        }
        if self.eat_sym("(") {
            let inner = self.disjunction()?;
            if !self.eat_sym(")") {
                return Err("expected closing parenthesis".into());
            }
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Condition, String> {
        let field = match self.tokens.next() {
            Some(Token::Word(name)) => {
                Field::from_name(&name).ok_or_else(|| format!("unknown field: {name}"))?
            }
            other => return Err(format!("expected field name, got {other:?}")),
        };
        let op = self.operator()?;
        let value = match (&op, self.literal()?) {
            (Op::Matches | Op::NotMatches, Value::Str(pattern)) => Value::Pattern(
                Regex::new(&pattern).map_err(|e| format!("invalid pattern {pattern:?}: {e}"))?,
            ),
            (Op::Matches | Op::NotMatches, other) => {
                return Err(format!("MATCHES expects a string pattern, got {other:?}"));
            }
            (_, value) => value,
        };
        Ok(Condition::Atom(Atom { field, op, value }))
    }

    /// A comparison symbol, or a text operator optionally prefixed by `NOT`.
    fn operator(&mut self) -> Result<Op, String> {
        let negated = self.eat_word("NOT");
        match self.tokens.next() {
            Some(Token::Word(word)) => TEXT_OPS
                .iter()
                .find(|(name, _, _)| word.eq_ignore_ascii_case(name))
                .map(|(_, op, not_op)| if negated { not_op.clone() } else { op.clone() })
                .ok_or_else(|| format!("expected operator, got {word}")),
            Some(Token::Sym(sym)) if negated => Err(format!("cannot negate operator: {sym}")),
            Some(Token::Sym(sym)) => match sym {
                "==" => Ok(Op::Eq),
                "!=" => Ok(Op::NotEq),
                ">" => Ok(Op::Gt),
                "<" => Ok(Op::Lt),
                ">=" => Ok(Op::Gte),
                "<=" => Ok(Op::Lte),
                other => Err(format!("expected operator, got {other}")),
            },
            other => Err(format!("expected operator, got {other:?}")),
        }
    }

    /// A quoted string, a number, or a bare word read as a string.
    fn literal(&mut self) -> Result<Value, String> {
        match self.tokens.next() {
            Some(Token::Str(s) | Token::Word(s)) => Ok(Value::Str(s)),
            Some(Token::Num(n)) => Ok(Value::Num(n)),
            other => Err(format!("expected value (string or number), got {other:?}")),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use loreguard_core::{EventRecord, Voluntariness};

    fn event(target: &str) -> Event {
        EventRecord::new(42, "Protagonist", "betray")
            .with_target(target)
            .with_voluntariness(Voluntariness::Voluntary)
            .into_event(0)
            .unwrap()
    }

    #[test]
    fn parse_simple_equality_is_case_insensitive() {
        let cond = parse_condition(r#"target == "ally""#).unwrap();
        assert!(cond.evaluate(&event("Ally")));
        assert!(!cond.evaluate(&event("Rival")));
    }

    #[test]
    fn parse_or_expression() {
        let cond = parse_condition(r#"target == "Ally" OR target == "Mentor""#).unwrap();
        assert!(cond.evaluate(&event("Mentor")));
        assert!(cond.evaluate(&event("Ally")));
        assert!(!cond.evaluate(&event("Stranger")));
    }

    #[test]
    fn parse_and_with_negated_operator() {
        let cond =
            parse_condition(r#"actor CONTAINS "protag" AND target NOT CONTAINS "rival""#).unwrap();
        assert!(cond.evaluate(&event("Ally")));
        assert!(!cond.evaluate(&event("Old Rival")));
    }

    #[test]
    fn parse_regex_matches() {
        let cond = parse_condition(r#"target MATCHES "^(Ally|Mentor)$""#).unwrap();
        assert!(cond.evaluate(&event("Ally")));
        assert!(!cond.evaluate(&event("ally's horse")));
    }

    #[test]
    fn parse_numeric_comparison() {
        let cond = parse_condition("sequence_index >= 40").unwrap();
        assert!(cond.evaluate(&event("Ally")));

        let cond = parse_condition("sequence_index < 10").unwrap();
        assert!(!cond.evaluate(&event("Ally")));
    }

    #[test]
    fn parse_enum_and_bool_fields() {
        let cond = parse_condition(r#"voluntariness == voluntary AND justified == false"#).unwrap();
        assert!(cond.evaluate(&event("Ally")));

        let cond = parse_condition(r#"voluntariness != "voluntary""#).unwrap();
        assert!(!cond.evaluate(&event("Ally")));
    }

    #[test]
    fn logical_not_and_parentheses() {
        let cond = parse_condition(r#"NOT (target == "Ally" OR target == "Mentor")"#).unwrap();
        assert!(!cond.evaluate(&event("Ally")));
        assert!(cond.evaluate(&event("Stranger")));

        let cond = parse_condition(r#"NOT target == "Ally""#).unwrap();
        assert!(cond.evaluate(&event("Stranger")));
    }

    #[test]
    fn missing_target_fails_positive_and_passes_negative_ops() {
        let untargeted = EventRecord::new(1, "protagonist", "flee")
            .into_event(0)
            .unwrap();
        assert!(!parse_condition(r#"target CONTAINS "a""#).unwrap().evaluate(&untargeted));
        assert!(parse_condition(r#"target NOT CONTAINS "a""#).unwrap().evaluate(&untargeted));
    }

    #[test]
    fn empty_condition_is_always() {
        let cond = parse_condition("  ").unwrap();
        assert!(matches!(cond, Condition::Always));
        assert!(cond.evaluate(&event("anyone")));
    }

    #[test]
    fn keywords_ignore_case_and_quotes_may_escape() {
        let cond = parse_condition(r#"not (target ends_with 'y' or target == "O\"Hara")"#).unwrap();
        assert!(!cond.evaluate(&event("Ally")));
        assert!(!cond.evaluate(&event("O\"Hara")));
        assert!(cond.evaluate(&event("Mentor")));
    }

    #[test]
    fn invalid_condition_rejects() {
        assert!(parse_condition("CONTAINS").is_err());
        assert!(parse_condition(r#"target BADOP "y""#).is_err());
        assert!(parse_condition(r#"mood == "sad""#).is_err());
        assert!(parse_condition(r#"target MATCHES "(unclosed""#).is_err());
        assert!(parse_condition(r#"(target == "a""#).is_err());
        assert!(parse_condition(r#"target > "a" extra"#).is_err());
        assert!(parse_condition(r#"target NOT == "a""#).is_err());
        assert!(parse_condition(r#"target == 'open"#).is_err());
    }
}
