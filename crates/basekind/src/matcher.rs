//! Ordered tag-rule matching.
//!
//! A [`MatchIndex`] is a list of [`Rule`]s. Each rule is a conjunction of
//! [`Predicate`]s plus a list of [`Action`]s. Evaluation folds the actions of
//! every matching rule, in declaration order, into a [`MatchResult`]: a later
//! rule overwrites what an earlier one set for the same attribute, and an
//! explicit clear stays distinguishable from "never set".

use std::collections::{BTreeMap, HashMap};

use crate::error::RuleError;
use crate::feature::{GeometryFlags, Tags};

/// Literal attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A single test against a feature's tags or geometry kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `key` has exactly `value`.
    Tag { key: String, value: String },
    /// `key` has one of `values`.
    AnyOf { key: String, values: Vec<String> },
    /// `key` is absent or has none of `values`.
    MissingFrom { key: String, values: Vec<String> },
    HasKey(String),
    NoKey(String),
    Point,
    Line,
    Polygon,
}

impl Predicate {
    pub fn tag(key: &str, value: &str) -> Self {
        Predicate::Tag { key: key.to_owned(), value: value.to_owned() }
    }

    pub fn any_of<'a>(key: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        Predicate::AnyOf {
            key: key.to_owned(),
            values: values.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn missing_from<'a>(key: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        Predicate::MissingFrom {
            key: key.to_owned(),
            values: values.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn has_key(key: &str) -> Self {
        Predicate::HasKey(key.to_owned())
    }

    pub fn no_key(key: &str) -> Self {
        Predicate::NoKey(key.to_owned())
    }

    pub fn test<T: Tags + ?Sized>(&self, tags: &T, geometry: GeometryFlags) -> bool {
        match self {
            Predicate::Tag { key, value } => tags.value(key) == Some(value.as_str()),
            Predicate::AnyOf { key, values } => tags
                .value(key)
                .is_some_and(|v| values.iter().any(|x| x == v)),
            Predicate::MissingFrom { key, values } => !tags
                .value(key)
                .is_some_and(|v| values.iter().any(|x| x == v)),
            Predicate::HasKey(key) => tags.value(key).is_some(),
            Predicate::NoKey(key) => tags.value(key).is_none(),
            Predicate::Point => geometry.point,
            Predicate::Line => geometry.line,
            Predicate::Polygon => geometry.polygon,
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            Predicate::Tag { key, .. }
            | Predicate::AnyOf { key, .. }
            | Predicate::MissingFrom { key, .. }
            | Predicate::HasKey(key)
            | Predicate::NoKey(key) => Some(key),
            Predicate::Point | Predicate::Line | Predicate::Polygon => None,
        }
    }
}

/// What a matching rule does to the result.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set { attr: String, value: Value },
    /// Copy the raw tag value; an absent tag clears the attribute.
    FromTag { attr: String, key: String },
    Clear { attr: String },
}

impl Action {
    fn attr(&self) -> &str {
        match self {
            Action::Set { attr, .. } | Action::FromTag { attr, .. } | Action::Clear { attr } => attr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    predicates: Vec<Predicate>,
    actions: Vec<Action>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn set(mut self, attr: &str, value: impl Into<Value>) -> Self {
        self.actions.push(Action::Set { attr: attr.to_owned(), value: value.into() });
        self
    }

    pub fn from_tag(mut self, attr: &str, key: &str) -> Self {
        self.actions.push(Action::FromTag { attr: attr.to_owned(), key: key.to_owned() });
        self
    }

    pub fn clear(mut self, attr: &str) -> Self {
        self.actions.push(Action::Clear { attr: attr.to_owned() });
        self
    }

    #[inline]
    pub fn matches<T: Tags + ?Sized>(&self, tags: &T, geometry: GeometryFlags) -> bool {
        self.predicates.iter().all(|p| p.test(tags, geometry))
    }

    fn apply<T: Tags + ?Sized>(&self, tags: &T, out: &mut MatchResult) {
        for action in &self.actions {
            let slot = match action {
                Action::Set { value, .. } => Slot::Value(value.clone()),
                Action::FromTag { key, .. } => match tags.raw(key) {
                    Some(v) => Slot::Value(Value::Str(v.to_owned())),
                    None => Slot::Cleared,
                },
                Action::Clear { .. } => Slot::Cleared,
            };
            out.slots.insert(action.attr().to_owned(), slot);
        }
    }
}

/// State of one attribute in a [`MatchResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Cleared,
}

/// Folded attributes of all rules that matched one feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    slots: BTreeMap<String, Slot>,
}

impl MatchResult {
    /// True when no rule matched.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, attr: &str) -> Option<&Slot> {
        self.slots.get(attr)
    }

    /// The value of `attr`, or `None` when it was never set or was cleared.
    pub fn get(&self, attr: &str) -> Option<&Value> {
        match self.slots.get(attr) {
            Some(Slot::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_cleared(&self, attr: &str) -> bool {
        matches!(self.slots.get(attr), Some(Slot::Cleared))
    }

    pub fn string(&self, attr: &str) -> Option<String> {
        match self.get(attr)? {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Bool(b) => Some(b.to_string()),
        }
    }

    /// Integer view; decimal strings (Natural Earth `min_zoom` = "1.7") are
    /// rounded, anything unparseable reads as absent.
    pub fn integer(&self, attr: &str) -> Option<i64> {
        match self.get(attr)? {
            Value::Int(i) => Some(*i),
            Value::Str(s) => parse_rounded(s),
            Value::Bool(_) => None,
        }
    }

    pub fn boolean(&self, attr: &str) -> Option<bool> {
        match self.get(attr)? {
            Value::Bool(b) => Some(*b),
            Value::Str(s) => match s.as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Value::Int(i) => Some(*i != 0),
        }
    }
}

pub(crate) fn parse_rounded(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    if !f.is_finite() || f.abs() > i64::MAX as f64 {
        return None;
    }
    Some(f.round() as i64)
}

/// Validated, immutable list of rules.
#[derive(Debug, Clone)]
pub struct MatchIndex {
    rules: Vec<Rule>,
}

impl MatchIndex {
    /// Build an index, rejecting malformed rule lists up front.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let mut literal_types: HashMap<&str, &'static str> = HashMap::new();

        for (idx, rule) in rules.iter().enumerate() {
            if rule.actions.is_empty() {
                return Err(RuleError::NoActions { rule: idx });
            }

            for p in &rule.predicates {
                if p.key().is_some_and(str::is_empty) {
                    return Err(RuleError::EmptyKey { rule: idx });
                }
                if let Predicate::AnyOf { key, values } | Predicate::MissingFrom { key, values } = p {
                    if values.is_empty() {
                        return Err(RuleError::EmptyValueSet { rule: idx, key: key.clone() });
                    }
                }
            }

            for action in &rule.actions {
                if action.attr().is_empty() {
                    return Err(RuleError::EmptyAttribute { rule: idx });
                }
                match action {
                    Action::FromTag { key, .. } if key.is_empty() => {
                        return Err(RuleError::EmptyKey { rule: idx });
                    }
                    Action::Set { attr, value } => {
                        let found = value.type_name();
                        let expected = *literal_types.entry(attr.as_str()).or_insert(found);
                        if expected != found {
                            return Err(RuleError::InconsistentType {
                                rule: idx,
                                attr: attr.clone(),
                                expected,
                                found,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate<T: Tags + ?Sized>(&self, tags: &T, geometry: GeometryFlags) -> MatchResult {
        let mut out = MatchResult::default();
        for rule in &self.rules {
            if rule.matches(tags, geometry) {
                rule.apply(tags, &mut out);
            }
        }
        out
    }
}
