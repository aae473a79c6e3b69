//! Test categorisation markers
//!
//! Tests are tagged with marker names and selected with a boolean
//! expression in `TEST_MARKERS`, e.g. `unit and not slow` or
//! `(integration or e2e) and not slow`. Precedence is `not`, then `and`,
//! then `or`. An unset or empty expression selects every test.
//!
//! ```rust,ignore
//! #[test]
//! fn indexes_a_large_corpus() {
//!     atlas_test_utils::require_markers!("integration", "slow");
//!     // ... runs only when the selection allows it
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use atlas_shared_config::{EnvProvider, SystemEnv};
use thiserror::Error;

/// Variable holding the marker selection expression
pub const TEST_MARKERS: &str = "TEST_MARKERS";

pub const UNIT: &str = "unit";
pub const INTEGRATION: &str = "integration";
pub const E2E: &str = "e2e";
pub const SLOW: &str = "slow";

/// Marker lines registered for every session, in `name: description` form
pub const STANDARD_MARKERS: [&str; 4] = [
    "unit: Unit tests",
    "integration: Integration tests",
    "e2e: End-to-end tests",
    "slow: Slow running tests",
];

/// Marker parsing and selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    #[error("invalid marker name '{0}'")]
    InvalidName(String),

    #[error("'{0}' not found in registered markers")]
    Unknown(String),

    #[error("unexpected '{token}' at offset {offset} in marker expression")]
    UnexpectedToken { token: String, offset: usize },

    #[error("unexpected end of marker expression")]
    UnexpectedEnd,
}

pub type MarkerResult<T> = Result<T, MarkerError>;

/// A named tag with a human-readable description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    name: String,
    description: String,
}

impl Marker {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> MarkerResult<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(MarkerError::InvalidName(name));
        }
        Ok(Self {
            name,
            description: description.into(),
        })
    }

    /// Parse a `name: description` line; the description is optional
    pub fn parse_line(line: &str) -> MarkerResult<Self> {
        let (name, description) = line.split_once(':').unwrap_or((line, ""));
        Self::new(name.trim(), description.trim())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.description)
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(name, "and" | "or" | "not")
}

/// Set of markers the runner accepts without warning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerRegistry {
    markers: BTreeMap<String, Marker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker; returns `false` if the name was already registered
    ///
    /// Re-registering keeps the first description.
    pub fn register(&mut self, marker: Marker) -> bool {
        if self.markers.contains_key(marker.name()) {
            return false;
        }
        self.markers.insert(marker.name.clone(), marker);
        true
    }

    /// Register a `name: description` line
    pub fn register_line(&mut self, line: &str) -> MarkerResult<bool> {
        Ok(self.register(Marker::parse_line(line)?))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    /// Markers in name order
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Register `unit`, `integration`, `e2e` and `slow`; idempotent
pub fn register_markers(registry: &mut MarkerRegistry) {
    for line in STANDARD_MARKERS {
        match Marker::parse_line(line) {
            Ok(marker) => {
                registry.register(marker);
            }
            Err(err) => {
                tracing::error!(line, error = %err, "malformed standard marker line");
                debug_assert!(false, "malformed standard marker line {line:?}: {err}");
            }
        }
    }
}

/// The process-wide registry, holding the standard markers
pub fn registry() -> &'static MarkerRegistry {
    static REGISTRY: OnceLock<MarkerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = MarkerRegistry::new();
        register_markers(&mut registry);
        registry
    })
}

/// Parsed marker selection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerExpr {
    Marker(String),
    Not(Box<MarkerExpr>),
    And(Box<MarkerExpr>, Box<MarkerExpr>),
    Or(Box<MarkerExpr>, Box<MarkerExpr>),
}

impl MarkerExpr {
    pub fn parse(input: &str) -> MarkerResult<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some((token, offset)) => Err(MarkerError::UnexpectedToken {
                token: token.to_string(),
                offset: *offset,
            }),
        }
    }

    /// Evaluate against the tags a test carries
    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        match self {
            Self::Marker(name) => tags.iter().any(|tag| tag.as_ref() == name),
            Self::Not(inner) => !inner.matches(tags),
            Self::And(lhs, rhs) => lhs.matches(tags) && rhs.matches(tags),
            Self::Or(lhs, rhs) => lhs.matches(tags) || rhs.matches(tags),
        }
    }

    /// Every marker name the expression mentions, in order of appearance
    pub fn marker_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    /// Reject names that are not registered
    pub fn validate(&self, registry: &MarkerRegistry) -> MarkerResult<()> {
        match self.marker_names().into_iter().find(|name| !registry.contains(name)) {
            Some(unknown) => Err(MarkerError::Unknown(unknown.to_string())),
            None => Ok(()),
        }
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Marker(name) => names.push(name),
            Self::Not(inner) => inner.collect_names(names),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
        }
    }
}

impl fmt::Display for MarkerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker(name) => f.write_str(name),
            Self::Not(inner) => write!(f, "not {}", inner),
            Self::And(lhs, rhs) => write!(f, "({} and {})", lhs, rhs),
            Self::Or(lhs, rhs) => write!(f, "({} or {})", lhs, rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Not => f.write_str("not"),
            Self::Ident(name) => f.write_str(name),
        }
    }
}

fn tokenize(input: &str) -> MarkerResult<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push((Token::LParen, offset)),
            ')' => tokens.push((Token::RParen, offset)),
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ if is_valid_name(&word) => Token::Ident(word),
                    _ => return Err(MarkerError::InvalidName(word)),
                };
                tokens.push((token, offset));
            }
            other => {
                return Err(MarkerError::UnexpectedToken {
                    token: other.to_string(),
                    offset,
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn parse_or(&mut self) -> MarkerResult<MarkerExpr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = MarkerExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> MarkerResult<MarkerExpr> {
        let mut lhs = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = MarkerExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> MarkerResult<MarkerExpr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(MarkerExpr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> MarkerResult<MarkerExpr> {
        match self.next() {
            Some((Token::Ident(name), _)) => Ok(MarkerExpr::Marker(name)),
            Some((Token::LParen, _)) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((token, offset)) => Err(MarkerError::UnexpectedToken {
                        token: token.to_string(),
                        offset,
                    }),
                    None => Err(MarkerError::UnexpectedEnd),
                }
            }
            Some((token, offset)) => Err(MarkerError::UnexpectedToken {
                token: token.to_string(),
                offset,
            }),
            None => Err(MarkerError::UnexpectedEnd),
        }
    }
}

/// Which tests run this session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSelection {
    expr: Option<MarkerExpr>,
}

impl MarkerSelection {
    /// Select every test
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse an expression; blank input selects every test
    pub fn parse(input: &str) -> MarkerResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::all());
        }
        Ok(Self {
            expr: Some(MarkerExpr::parse(input)?),
        })
    }

    /// Read `TEST_MARKERS`, rejecting names `registry` does not know
    pub fn from_provider(env: &impl EnvProvider, registry: &MarkerRegistry) -> MarkerResult<Self> {
        let selection = Self::parse(&env.get(TEST_MARKERS).unwrap_or_default())?;
        if let Some(expr) = &selection.expr {
            expr.validate(registry)?;
        }
        Ok(selection)
    }

    pub fn from_env() -> MarkerResult<Self> {
        Self::from_provider(&SystemEnv, registry())
    }

    pub fn expression(&self) -> Option<&MarkerExpr> {
        self.expr.as_ref()
    }

    pub fn selects<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        self.expr.as_ref().map_or(true, |expr| expr.matches(tags))
    }
}

/// The selection for this process, read from `TEST_MARKERS` once
pub fn selection() -> Result<&'static MarkerSelection, &'static MarkerError> {
    static SELECTION: OnceLock<MarkerResult<MarkerSelection>> = OnceLock::new();
    SELECTION.get_or_init(MarkerSelection::from_env).as_ref()
}

/// Whether a test carrying `tags` should run
///
/// Tags missing from the registry are logged as warnings but still take
/// part in selection.
pub fn is_selected(tags: &[&str]) -> MarkerResult<bool> {
    for tag in tags {
        if !registry().contains(tag) {
            tracing::warn!(marker = %tag, "unknown marker; register it to silence this warning");
        }
    }
    let selection = selection().map_err(|err| err.clone())?;
    Ok(selection.selects(tags))
}

#[doc(hidden)]
pub fn log_skip(test: &str, tags: &[&str]) {
    tracing::info!(test, tags = ?tags, "skipped by marker selection");
}

/// Return early from a test whose markers are not selected
///
/// Panics if `TEST_MARKERS` holds an invalid expression, failing the test
/// with the parse error.
#[macro_export]
macro_rules! require_markers {
    ($($marker:expr),+ $(,)?) => {{
        let tags: &[&str] = &[$($marker),+];
        match $crate::markers::is_selected(tags) {
            Ok(true) => {}
            Ok(false) => {
                $crate::markers::log_skip(::std::module_path!(), tags);
                return;
            }
            Err(err) => ::std::panic!("invalid {} expression: {}", $crate::markers::TEST_MARKERS, err),
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use atlas_shared_config::MapEnv;

    fn standard() -> MarkerRegistry {
        let mut registry = MarkerRegistry::new();
        register_markers(&mut registry);
        registry
    }

    #[test]
    fn test_register_markers_adds_standard_set() {
        let registry = standard();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get(UNIT).unwrap().description(), "Unit tests");
        assert_eq!(registry.get(E2E).unwrap().description(), "End-to-end tests");
        assert_eq!(registry.get(SLOW).unwrap().description(), "Slow running tests");
        assert!(registry.contains(INTEGRATION));
    }

    #[test]
    fn test_every_standard_marker_line_parses() {
        for line in STANDARD_MARKERS {
            let marker = Marker::parse_line(line).unwrap();
            assert!(line.starts_with(marker.name()));
            assert!(!marker.description().is_empty());
        }
    }

    #[test]
    fn test_register_markers_is_idempotent() {
        let mut registry = standard();
        let before = registry.clone();
        register_markers(&mut registry);
        assert_eq!(registry, before);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_reregistering_keeps_first_description() {
        let mut registry = standard();
        assert!(!registry.register_line("slow: something else").unwrap());
        assert_eq!(registry.get(SLOW).unwrap().description(), "Slow running tests");
        assert!(registry.register_line("gpu: Needs a GPU").unwrap());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_marker_line_parsing() {
        let marker = Marker::parse_line("  e2e :  End-to-end tests ").unwrap();
        assert_eq!(marker.name(), "e2e");
        assert_eq!(marker.to_string(), "e2e: End-to-end tests");
        assert_eq!(Marker::parse_line("flaky").unwrap().description(), "");
        assert_matches!(Marker::parse_line("not: reserved"), Err(MarkerError::InvalidName(_)));
        assert_matches!(Marker::parse_line("2fast: nope"), Err(MarkerError::InvalidName(_)));
    }

    #[test]
    fn test_registry_iterates_in_name_order() {
        let names: Vec<_> = standard().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["e2e", "integration", "slow", "unit"]);
    }

    #[test]
    fn test_expr_precedence() {
        let expr = MarkerExpr::parse("unit or integration and not slow").unwrap();
        assert_eq!(expr.to_string(), "(unit or (integration and not slow))");

        assert!(expr.matches(&["unit", "slow"]));
        assert!(expr.matches(&["integration"]));
        assert!(!expr.matches(&["integration", "slow"]));
    }

    #[test]
    fn test_expr_parentheses() {
        let expr = MarkerExpr::parse("(integration or e2e) and not slow").unwrap();
        assert!(expr.matches(&["e2e"]));
        assert!(!expr.matches(&["e2e", "slow"]));
        assert!(!expr.matches(&["unit"]));
        assert!(!expr.matches::<&str>(&[]));
    }

    #[test]
    fn test_expr_double_negation() {
        let expr = MarkerExpr::parse("not not unit").unwrap();
        assert!(expr.matches(&["unit"]));
        assert!(!expr.matches(&["slow"]));
    }

    #[test]
    fn test_expr_errors() {
        assert_eq!(MarkerExpr::parse(""), Err(MarkerError::UnexpectedEnd));
        assert_eq!(MarkerExpr::parse("unit and"), Err(MarkerError::UnexpectedEnd));
        assert_eq!(MarkerExpr::parse("(unit"), Err(MarkerError::UnexpectedEnd));
        assert_eq!(
            MarkerExpr::parse("unit slow"),
            Err(MarkerError::UnexpectedToken {
                token: "slow".to_string(),
                offset: 5
            })
        );
        assert_matches!(
            MarkerExpr::parse("unit & slow"),
            Err(MarkerError::UnexpectedToken { token, offset: 5 }) if token == "&"
        );
        assert_matches!(MarkerExpr::parse(")"), Err(MarkerError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_expr_validate_against_registry() {
        let registry = standard();
        assert!(MarkerExpr::parse("unit and not slow").unwrap().validate(&registry).is_ok());
        assert_eq!(
            MarkerExpr::parse("unit or gpu").unwrap().validate(&registry),
            Err(MarkerError::Unknown("gpu".to_string()))
        );
    }

    #[test]
    fn test_selection_blank_selects_all() {
        let selection = MarkerSelection::from_provider(&MapEnv::new(), &standard()).unwrap();
        assert!(selection.expression().is_none());
        assert!(selection.selects(&["slow"]));
        assert!(selection.selects::<&str>(&[]));

        let blank = MarkerSelection::parse("   ").unwrap();
        assert_eq!(blank, MarkerSelection::all());
    }

    #[test]
    fn test_selection_from_provider() {
        let env = MapEnv::new().with_var(TEST_MARKERS, "not slow");
        let selection = MarkerSelection::from_provider(&env, &standard()).unwrap();
        assert!(selection.selects(&["unit"]));
        assert!(!selection.selects(&["integration", "slow"]));
    }

    #[test]
    fn test_selection_rejects_unknown_marker() {
        let env = MapEnv::new().with_var(TEST_MARKERS, "smoke");
        assert_eq!(
            MarkerSelection::from_provider(&env, &standard()),
            Err(MarkerError::Unknown("smoke".to_string()))
        );
    }

    #[test]
    fn test_process_registry_has_standard_markers() {
        assert_eq!(registry().len(), 4);
        assert!(std::ptr::eq(registry(), registry()));
    }
}
