//! Lexical conventions shared by the parser and the interpreter.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::errors::ParseErrorKind;
use crate::value::Value;

/// Turns decoded literal text into a runtime value.
///
/// Must be total: every input produces a value, nothing panics.
pub type Caster = Rc<dyn Fn(&str) -> Value>;

/// Grammar knobs for one interpreter instance.
///
/// Every marker except `spread` must be non-empty (see [`validate`]); an
/// empty `spread` disables spreading. The configuration is immutable once an
/// interpreter has been built from it; cloning is cheap (the caster is shared).
///
/// [`validate`]: LexicalConfig::validate
#[derive(Clone)]
pub struct LexicalConfig {
    /// Separates the parts of a dotted path (`obj.field`).
    pub navigator: String,
    /// Separates the head token and the arguments of one statement.
    pub delimiter: String,
    /// Opens a string literal.
    pub quote_open: String,
    /// Closes a string literal.
    pub quote_close: String,
    /// Marks a statement as a comment when it starts with it.
    pub comment: String,
    /// Ends a statement.
    pub terminator: String,
    /// Prefix on a path segment asking for expansion at the call site.
    pub spread: String,
    /// Interprets literal text.
    pub caster: Caster,
}

impl LexicalConfig {
    /// Replace the literal caster.
    #[must_use]
    pub fn with_caster(mut self, caster: impl Fn(&str) -> Value + 'static) -> Self {
        self.caster = Rc::new(caster);
        self
    }

    /// Check that every marker the parser splits on is non-empty.
    pub fn validate(&self) -> Result<(), ParseErrorKind> {
        let markers = [
            ("navigator", &self.navigator),
            ("delimiter", &self.delimiter),
            ("quote_open", &self.quote_open),
            ("quote_close", &self.quote_close),
            ("comment", &self.comment),
            ("terminator", &self.terminator),
        ];
        match markers.into_iter().find(|(_, marker)| marker.is_empty()) {
            Some((marker, _)) => Err(ParseErrorKind::EmptyMarker { marker }),
            None => Ok(()),
        }
    }

    /// Whether `s` is a quote-delimited string literal.
    pub fn is_string(&self, s: &str) -> bool {
        s.len() >= self.quote_open.len() + self.quote_close.len()
            && s.starts_with(self.quote_open.as_str())
            && s.ends_with(self.quote_close.as_str())
    }

    /// Content of a literal: trimmed, with one opening and one closing marker removed.
    pub fn extract_str<'s>(&self, s: &'s str) -> &'s str {
        let s = s.trim();
        let s = s.strip_prefix(self.quote_open.as_str()).unwrap_or(s);
        s.strip_suffix(self.quote_close.as_str()).unwrap_or(s)
    }

    /// Split a dotted path into its navigation parts.
    pub fn parts<'s>(&self, s: &'s str) -> SmallVec<[&'s str; 4]> {
        s.split(self.navigator.as_str()).collect()
    }

    /// Interpret literal text with the configured caster.
    #[inline]
    pub fn cast(&self, text: &str) -> Value {
        (self.caster)(text)
    }
}

impl Default for LexicalConfig {
    fn default() -> Self {
        LexicalConfig {
            navigator: ".".to_string(),
            delimiter: ",".to_string(),
            quote_open: "'".to_string(),
            quote_close: "'".to_string(),
            comment: "//".to_string(),
            terminator: ";".to_string(),
            spread: "*".to_string(),
            caster: Rc::new(default_cast),
        }
    }
}

impl fmt::Debug for LexicalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalConfig")
            .field("navigator", &self.navigator)
            .field("delimiter", &self.delimiter)
            .field("quote_open", &self.quote_open)
            .field("quote_close", &self.quote_close)
            .field("comment", &self.comment)
            .field("terminator", &self.terminator)
            .field("spread", &self.spread)
            .finish_non_exhaustive()
    }
}

/// Default literal interpretation.
///
/// `true`/`false`/`none` (any case) become booleans and none, then integers,
/// then floats; anything else stays text.
pub fn default_cast(text: &str) -> Value {
    match text.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "none" => Value::None,
        _ => parse_number(text),
    }
}

fn parse_number(text: &str) -> Value {
    if let Ok(int) = text.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        return Value::Float(float);
    }
    Value::str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cast_recognises_words_case_insensitively() {
        assert_eq!(default_cast("TRUE"), Value::Bool(true));
        assert_eq!(default_cast("False"), Value::Bool(false));
        assert_eq!(default_cast("none"), Value::None);
    }

    #[test]
    fn default_cast_prefers_integers_over_floats() {
        assert!(matches!(default_cast("42"), Value::Int(42)));
        assert!(matches!(default_cast("-7"), Value::Int(-7)));
        assert!(matches!(default_cast("2.5"), Value::Float(f) if (f - 2.5).abs() < f64::EPSILON));
    }

    #[test]
    fn default_cast_falls_back_to_text() {
        assert_eq!(default_cast("hello world"), Value::str("hello world"));
        assert_eq!(default_cast(""), Value::str(""));
    }

    #[test]
    fn string_literal_detection() {
        let config = LexicalConfig::default();
        assert!(config.is_string("'abc'"));
        assert!(config.is_string("''"));
        assert!(!config.is_string("'"));
        assert!(!config.is_string("abc'"));
        assert!(!config.is_string("abc"));
    }

    #[test]
    fn extract_strips_one_marker_each_side() {
        let config = LexicalConfig::default();
        assert_eq!(config.extract_str(" 'a, b' "), "a, b");
        assert_eq!(config.extract_str("''x''"), "'x'");
        assert_eq!(config.extract_str("bare"), "bare");
    }

    #[test]
    fn parts_split_on_navigator() {
        let config = LexicalConfig::default();
        assert_eq!(config.parts("a.b.c").as_slice(), &["a", "b", "c"]);
        assert_eq!(config.parts("single").as_slice(), &["single"]);
    }

    #[test]
    fn validate_rejects_empty_markers() {
        assert_eq!(LexicalConfig::default().validate(), Ok(()));

        let config = LexicalConfig {
            quote_close: String::new(),
            ..LexicalConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ParseErrorKind::EmptyMarker { marker: "quote_close" })
        );

        let config = LexicalConfig {
            spread: String::new(),
            ..LexicalConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn custom_caster_is_used() {
        let config = LexicalConfig::default().with_caster(|text| Value::str(text.to_uppercase()));
        assert_eq!(config.cast("abc"), Value::str("ABC"));
    }
}
