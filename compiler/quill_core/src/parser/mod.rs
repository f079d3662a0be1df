//! Statement splitting, quote-aware tokenization and the parse-time transform.
//!
//! Parsing runs in two passes:
//!
//! 1. `raw_parse` splits the source on the terminator, counts newlines to keep
//!    a running line number, drops empty and comment statements, and
//!    tokenizes each remaining statement on the delimiter.
//! 2. `transform` walks the raw instructions with a cursor. When the token
//!    under the cursor has a parse-time resolver, the resolver owns the
//!    sequence for that step: it may consume a range, replace the lead
//!    instruction with a synthesized one, and returns the cursor to resume at.
//!
//! Any failure surfaces from [`Parser::parse`] as one [`ParseError`] carrying
//! the line the parser was positioned at.

use std::rc::Rc;

use crate::errors::{ParseError, ParseErrorKind};
use crate::instruction::{Arg, Instruction};
use crate::lexical::LexicalConfig;
use crate::registry::ParseTable;

/// Parse-time resolver: `(parser, sequence, cursor) -> next cursor`.
///
/// May mutate the sequence in place. Returning the cursor of a replaced lead
/// instruction lets the transform pass it through on the next step, so the
/// replacement token must not itself have a parse-time resolver.
pub type ParseResolver =
    Rc<dyn Fn(&mut Parser, &mut Vec<Instruction>, usize) -> Result<usize, ParseErrorKind>>;

/// Diagnostic hook invoked with `(line, statement)` before each statement is tokenized.
pub type TokenizeObserver = Rc<dyn Fn(usize, &str)>;

/// Structural parser driven by parse-time resolvers.
pub struct Parser {
    config: LexicalConfig,
    table: ParseTable,
    observer: Option<TokenizeObserver>,
    /// 1-based line the parser is positioned at.
    line: usize,
}

impl Parser {
    pub fn new(config: LexicalConfig, table: ParseTable) -> Self {
        Parser {
            config,
            table,
            observer: None,
            line: 1,
        }
    }

    /// Install a tokenization observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Option<TokenizeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &LexicalConfig {
        &self.config
    }

    /// Line the parser is currently positioned at.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Parse source text into the final instruction sequence.
    #[tracing::instrument(level = "debug", skip_all, fields(len = code.len()))]
    pub fn parse(&mut self, code: &str) -> Result<Vec<Instruction>, ParseError> {
        let result = self
            .raw_parse(code)
            .and_then(|instructions| self.transform(instructions));
        result.map_err(|kind| {
            tracing::debug!(line = self.line, %kind, "parse failed");
            ParseError {
                line: self.line,
                kind,
            }
        })
    }

    /// Split into statements and tokenize each, without parse-time resolution.
    pub fn raw_parse(&mut self, code: &str) -> Result<Vec<Instruction>, ParseErrorKind> {
        self.config.validate()?;
        let mut instructions = Vec::new();
        let mut newlines = 0;
        self.line = 1;

        for raw in code.split(self.config.terminator.as_str()) {
            newlines += raw.matches('\n').count();
            self.line = newlines + 1;

            let text = raw.replace('\n', "");
            let text = text.trim();
            if text.is_empty() || text.starts_with(self.config.comment.as_str()) {
                continue;
            }

            let mut parts = self.tokenize(text)?.into_iter();
            let Some(head) = parts.next() else {
                continue;
            };
            instructions.push(Instruction::new(
                head.to_lowercase(),
                parts.map(Arg::Text).collect(),
                self.line,
            ));
        }

        Ok(instructions)
    }

    /// Split one statement into its trimmed, non-empty tokens.
    ///
    /// Inside a string literal only the closing marker is significant;
    /// delimiters and opening markers are copied literally and the token
    /// keeps both quote markers.
    ///
    /// Fails without scanning when a marker is empty.
    pub fn tokenize(&self, statement: &str) -> Result<Vec<String>, ParseErrorKind> {
        self.config.validate()?;
        if let Some(observer) = &self.observer {
            observer(self.line, statement);
        }
        tracing::trace!(line = self.line, statement, "tokenize");

        let open = self.config.quote_open.as_str();
        let close = self.config.quote_close.as_str();
        let delimiter = self.config.delimiter.as_str();

        let mut tokens = Vec::new();
        let mut buffer = String::new();
        let mut in_string = false;
        let mut rest = statement;

        while let Some(ch) = rest.chars().next() {
            if in_string {
                if let Some(after) = rest.strip_prefix(close) {
                    buffer.push_str(close);
                    flush(&mut tokens, &mut buffer);
                    in_string = false;
                    rest = after;
                    continue;
                }
            } else if let Some(after) = rest.strip_prefix(open) {
                buffer.push_str(open);
                in_string = true;
                rest = after;
                continue;
            } else if let Some(after) = rest.strip_prefix(delimiter) {
                flush(&mut tokens, &mut buffer);
                rest = after;
                continue;
            }
            buffer.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        if in_string {
            return Err(ParseErrorKind::UnterminatedString);
        }
        flush(&mut tokens, &mut buffer);

        Ok(tokens)
    }

    /// Run parse-time resolvers over `instructions`.
    pub fn transform(
        &mut self,
        mut instructions: Vec<Instruction>,
    ) -> Result<Vec<Instruction>, ParseErrorKind> {
        let mut output = Vec::with_capacity(instructions.len());
        let mut cursor = 0;

        while let Some(instruction) = instructions.get(cursor) {
            self.line = instruction.line;
            if let Some(resolver) = self.table.get(&instruction.token) {
                cursor = resolver(self, &mut instructions, cursor)?;
                continue;
            }
            output.push(instruction.clone());
            cursor += 1;
        }

        Ok(output)
    }
}

/// Push the trimmed buffer as a token when non-empty, then clear it.
fn flush(tokens: &mut Vec<String>, buffer: &mut String) {
    let token = buffer.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    buffer.clear();
}
