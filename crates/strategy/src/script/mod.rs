//! Custom Strategy Scripts
//!
//! Externally generated strategies are written in a tiny expression
//! language and never touch the host: no I/O, no loops, no user-defined
//! calls. A script is a single function:
//!
//! ```text
//! fn decide(history, price) {
//!     let short = mean(last(history, 5));
//!     let long = mean(last(history, 20));
//!     if short > long * 1.02 { return buy(2); }
//!     if short < long * 0.98 { return sell(2); }
//!     return hold();
//! }
//! ```
//!
//! Values are numbers, bools and lists of numbers. Builtins: `len`, `last`,
//! `returns`, `mean`, `stddev`, `sum`, `min`, `max`, `abs`, `sqrt`, `ln`,
//! `exp`, `pow`, `floor`, `ceil`, `round`, `clamp`, `random`, and the
//! results `buy(amount)`, `sell(amount)`, `hold()`.
//!
//! A [`Script`] is compiled once at registration, validated against canned
//! price histories, and then reused for every tick.

mod eval;
mod lexer;
mod parser;

use banana_core::Decision;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use eval::Interpreter;
use parser::Function;

/// Name of the function every script must define
pub const ENTRY_POINT: &str = "decide";

/// Largest accepted script source
pub const MAX_SOURCE_BYTES: usize = 16 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Script is empty")]
    Empty,

    #[error("Script exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Required function `decide(history, price)` is missing (found `{0}`)")]
    MissingEntryPoint(String),

    #[error("`decide` must take exactly 2 parameters, found {0}")]
    WrongArity(usize),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),
}

/// A compiled custom strategy
///
/// Serializes as its source text; deserializing recompiles it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Script {
    source: String,
    function: Arc<Function>,
}

impl Script {
    /// Parse `source` and check the entry point, without running it
    pub fn compile(source: impl Into<String>) -> Result<Self, ScriptError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(ScriptError::Empty);
        }
        if source.len() > MAX_SOURCE_BYTES {
            return Err(ScriptError::TooLarge(MAX_SOURCE_BYTES));
        }

        let tokens = lexer::tokenize(&source)?;
        let function = parser::parse(&tokens)?;

        if function.name != ENTRY_POINT {
            return Err(ScriptError::MissingEntryPoint(function.name));
        }
        if function.params.len() != 2 {
            return Err(ScriptError::WrongArity(function.params.len()));
        }

        Ok(Self {
            source,
            function: Arc::new(function),
        })
    }

    /// Compile and then run the canned validation calls
    pub fn compile_validated(source: impl Into<String>) -> Result<Self, ScriptError> {
        let script = Self::compile(source)?;
        script.validate()?;
        Ok(script)
    }

    /// Run the script on rising, falling and flat sample histories
    ///
    /// Every call must finish without error and return a well-formed
    /// decision.
    pub fn validate(&self) -> Result<(), ScriptError> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for history in canned_histories() {
            let price = history.last().copied().unwrap_or(1.0);
            let decision = self.run(&history, price, &mut rng)?;
            if !decision.amount.is_finite() || decision.amount < 0.0 {
                return Err(ScriptError::MalformedResult(format!(
                    "amount {} is not a non-negative number",
                    decision.amount
                )));
            }
        }
        Ok(())
    }

    /// Evaluate `decide(history, price)` once
    pub fn run<R: Rng + ?Sized>(
        &self,
        history: &[f64],
        price: f64,
        rng: &mut R,
    ) -> Result<Decision, ScriptError> {
        Interpreter::new(rng).call(&self.function, history, price)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for Script {
    type Error = ScriptError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::compile(source)
    }
}

impl From<Script> for String {
    fn from(script: Script) -> Self {
        script.source
    }
}

/// Strip a surrounding markdown code fence from generator output
///
/// Returns the text between the first fence line and the closing fence, or
/// the whole input trimmed when there is no fence.
pub fn extract_code(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };
    let after_fence = &text[open + 3..];
    // skip the language tag on the opening fence line
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => after_fence,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn canned_histories() -> [Vec<f64>; 3] {
    let rising = (0..30).map(|i| 1.0 + i as f64 * 0.01).collect();
    let falling = (0..30).map(|i| 1.3 - i as f64 * 0.01).collect();
    let choppy = (0..30)
        .map(|i| 1.0 + 0.05 * (i as f64 / 3.0).sin())
        .collect();
    [rising, falling, choppy]
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_core::Action;

    const CROSSOVER: &str = "
        fn decide(history, price) {
            if len(history) < 20 { return hold(); }
            let short = mean(last(history, 5));
            let long = mean(last(history, 20));
            if short > long * 1.02 { return buy(2); }
            if short < long * 0.98 { return sell(2); }
            return hold();
        }";

    #[test]
    fn test_compile_and_run() {
        let script = Script::compile_validated(CROSSOVER).unwrap();
        let rising: Vec<f64> = (0..25).map(|i| 1.0 + i as f64 * 0.05).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let decision = script.run(&rising, 2.2, &mut rng).unwrap();
        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.amount, 2.0);
    }

    #[test]
    fn test_missing_entry_point_is_rejected() {
        let err = Script::compile("fn trade(history, price) { return hold(); }").unwrap_err();
        assert_eq!(err, ScriptError::MissingEntryPoint("trade".to_string()));
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        assert_eq!(
            Script::compile("fn decide(history) { return hold(); }").unwrap_err(),
            ScriptError::WrongArity(1)
        );
    }

    #[test]
    fn test_oversized_expression_is_a_syntax_error() {
        // largest chain that still fits under the source limit
        let terms = (MAX_SOURCE_BYTES - 64) / 2;
        let src = format!("fn decide(h, p) {{ return buy(1{}); }}", "+1".repeat(terms));
        assert!(src.len() <= MAX_SOURCE_BYTES);
        assert!(matches!(
            Script::compile_validated(src),
            Err(ScriptError::Syntax { .. })
        ));
    }

    #[test]
    fn test_validation_catches_runtime_failure() {
        // fine on a long history, but index 40 never exists in the samples
        let err = Script::compile_validated("fn decide(h, p) { return buy(h[40]); }").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
    }

    #[test]
    fn test_empty_and_oversized_sources() {
        assert_eq!(Script::compile("   ").unwrap_err(), ScriptError::Empty);
        let huge = format!("fn decide(h, p) {{ return hold(); }} {}", " ".repeat(MAX_SOURCE_BYTES));
        assert_eq!(
            Script::compile(huge).unwrap_err(),
            ScriptError::TooLarge(MAX_SOURCE_BYTES)
        );
    }

    #[test]
    fn test_serde_round_trips_through_source() {
        let script = Script::compile(CROSSOVER).unwrap();
        let json = serde_json::to_string(&script).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
        assert!(serde_json::from_str::<Script>("\"not a script\"").is_err());
    }

    #[test]
    fn test_extract_code_strips_fence() {
        let text = "Here you go:\n```rust\nfn decide(h, p) { return hold(); }\n```\nEnjoy";
        assert_eq!(extract_code(text), "fn decide(h, p) { return hold(); }");
        assert_eq!(extract_code("  fn decide(h, p) {}  "), "fn decide(h, p) {}");
    }
}
