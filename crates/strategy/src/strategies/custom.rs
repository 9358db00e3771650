//! Custom (externally generated) strategies
//!
//! Registration compiles and validates the generated script once. Anything
//! that fails there is replaced by the default random strategy. At run time
//! a script error only costs that tick: the agent holds.

use banana_core::Decision;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{MarketView, Strategy};
use crate::script::{Script, ScriptError, extract_code};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomConfig {
    /// What the owner asked for
    pub description: String,
    pub script: Script,
}

/// Outcome of registering generated code
#[derive(Debug, Clone)]
pub struct Registration {
    /// Strategy the agent will actually run
    pub strategy: Strategy,
    /// Why the generated code was rejected, when it was
    pub fallback_reason: Option<ScriptError>,
}

impl Registration {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Compile and validate generated code, or fall back to the default
/// random strategy
pub fn register(description: &str, generated: &str) -> Registration {
    match Script::compile_validated(extract_code(generated)) {
        Ok(script) => {
            log::info!("Custom strategy accepted for '{}'", description);
            Registration {
                strategy: Strategy::Custom(CustomConfig {
                    description: description.to_string(),
                    script,
                }),
                fallback_reason: None,
            }
        }
        Err(reason) => {
            log::warn!(
                "Custom strategy rejected for '{}': {}; using default random strategy",
                description,
                reason
            );
            Registration {
                strategy: Strategy::fallback(),
                fallback_reason: Some(reason),
            }
        }
    }
}

pub fn decide<R: Rng + ?Sized>(
    config: &CustomConfig,
    view: &MarketView<'_>,
    rng: &mut R,
) -> Decision {
    match config.script.run(view.history, view.price, rng) {
        Ok(decision) => decision,
        Err(e) => {
            log::warn!("Custom strategy error, holding this tick: {}", e);
            Decision::hold()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrategyKind;
    use banana_core::Wallet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_valid_code_is_registered() {
        let reg = register(
            "buy dips",
            "```\nfn decide(h, p) { if p < mean(h) { return buy(1); } return hold(); }\n```",
        );
        assert!(!reg.is_fallback());
        assert_eq!(reg.strategy.kind(), StrategyKind::Custom);
    }

    #[test]
    fn test_missing_function_falls_back_to_random() {
        let reg = register("anything", "fn strategy(h, p) { return buy(1); }");
        assert!(matches!(
            reg.fallback_reason,
            Some(ScriptError::MissingEntryPoint(_))
        ));
        assert_eq!(reg.strategy.kind(), StrategyKind::Random);
    }

    #[test]
    fn test_runtime_error_holds_for_the_tick() {
        let script = Script::compile("fn decide(h, p) { return buy(h[100]); }").unwrap();
        let config = CustomConfig {
            description: "broken".to_string(),
            script,
        };
        let wallet = Wallet::new("bot", 10.0, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        let d = decide(&config, &MarketView::new(&[1.0], 1.0, &wallet), &mut rng);
        assert!(d.is_hold());
    }
}
