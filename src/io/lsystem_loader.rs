//! L-系统文法文件（TOML）
//!
//! ```toml
//! alphabet = ["F", "G"]
//! initiator = "F"
//! angle = 60.0
//! starting_angle = 0.0
//! iterations = 3
//!
//! [draw]
//! G = false
//!
//! [rules]
//! F = "F+F--F+F"
//! G = [
//!     { probability = 0.6, replacement = "GG" },
//!     { probability = 0.4, replacement = "G" },
//! ]
//! ```

use crate::error::{RenderError, Result};
use crate::lsystem::{LSystemGrammar, Production, WeightedProduction};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GrammarFile {
    alphabet: Vec<String>,
    initiator: String,
    angle: f64,
    #[serde(default)]
    starting_angle: f64,
    pitch_angle: Option<f64>,
    roll_angle: Option<f64>,
    iterations: u32,
    #[serde(default)]
    draw: HashMap<String, bool>,
    #[serde(default)]
    rules: HashMap<String, RuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleEntry {
    Single(String),
    Weighted(Vec<WeightedEntry>),
}

#[derive(Debug, Deserialize)]
struct WeightedEntry {
    probability: f64,
    replacement: String,
}

fn single_char(symbol: &str, context: &str) -> Result<char> {
    let mut chars = symbol.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(RenderError::InvalidGrammar(format!(
            "{context} '{symbol}' must be a single character"
        ))),
    }
}

impl TryFrom<GrammarFile> for LSystemGrammar {
    type Error = RenderError;

    fn try_from(file: GrammarFile) -> Result<Self> {
        let alphabet = file
            .alphabet
            .iter()
            .map(|s| single_char(s, "alphabet symbol"))
            .collect::<Result<Vec<_>>>()?;

        let mut draw = HashMap::with_capacity(file.draw.len());
        for (symbol, flag) in &file.draw {
            let c = single_char(symbol, "draw symbol")?;
            if !alphabet.contains(&c) {
                return Err(RenderError::InvalidGrammar(format!(
                    "draw flag for '{c}' which is not in the alphabet"
                )));
            }
            draw.insert(c, *flag);
        }

        let mut rules = HashMap::with_capacity(file.rules.len());
        for (symbol, entry) in file.rules {
            let c = single_char(&symbol, "rule symbol")?;
            if !alphabet.contains(&c) {
                return Err(RenderError::InvalidGrammar(format!(
                    "rule for '{c}' which is not in the alphabet"
                )));
            }
            let production = match entry {
                RuleEntry::Single(replacement) => Production::Deterministic(replacement),
                RuleEntry::Weighted(candidates) => {
                    if candidates.is_empty()
                        || candidates
                            .iter()
                            .any(|w| !w.probability.is_finite() || w.probability < 0.0)
                        || candidates.iter().map(|w| w.probability).sum::<f64>() <= 0.0
                    {
                        return Err(RenderError::InvalidGrammar(format!(
                            "stochastic rule for '{c}' needs non-negative probabilities with a positive sum"
                        )));
                    }
                    Production::Stochastic(
                        candidates
                            .into_iter()
                            .map(|w| WeightedProduction {
                                probability: w.probability,
                                replacement: w.replacement,
                            })
                            .collect(),
                    )
                }
            };
            rules.insert(c, production);
        }

        if !file.angle.is_finite() {
            return Err(RenderError::InvalidGrammar("angle must be finite".into()));
        }

        Ok(LSystemGrammar {
            alphabet,
            draw,
            rules,
            initiator: file.initiator,
            angle: file.angle,
            starting_angle: file.starting_angle,
            pitch_angle: file.pitch_angle.unwrap_or(file.angle),
            roll_angle: file.roll_angle.unwrap_or(file.angle),
            iterations: file.iterations,
        })
    }
}

/// 从TOML内容字符串解析文法
pub fn parse_grammar(content: &str) -> Result<LSystemGrammar> {
    let file: GrammarFile = toml::from_str(content)?;
    file.try_into()
}

/// 从文件加载文法
pub fn load_grammar<P: AsRef<Path>>(path: P) -> Result<LSystemGrammar> {
    debug!("加载 L-系统文法: {:?}", path.as_ref());
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_grammar(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_deterministic_and_stochastic_rules() {
        let grammar = parse_grammar(
            r#"
            alphabet = ["F", "G"]
            initiator = "F"
            angle = 25.0
            iterations = 4
            pitch_angle = 30.0

            [draw]
            G = false

            [rules]
            F = "F+G"
            G = [
                { probability = 0.25, replacement = "GG" },
                { probability = 0.75, replacement = "G" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(grammar.alphabet, vec!['F', 'G']);
        assert!(grammar.draws('F'));
        assert!(!grammar.draws('G'));
        assert_eq!(
            grammar.rules[&'F'],
            Production::Deterministic("F+G".to_string())
        );
        assert!(grammar.is_stochastic());
        assert_eq!(grammar.pitch_angle, 30.0);
        assert_eq!(grammar.roll_angle, 25.0);
        assert_eq!(grammar.starting_angle, 0.0);
    }

    #[test]
    fn multi_character_symbols_are_rejected() {
        let err = parse_grammar(
            r#"
            alphabet = ["FF"]
            initiator = "F"
            angle = 90.0
            iterations = 1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidGrammar(_)));
    }

    #[test]
    fn rules_outside_alphabet_are_rejected() {
        let err = parse_grammar(
            r#"
            alphabet = ["F"]
            initiator = "F"
            angle = 90.0
            iterations = 1
            [rules]
            X = "F"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidGrammar(_)));
    }

    #[test]
    fn missing_fields_surface_as_toml_errors() {
        assert!(matches!(
            parse_grammar("alphabet = [\"F\"]"),
            Err(RenderError::Toml(_))
        ));
    }
}
