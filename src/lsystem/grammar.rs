use crate::error::{RenderError, Result};
use log::debug;
use rand::Rng;
use std::collections::HashMap;

/// 随机规则中的一个候选产生式
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedProduction {
    pub probability: f64,
    pub replacement: String,
}

/// 单个字母的产生式
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    Deterministic(String),
    /// 每次展开时按概率抽取一个候选
    Stochastic(Vec<WeightedProduction>),
}

impl Production {
    /// 选择本次展开使用的替换串
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        match self {
            Production::Deterministic(replacement) => replacement,
            Production::Stochastic(candidates) => {
                let total: f64 = candidates.iter().map(|c| c.probability).sum();
                let mut remaining = rng.random::<f64>() * total;
                for candidate in candidates {
                    if remaining < candidate.probability {
                        return &candidate.replacement;
                    }
                    remaining -= candidate.probability;
                }
                // 浮点累计误差：落到最后一个权重为正的候选
                candidates
                    .iter()
                    .rev()
                    .find(|c| c.probability > 0.0)
                    .map_or("", |c| c.replacement.as_str())
            }
        }
    }
}

/// L-系统文法
#[derive(Debug, Clone, PartialEq)]
pub struct LSystemGrammar {
    /// 海龟会前进的字母
    pub alphabet: Vec<char>,
    /// 字母是否绘制线段，未列出的字母默认绘制
    pub draw: HashMap<char, bool>,
    pub rules: HashMap<char, Production>,
    pub initiator: String,
    /// 默认转角（度）
    pub angle: f64,
    /// 二维海龟的初始朝向（度）
    pub starting_angle: f64,
    /// 三维俯仰角（度）
    pub pitch_angle: f64,
    /// 三维滚转角（度）
    pub roll_angle: f64,
    pub iterations: u32,
}

impl LSystemGrammar {
    pub fn is_stochastic(&self) -> bool {
        self.rules
            .values()
            .any(|p| matches!(p, Production::Stochastic(_)))
    }

    pub fn is_letter(&self, symbol: char) -> bool {
        self.alphabet.contains(&symbol)
    }

    pub fn draws(&self, symbol: char) -> bool {
        self.draw.get(&symbol).copied().unwrap_or(true)
    }

    /// 按迭代次数重写初始串。没有规则的符号保持不变。
    pub fn expand<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        let mut current = self.initiator.clone();
        for _ in 0..self.iterations {
            let mut next = String::new();
            for symbol in current.chars() {
                match self.rules.get(&symbol) {
                    Some(production) => {
                        let replacement = production.choose(rng);
                        next.try_reserve(replacement.len())
                            .map_err(|e| RenderError::allocation("L-system string", e))?;
                        next.push_str(replacement);
                    }
                    None => {
                        next.try_reserve(symbol.len_utf8())
                            .map_err(|e| RenderError::allocation("L-system string", e))?;
                        next.push(symbol);
                    }
                }
            }
            current = next;
        }
        debug!(
            "L-系统展开 {} 次: {} 个符号, {} 个字母{}",
            self.iterations,
            current.len(),
            self.count_letters(&current),
            if self.is_stochastic() { " (随机)" } else { "" }
        );
        Ok(current)
    }

    /// 展开后串中需要前进的字母个数
    pub fn count_letters(&self, expanded: &str) -> usize {
        expanded.chars().filter(|&c| self.is_letter(c)).count()
    }
}
