//! Frame parser for the scale's line-oriented text output.
//!
//! Scales on this bridge emit free-form lines such as `"\x02 ST 45.0 g\r\n"`.
//! The parser throws away everything that cannot be part of the weight and
//! matches what is left against `digits[.digits][unit]`.

use log::debug;
use regex::Regex;
use std::sync::OnceLock;

use super::reading::WeightUnit;
use crate::config::UnitMode;
use crate::utils::error::ScaleError;

const FRAME_PATTERN: &str = r"^([0-9]+(?:\.[0-9]+)?)\s*(g|kg|lb)?";

fn frame_regex() -> &'static Regex {
    static FRAME_RE: OnceLock<Regex> = OnceLock::new();
    FRAME_RE.get_or_init(|| Regex::new(FRAME_PATTERN).expect("frame pattern is a valid regex"))
}

/// Value and unit recovered from one raw line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedWeight {
    pub value: f64,
    pub unit: WeightUnit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameParser {
    unit_mode: UnitMode,
}

impl FrameParser {
    pub fn new(unit_mode: UnitMode) -> Self {
        Self { unit_mode }
    }

    pub fn parse(&self, raw_line: &str) -> Result<ParsedWeight, ScaleError> {
        let cleaned = self.clean(raw_line);

        let captures = frame_regex()
            .captures(&cleaned)
            .ok_or_else(|| ScaleError::ParseError(raw_line.to_string()))?;

        let value: f64 = captures[1]
            .parse()
            .map_err(|_| ScaleError::ParseError(raw_line.to_string()))?;

        let unit = match captures.get(2) {
            Some(token) => token.as_str().parse()?,
            None => WeightUnit::G,
        };

        debug!("⚖️  Parsed {:?} -> {} {}", raw_line, value, unit);
        Ok(ParsedWeight { value, unit })
    }

    fn clean(&self, raw_line: &str) -> String {
        let keep = |c: char| -> bool {
            match self.unit_mode {
                UnitMode::Legacy => c.is_ascii_digit() || c == '.' || c == 'g',
                UnitMode::UnitAware => {
                    c.is_ascii_digit() || matches!(c, '.' | 'g' | 'k' | 'l' | 'b')
                }
            }
        };

        raw_line
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .chars()
            .filter(|&c| keep(c))
            .collect::<String>()
            .trim()
            .to_string()
    }
}
