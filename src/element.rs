//! Element records: the validated view of one periodic-table row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CueError;

/// Periodic-table block (s, p, d, f).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    S,
    P,
    D,
    F,
}

impl Block {
    pub const ALL: [Block; 4] = [Block::S, Block::P, Block::D, Block::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Block::S => "s",
            Block::P => "p",
            Block::D => "d",
            Block::F => "f",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-block", self.as_str())
    }
}

impl FromStr for Block {
    type Err = CueError;

    /// Accepts `s`, `S`, `s-block`, `S-Block`, …
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let letter = trimmed.strip_suffix("-block").unwrap_or(&trimmed);
        match letter {
            "s" => Ok(Block::S),
            "p" => Ok(Block::P),
            "d" => Ok(Block::D),
            "f" => Ok(Block::F),
            _ => Err(CueError::InvalidElementData(format!(
                "unrecognized block '{}'",
                s.trim()
            ))),
        }
    }
}

/// A raw provider row. Nothing here has been validated yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRow {
    pub atomic_number: u32,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub period: Option<u32>,
    #[serde(default)]
    pub group: Option<u32>,
    #[serde(default)]
    pub block: Option<String>,
}

/// A validated element: every field synthesis needs is present and positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementRecord {
    atomic_number: u32,
    period: u32,
    group: u32,
    block: Block,
    symbol: Option<String>,
}

impl ElementRecord {
    pub fn new(atomic_number: u32, period: u32, group: u32, block: Block) -> Result<Self, CueError> {
        if atomic_number == 0 {
            return Err(CueError::InvalidElementData(
                "atomic_number must be positive".to_string(),
            ));
        }
        if period == 0 {
            return Err(CueError::InvalidElementData(format!(
                "element {atomic_number}: period must be positive"
            )));
        }
        if group == 0 {
            return Err(CueError::InvalidElementData(format!(
                "element {atomic_number}: group must be positive"
            )));
        }
        Ok(ElementRecord {
            atomic_number,
            period,
            group,
            block,
            symbol: None,
        })
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn atomic_number(&self) -> u32 {
        self.atomic_number
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn block(&self) -> Block {
        self.block
    }

    /// Human label for logs, e.g. `6 (C)`.
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(sym) => format!("{} ({sym})", self.atomic_number),
            None => self.atomic_number.to_string(),
        }
    }
}

impl TryFrom<&ElementRow> for ElementRecord {
    type Error = CueError;

    fn try_from(row: &ElementRow) -> Result<Self, Self::Error> {
        let n = row.atomic_number;
        let period = row.period.ok_or_else(|| {
            CueError::InvalidElementData(format!("element {n}: missing period"))
        })?;
        let group = row.group.ok_or_else(|| {
            CueError::InvalidElementData(format!("element {n}: missing group"))
        })?;
        let block: Block = row
            .block
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| CueError::InvalidElementData(format!("element {n}: missing block")))?
            .parse::<Block>()
            .map_err(|e| match e {
                CueError::InvalidElementData(msg) => {
                    CueError::InvalidElementData(format!("element {n}: {msg}"))
                }
                other => other,
            })?;

        let record = ElementRecord::new(n, period, group, block)?;
        Ok(match &row.symbol {
            Some(sym) if !sym.trim().is_empty() => record.with_symbol(sym.trim()),
            _ => record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(period: Option<u32>, group: Option<u32>, block: Option<&str>) -> ElementRow {
        ElementRow {
            atomic_number: 26,
            symbol: Some("Fe".to_string()),
            name: Some("Iron".to_string()),
            period,
            group,
            block: block.map(str::to_string),
        }
    }

    #[test]
    fn parses_block_spellings() {
        assert_eq!("s".parse::<Block>().unwrap(), Block::S);
        assert_eq!("p-block".parse::<Block>().unwrap(), Block::P);
        assert_eq!(" D-Block ".parse::<Block>().unwrap(), Block::D);
        assert_eq!("F".parse::<Block>().unwrap(), Block::F);
    }

    #[test]
    fn rejects_unknown_block() {
        let err = "g-block".parse::<Block>().unwrap_err();
        assert!(matches!(err, CueError::InvalidElementData(_)));
    }

    #[test]
    fn block_display_uses_source_spelling() {
        assert_eq!(Block::D.to_string(), "d-block");
    }

    #[test]
    fn valid_row_converts() {
        let rec = ElementRecord::try_from(&row(Some(4), Some(8), Some("d-block"))).unwrap();
        assert_eq!(rec.atomic_number(), 26);
        assert_eq!(rec.period(), 4);
        assert_eq!(rec.group(), 8);
        assert_eq!(rec.block(), Block::D);
        assert_eq!(rec.label(), "26 (Fe)");
    }

    #[test]
    fn missing_fields_are_invalid() {
        for r in [
            row(None, Some(8), Some("d-block")),
            row(Some(4), None, Some("d-block")),
            row(Some(4), Some(8), None),
            row(Some(4), Some(8), Some("  ")),
        ] {
            let err = ElementRecord::try_from(&r).unwrap_err();
            assert!(matches!(err, CueError::InvalidElementData(_)), "{err}");
        }
    }

    #[test]
    fn zero_group_or_period_is_invalid() {
        assert!(ElementRecord::new(1, 1, 0, Block::S).is_err());
        assert!(ElementRecord::new(1, 0, 1, Block::S).is_err());
        assert!(ElementRecord::new(0, 1, 1, Block::S).is_err());
    }
}
