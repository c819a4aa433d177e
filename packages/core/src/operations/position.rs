//! Move target positions
//!
//! A mutation places a node relative to its target: as the target's first or
//! last child, or as its immediate left/right sibling. Callers that take
//! string input parse it with `Position::from_str`, which rejects unknown
//! tokens before anything touches the store.

use crate::operations::error::TreeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a moved node lands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// First child of the target
    FirstChild,
    /// Last child of the target (the default)
    #[default]
    LastChild,
    /// Immediate left sibling of the target
    Left,
    /// Immediate right sibling of the target
    Right,
}

impl Position {
    /// Canonical string token for this position.
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::FirstChild => "first-child",
            Position::LastChild => "last-child",
            Position::Left => "left",
            Position::Right => "right",
        }
    }

    /// Whether this position makes the node a child of the target.
    pub fn is_child(&self) -> bool {
        matches!(self, Position::FirstChild | Position::LastChild)
    }

    /// Whether this position makes the node a sibling of the target.
    pub fn is_sibling(&self) -> bool {
        matches!(self, Position::Left | Position::Right)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-child" => Ok(Position::FirstChild),
            "last-child" => Ok(Position::LastChild),
            "left" => Ok(Position::Left),
            "right" => Ok(Position::Right),
            other => Err(TreeError::invalid_position(other)),
        }
    }
}
