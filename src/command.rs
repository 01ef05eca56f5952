//! Player actions and their textual tokens

use crate::error::{Result, TrisError};
use std::str::FromStr;

/// Input actions a game can process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    Quit,
}

impl FromStr for Action {
    type Err = TrisError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "move-left" | "left" => Ok(Action::MoveLeft),
            "move-right" | "right" => Ok(Action::MoveRight),
            "rotate" => Ok(Action::Rotate),
            "soft-drop" => Ok(Action::SoftDrop),
            "hard-drop" | "drop" => Ok(Action::HardDrop),
            "quit" => Ok(Action::Quit),
            _ => Err(TrisError::InvalidCommand(token.to_string())),
        }
    }
}

impl Action {
    /// Chat shorthand letter
    pub fn from_letter(letter: char) -> Option<Action> {
        match letter.to_ascii_lowercase() {
            'a' => Some(Action::MoveLeft),
            'd' => Some(Action::MoveRight),
            'w' => Some(Action::Rotate),
            's' => Some(Action::HardDrop),
            'q' => Some(Action::Quit),
            _ => None,
        }
    }

    /// Parse a list of tokens; one bad token rejects the whole list
    pub fn parse_sequence<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Action>> {
        tokens.iter().map(|t| t.as_ref().parse()).collect()
    }

    /// Parse combined shorthand such as `aad` (left, left, right)
    pub fn parse_compact(letters: &str) -> Result<Vec<Action>> {
        if letters.is_empty() {
            return Err(TrisError::InvalidCommand(String::new()));
        }
        letters
            .chars()
            .map(|c| Action::from_letter(c).ok_or_else(|| TrisError::InvalidCommand(letters.to_string())))
            .collect()
    }
}
