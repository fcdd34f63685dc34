//! Protocol commands
//!
//! Defines the terminal commands exercised by the uploader.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings table holding the organization name lines
pub const ORGANIZATION_TABLE: &str = "30";

/// Row of the first organization name line
pub const ORGANIZATION_NAME_ROW: &str = "0";

/// Terminal commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Query terminal status flags (0x00)
    StatusFlags,

    /// Read one row of a settings table (0x11)
    ReadSettings,

    /// Announce and load a logo bitmap (0x15)
    LoadLogo,

    /// Announce and load a receipt design (0x17)
    LoadDesign,
}

impl Command {
    /// Two-character ASCII command code
    pub fn code(&self) -> &'static str {
        match self {
            Command::StatusFlags => "00",
            Command::ReadSettings => "11",
            Command::LoadLogo => "15",
            Command::LoadDesign => "17",
        }
    }

    /// Look up a command by its wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(Command::StatusFlags),
            "11" => Some(Command::ReadSettings),
            "15" => Some(Command::LoadLogo),
            "17" => Some(Command::LoadDesign),
            _ => None,
        }
    }

    /// Whether the command is followed by an unframed bulk payload
    pub fn carries_payload(&self) -> bool {
        matches!(self, Command::LoadLogo | Command::LoadDesign)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::StatusFlags => "status flags",
            Command::ReadSettings => "read settings",
            Command::LoadLogo => "load logo",
            Command::LoadDesign => "load design",
        };
        write!(f, "\"{}\" (0x{})", name, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::StatusFlags.code(), "00");
        assert_eq!(Command::ReadSettings.code(), "11");
        assert_eq!(Command::LoadLogo.code(), "15");
        assert_eq!(Command::LoadDesign.code(), "17");
    }

    #[test]
    fn test_codes_are_two_ascii_chars() {
        for cmd in [
            Command::StatusFlags,
            Command::ReadSettings,
            Command::LoadLogo,
            Command::LoadDesign,
        ] {
            assert_eq!(cmd.code().len(), 2);
            assert!(cmd.code().is_ascii());
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(Command::from_code("99"), None);
    }

    #[test]
    fn test_payload_commands() {
        assert!(Command::LoadDesign.carries_payload());
        assert!(Command::LoadLogo.carries_payload());
        assert!(!Command::StatusFlags.carries_payload());
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::LoadDesign.to_string(), "\"load design\" (0x17)");
    }
}
