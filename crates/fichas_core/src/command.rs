//! Command menu - the choices offered once a user is registered
//!
//! Free text is matched case-insensitively with accents folded, and the
//! 1-based position of the option in the menu is accepted too.

use serde::{Deserialize, Serialize};

/// Main menu commands.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Withdrawal request (amount, then platform)
    Retiro,
    /// Complaint (free text)
    Mensaje,
    /// Conversation history
    Historial,
    /// Drop the current sub-flow
    Cancelar,
}

impl Command {
    /// Menu order.
    pub const ALL: [Command; 4] = [
        Command::Retiro,
        Command::Mensaje,
        Command::Historial,
        Command::Cancelar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Retiro => "retiro",
            Self::Mensaje => "mensaje",
            Self::Historial => "historial",
            Self::Cancelar => "cancelar",
        }
    }

    /// Option labels in menu order.
    pub fn menu_labels() -> Vec<String> {
        Self::ALL.iter().map(|c| c.label().to_string()).collect()
    }

    /// Parse a menu choice. Returns `None` for anything that is not a command.
    pub fn parse(input: &str) -> Option<Self> {
        let folded = fold(input);
        match folded.as_str() {
            "1" | "retiro" | "retirar" => Some(Self::Retiro),
            "2" | "mensaje" | "reclamo" => Some(Self::Mensaje),
            "3" | "historial" => Some(Self::Historial),
            "4" | "cancelar" => Some(Self::Cancelar),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Choices shown when the phone number is not registered.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferChoice {
    Register,
    Cancel,
}

impl OfferChoice {
    pub const REGISTER_LABEL: &'static str = "registrarme";
    pub const CANCEL_LABEL: &'static str = "cancelar";

    pub fn labels() -> Vec<String> {
        vec![
            Self::REGISTER_LABEL.to_string(),
            Self::CANCEL_LABEL.to_string(),
        ]
    }

    pub fn parse(input: &str) -> Option<Self> {
        match fold(input).as_str() {
            "1" | "registrarme" | "registrar" | "si" => Some(Self::Register),
            "2" | "cancelar" | "no" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// True when the input is the word "cancelar" in any casing or accenting.
pub fn is_cancel(input: &str) -> bool {
    fold(input) == "cancelar"
}

/// Lowercase, trim, and strip Spanish accents and leading emoji/punctuation.
fn fold(input: &str) -> String {
    input
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            other => other.to_ascii_lowercase(),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("retiro"), Some(Command::Retiro));
        assert_eq!(Command::parse("  RETIRO "), Some(Command::Retiro));
        assert_eq!(Command::parse("Mensaje"), Some(Command::Mensaje));
        assert_eq!(Command::parse("3"), Some(Command::Historial));
        assert_eq!(Command::parse("cancelar"), Some(Command::Cancelar));
        assert_eq!(Command::parse("hola"), None);
    }

    #[test]
    fn test_menu_labels_round_trip() {
        for label in Command::menu_labels() {
            assert!(Command::parse(&label).is_some(), "{label} should parse");
        }
    }

    #[test]
    fn test_offer_choice() {
        assert_eq!(OfferChoice::parse("Registrarme"), Some(OfferChoice::Register));
        assert_eq!(OfferChoice::parse("sí"), Some(OfferChoice::Register));
        assert_eq!(OfferChoice::parse("CANCELAR"), Some(OfferChoice::Cancel));
        assert_eq!(OfferChoice::parse("quizas"), None);
    }

    #[test]
    fn test_is_cancel() {
        assert!(is_cancel(" Cancelar"));
        assert!(!is_cancel("cancelado"));
    }
}
