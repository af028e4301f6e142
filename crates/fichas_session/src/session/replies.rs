//! Bot texts shown by the end-user chat.

use fichas_client::models::HistoryEntry;
use fichas_core::ValidationError;

pub const WELCOME: &str = "¡Hola! 👋 Soy tu asistente para gestionar fichas.<br>Por favor, ingresa tu número de teléfono para comenzar.";
pub const TIMED_OUT: &str =
    "⏰ La conversación se cerró por inactividad. ¡Gracias por contactarnos!";
pub const CLOSED: &str = "👋 Conversación finalizada. ¡Gracias por contactarnos!";
pub const NETWORK_ERROR: &str = "⚠️ Hubo un error procesando tu mensaje. Intenta nuevamente.";

pub const NOT_FOUND: &str = "No encontramos una cuenta asociada a ese número.";
pub const OFFER_PROMPT: &str = "¿Querés registrarte?";
pub const REGISTRATION_CANCELLED: &str = "Registro cancelado. ¡Hasta pronto!";

pub const ASK_NAME: &str = "Perfecto. ¿Cuál es tu nombre completo?";
pub const ASK_CUIL: &str = "Gracias. Ahora ingresa tu CUIL (11 dígitos).";
pub const ASK_PLATFORM: &str = "¿En qué plataforma jugás?";
pub const REGISTERED: &str = "✅ ¡Registro completado!";

pub const MENU_PROMPT: &str = "¿Qué querés hacer?";
pub const ASK_AMOUNT: &str = "💰 ¿Cuánto querés retirar?";
pub const ASK_COMPLAINT: &str = "✍️ Contanos tu reclamo y lo revisaremos.";
pub const CANCELLED: &str = "Operación cancelada.";

pub const HISTORY_EMPTY: &str = "📭 Todavía no hay mensajes en tu historial.";
pub const HISTORY_HEADER: &str = "📜 Tu historial:";

pub fn welcome_back(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("¡Hola {}! 👋 Qué bueno verte de nuevo.", name),
        None => "¡Hola! 👋 Qué bueno verte de nuevo.".to_string(),
    }
}

pub fn invalid_input(error: &ValidationError) -> String {
    let detail = match error {
        ValidationError::InvalidPhone(_) => {
            "Ese número no parece válido. Ingresa entre 8 y 15 dígitos, por ejemplo +5491123456789."
                .to_string()
        }
        ValidationError::InvalidAmount(_) | ValidationError::NonPositiveAmount => {
            "Monto inválido. Ingresa un número mayor a cero.".to_string()
        }
        ValidationError::InvalidCuil(_) => {
            "El CUIL debe tener 11 dígitos. Intenta nuevamente.".to_string()
        }
        ValidationError::EmptyName | ValidationError::NameTooLong => {
            "Ingresa tu nombre completo.".to_string()
        }
        ValidationError::EmptyPlatform => "Ingresa el nombre de la plataforma.".to_string(),
        ValidationError::UnknownPlatform { allowed, .. } => format!(
            "Esa plataforma no está disponible. Opciones: {}.",
            allowed.join(", ")
        ),
    };
    format!("⚠️ {}", detail)
}

/// One text block listing the history, oldest first.
pub fn history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return HISTORY_EMPTY.to_string();
    }
    let mut text = String::from(HISTORY_HEADER);
    for entry in entries {
        text.push_str("<br>• ");
        text.push_str(&entry.rol);
        text.push_str(": ");
        text.push_str(&entry.contenido);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_formatting() {
        assert_eq!(history(&[]), HISTORY_EMPTY);
        let text = history(&[HistoryEntry {
            rol: "user".into(),
            contenido: "hola".into(),
            created_at: None,
        }]);
        assert_eq!(text, "📜 Tu historial:<br>• user: hola");
    }

    #[test]
    fn test_unknown_platform_lists_options() {
        let text = invalid_input(&ValidationError::UnknownPlatform {
            input: "x".into(),
            allowed: vec!["Zeus".into(), "Ganamos".into()],
        });
        assert!(text.ends_with("Opciones: Zeus, Ganamos."));
    }
}
