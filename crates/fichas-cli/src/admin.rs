//! One-shot admin panel commands. The login token is kept on disk between
//! invocations.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Subcommand;
use colored::Colorize;
use fichas_client::models::{ComplaintStatus, HistoryEntry, RecordId};
use fichas_client::AdminBackend;
use fichas_core::Sender;
use fichas_session::{AdminMenu, AdminPanel, FileTokenStore};

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Log in and store the token
    Login {
        #[arg(long, short)]
        user: String,
        /// Password (prompted when omitted; the prompt echoes what is typed)
        #[arg(long, short, env = "FICHAS_ADMIN_PASS")]
        pass: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// List conversations
    Conversations,
    /// Show the chat history of a phone
    History { telefono: String },
    /// Reply in a conversation
    Respond { telefono: String, mensaje: String },
    /// Look a user up by phone
    Search { telefono: String },
    /// List users waiting for approval
    Pending,
    /// Approve a pending user
    Approve { id: String },
    /// Reject a pending user
    Reject { id: String },
    /// List complaints
    Complaints,
    /// Change the status of a complaint
    ComplaintUpdate {
        id: String,
        #[arg(value_parser = parse_status)]
        estado: ComplaintStatus,
    },
}

fn parse_status(input: &str) -> Result<ComplaintStatus, String> {
    ComplaintStatus::parse(input)
        .ok_or_else(|| format!("'{}' no es un estado (pendiente, atendido, rechazado)", input))
}

pub async fn run(api: Arc<dyn AdminBackend>, command: AdminCommand) -> anyhow::Result<()> {
    let tokens = Arc::new(FileTokenStore::default_location());
    let mut panel = AdminPanel::restore(api, tokens).await?;

    match command {
        AdminCommand::Login { user, pass } => {
            let pass = match pass {
                Some(pass) => pass,
                None => read_password(io::stdin().lock(), io::stdout())?,
            };
            let admin = panel.login(&user, &pass).await?;
            let name = admin.nombre.as_deref().unwrap_or(&admin.user);
            println!("{} {}", "✅ Sesión iniciada como".green(), name.bold());
        }
        AdminCommand::Logout => {
            panel.logout().await?;
            println!("{}", "👋 Sesión cerrada".green());
        }
        AdminCommand::Conversations => {
            panel.select_menu(AdminMenu::Conversations).await?;
            if panel.conversations().is_empty() {
                println!("{}", "No hay conversaciones.".dimmed());
            }
            for conversation in panel.conversations() {
                println!(
                    "• {} {}",
                    conversation.telefono.bold(),
                    conversation.nombre.as_deref().unwrap_or("").dimmed()
                );
            }
        }
        AdminCommand::History { telefono } => {
            panel.select_conversation(&telefono).await?;
            print_history(panel.chat_history());
        }
        AdminCommand::Respond { telefono, mensaje } => {
            panel.select_conversation(&telefono).await?;
            panel.respond(&mensaje).await?;
            println!("{} {}", "✅ Respuesta enviada a".green(), telefono.bold());
        }
        AdminCommand::Search { telefono } => {
            let result = panel.search_user(&telefono).await?;
            if result.found {
                println!(
                    "{} {} {}",
                    "👤".bold(),
                    result.telefono.bold(),
                    result.nombre.as_deref().unwrap_or("(sin nombre)")
                );
            } else {
                println!("{} {}", "❌ Sin cuenta:".red(), result.telefono);
            }
            print_history(&result.history);
        }
        AdminCommand::Pending => {
            panel.select_menu(AdminMenu::PendingUsers).await?;
            if panel.pending_users().is_empty() {
                println!("{}", "No hay usuarios pendientes.".dimmed());
            }
            for user in panel.pending_users() {
                println!(
                    "#{} {} {} CUIL {} [{}]",
                    user.id.to_string().bold(),
                    user.nombre.as_deref().unwrap_or("-"),
                    user.phone,
                    user.cuil.as_deref().unwrap_or("-"),
                    user.plataformas.as_deref().unwrap_or("-")
                );
            }
        }
        AdminCommand::Approve { id } => {
            panel.approve_user(&RecordId::parse(&id)).await?;
            println!("{} #{}", "✅ Usuario aprobado".green(), id);
        }
        AdminCommand::Reject { id } => {
            panel.reject_user(&RecordId::parse(&id)).await?;
            println!("{} #{}", "🚫 Usuario rechazado".yellow(), id);
        }
        AdminCommand::Complaints => {
            panel.select_menu(AdminMenu::Complaints).await?;
            if panel.complaints().is_empty() {
                println!("{}", "No hay reclamos.".dimmed());
            }
            for complaint in panel.complaints() {
                let who = complaint
                    .user
                    .as_ref()
                    .and_then(|u| u.nombre.as_deref().or(u.telefono.as_deref()))
                    .unwrap_or("-");
                println!(
                    "#{} [{}] {}: {}",
                    complaint.id.to_string().bold(),
                    status_label(complaint.estado),
                    who,
                    complaint.mensaje
                );
            }
        }
        AdminCommand::ComplaintUpdate { id, estado } => {
            panel.update_complaint(&RecordId::parse(&id), estado).await?;
            println!("{} #{} → {}", "✅ Reclamo".green(), id, status_label(estado));
        }
    }
    Ok(())
}

fn status_label(estado: ComplaintStatus) -> colored::ColoredString {
    match estado {
        ComplaintStatus::Pendiente => estado.as_str().yellow(),
        ComplaintStatus::Atendido => estado.as_str().green(),
        ComplaintStatus::Rechazado => estado.as_str().red(),
    }
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("{}", "Sin mensajes.".dimmed());
    }
    for entry in entries {
        let role = match Sender::from_role(&entry.rol) {
            Sender::User => entry.rol.cyan(),
            Sender::Bot => entry.rol.green(),
            Sender::Admin => entry.rol.yellow(),
        };
        let when = entry.created_at.as_deref().unwrap_or("");
        println!("{} {} {}", role.bold(), when.dimmed(), entry.contenido.replace("<br>", "\n"));
    }
}

/// Terminal input is not hidden, so the prompt says so and points at the
/// non-interactive alternatives.
const PASSWORD_PROMPT: &str = "Contraseña (visible al escribir; usá --pass o FICHAS_ADMIN_PASS para evitarlo):";

fn read_password(mut input: impl BufRead, mut output: impl Write) -> io::Result<String> {
    write!(output, "{} ", PASSWORD_PROMPT.cyan().bold())?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Atendido"), Ok(ComplaintStatus::Atendido));
        assert!(parse_status("cerrado").unwrap_err().contains("cerrado"));
    }

    #[test]
    fn test_password_prompt_warns_input_is_visible() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let pass = read_password(io::Cursor::new("s3creto\r\n"), &mut out).unwrap();

        assert_eq!(pass, "s3creto");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("visible"));
        assert!(shown.contains("FICHAS_ADMIN_PASS"));
    }
}
