//! Interactive end-user chat.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use colored::{ColoredString, Colorize};
use fichas_client::GestorApi;
use fichas_core::{Config, Message, Sender};
use fichas_session::{DriverEvent, SessionDriver, SessionError, Theme};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Comandos: /tema (claro/oscuro), /panel (mostrar/ocultar estado), /salir";

enum Flow {
    Continue,
    Quit,
}

pub async fn run(api: Arc<dyn GestorApi>, config: &Config) -> anyhow::Result<()> {
    let mut driver = SessionDriver::new(api, config);

    println!("{}", "💬 Gestor de Fichas".cyan().bold());
    println!("{}", HELP.dimmed());
    println!(
        "{}",
        format!(
            "La conversación se cierra tras {} minutos sin actividad.",
            driver.timer().timeout().as_secs() / 60
        )
        .dimmed()
    );
    println!();

    driver.open()?;
    // Seqs of the lines typed here; the terminal already shows them.
    let mut typed = HashSet::new();
    let mut shown = render(&driver, 0, &typed);
    prompt(&driver)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    driver.close()?;
                    render(&driver, shown, &typed);
                    break;
                };
                if let Flow::Quit = handle_line(&mut driver, line.trim(), &mut typed)? {
                    render(&driver, shown, &typed);
                    break;
                }
            }
            event = driver.next_event() => {
                if event? == DriverEvent::StaleTimer {
                    continue;
                }
            }
        }
        let rendered = render(&driver, shown, &typed);
        if rendered != shown {
            shown = rendered;
            prompt(&driver)?;
        }
    }

    println!("{}", "👋 ¡Hasta luego!".cyan());
    Ok(())
}

fn handle_line(
    driver: &mut SessionDriver,
    line: &str,
    typed: &mut HashSet<usize>,
) -> anyhow::Result<Flow> {
    match line {
        "/salir" => {
            driver.close()?;
            return Ok(Flow::Quit);
        }
        "/tema" => {
            let theme = driver.session_mut().preferences_mut().toggle_theme();
            let name = match theme {
                Theme::Dark => "oscuro",
                Theme::Light => "claro",
            };
            println!("{}", format!("🎨 Tema {}", name).dimmed());
            prompt(driver)?;
            return Ok(Flow::Continue);
        }
        "/panel" => {
            driver.session_mut().preferences_mut().toggle_sidebar();
            prompt(driver)?;
            return Ok(Flow::Continue);
        }
        "/ayuda" => {
            println!("{}", HELP.dimmed());
            prompt(driver)?;
            return Ok(Flow::Continue);
        }
        _ => {}
    }

    let input = driver.session().resolve_choice(line);
    let before = driver.session().log().len();
    match driver.submit(&input) {
        Ok(()) => typed.extend(first_user_entry(driver.session().log().since(before))),
        Err(SessionError::EmptyInput) => prompt(driver)?,
        Err(SessionError::Busy) => {
            println!("{}", "⏳ Esperando respuesta...".dimmed());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Flow::Continue)
}

/// The entry a successful submit appended for the line itself.
fn first_user_entry(entries: &[Message]) -> Option<usize> {
    entries.iter().find(|m| m.sender == Sender::User).map(|m| m.seq)
}

/// Entries not typed at this terminal.
fn unechoed<'a>(
    entries: &'a [Message],
    typed: &'a HashSet<usize>,
) -> impl Iterator<Item = &'a Message> + 'a {
    entries.iter().filter(move |m| !typed.contains(&m.seq))
}

/// Print log entries from `shown` on and return the new high-water mark.
fn render(driver: &SessionDriver, shown: usize, typed: &HashSet<usize>) -> usize {
    let session = driver.session();
    let theme = session.preferences().theme;
    let entries = session.log().since(shown);
    for message in unechoed(entries, typed) {
        println!("{}", format_message(message, theme));
    }
    shown + entries.len()
}

fn format_message(message: &Message, theme: Theme) -> String {
    let (label, body) = match message.sender {
        Sender::Bot => ("🤖 Bot", paint(message.content.plain_text(), theme)),
        Sender::Admin => ("🛟 Soporte", message.content.plain_text().yellow()),
        Sender::User => ("🙂 Vos", message.content.plain_text().normal()),
    };
    format!(
        "{} {}\n{}\n",
        label.bold(),
        format!("[{}]", message.display_time()).dimmed(),
        body
    )
}

fn paint(text: String, theme: Theme) -> ColoredString {
    match theme {
        Theme::Dark => text.green(),
        Theme::Light => text.blue(),
    }
}

fn prompt(driver: &SessionDriver) -> io::Result<()> {
    let session = driver.session();
    if !session.preferences().sidebar_collapsed {
        let phone = session
            .phone()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = format!("[{} · {}]", session.state().description(), phone);
        println!("{}", status.dimmed());
    }
    print!(
        "{} {} ",
        format!("({})", session.placeholder()).dimmed(),
        "Tú:".cyan().bold()
    );
    io::stdout().flush()
}
