//! The end-user chat session.
//!
//! [`ChatSession`] is a synchronous reducer. It interprets each piece of
//! input according to the current [`ConversationState`], appends to the
//! message log, and returns the [`Effect`]s its driver must carry out:
//! dispatching a request, or arming/cancelling the inactivity timer. The
//! outcome of a dispatched request comes back through
//! [`ChatSession::apply_response`].
//!
//! State only advances when a request succeeds. A failed request rolls the
//! machine back to the prompt that issued it and appends an apology; a
//! response whose ticket no longer matches (the session was reset in the
//! meantime) is dropped.

mod effects;
mod preferences;
pub mod replies;

pub use effects::{ApiCall, ApiReply, Effect, Request, Response, Ticket};
pub use preferences::{Preferences, Theme};

use std::collections::BTreeMap;

use fichas_client::models::{ComplaintRequest, RegistrationRequest, RelayRequest, WithdrawRequest};
use fichas_client::ApiError;
use fichas_core::command::is_cancel;
use fichas_core::{
    Amount, Command, Config, Cuil, FullName, MessageContent, OfferChoice, PhoneNumber, Platform,
    Sender,
};
use fichas_state::{CloseReason, ConversationEvent, ConversationState, StateMachine, StateTransition};

use crate::error::{Result, SessionError};
use crate::message_log::MessageLog;

/// Fields collected by the multi-step flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Nombre,
    Cuil,
    Monto,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nombre => "nombre",
            Self::Cuil => "cuil",
            Self::Monto => "monto",
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: Ticket,
    /// Phone under lookup; becomes the session's phone only if the lookup
    /// succeeds.
    phone: Option<PhoneNumber>,
    /// Platform picked from relay options; kept only if the relay succeeds.
    platform: Option<String>,
}

#[derive(Debug)]
pub struct ChatSession {
    machine: StateMachine,
    log: MessageLog,
    phone: Option<PhoneNumber>,
    registered: bool,
    buffer: BTreeMap<Field, String>,
    selected_platform: Option<String>,
    /// Options of the last relay reply tagged `select_platform`.
    platform_choices: Vec<String>,
    /// Labels sent with the lookup reply. Empty means the local ones.
    offer_labels: Vec<String>,
    menu_labels: Vec<String>,
    preferences: Preferences,
    platforms: Vec<String>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ChatSession {
    /// `platforms` restricts the accepted platform names; empty accepts any.
    pub fn new(platforms: Vec<String>) -> Self {
        Self {
            machine: StateMachine::new(),
            log: MessageLog::new(),
            phone: None,
            registered: false,
            buffer: BTreeMap::new(),
            selected_platform: None,
            platform_choices: Vec::new(),
            offer_labels: Vec::new(),
            menu_labels: Vec::new(),
            preferences: Preferences::default(),
            platforms,
            in_flight: None,
            next_request_id: 0,
            epoch: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.platforms.clone())
    }

    // ========== Accessors ==========

    pub fn state(&self) -> ConversationState {
        self.machine.state()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn phone(&self) -> Option<&PhoneNumber> {
        self.phone.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn buffer(&self) -> &BTreeMap<Field, String> {
        &self.buffer
    }

    pub fn selected_platform(&self) -> Option<&str> {
        self.selected_platform.as_deref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn placeholder(&self) -> &'static str {
        self.state().placeholder()
    }

    /// A request is outstanding; `submit` is refused until it resolves.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of resets so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn transitions(&self) -> &[StateTransition] {
        self.machine.history()
    }

    /// Map a 1-based option number to its label when the last entry of the
    /// log is an option set. Anything else is returned trimmed.
    pub fn resolve_choice(&self, input: &str) -> String {
        let trimmed = input.trim();
        let labels = self
            .log
            .last()
            .map(|m| m.content.option_labels())
            .unwrap_or_default();
        trimmed
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    // ========== Operations ==========

    /// Open the chat and greet. No-op when already open.
    pub fn open(&mut self) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        self.open_into(&mut effects)?;
        Ok(effects)
    }

    /// Handle one line of user input.
    pub fn submit(&mut self, input: &str) -> Result<Vec<Effect>> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        let mut effects = Vec::new();
        self.open_into(&mut effects)?;
        self.append(&mut effects, text.to_string(), Sender::User);

        use ConversationState::*;
        match self.state() {
            AwaitingPhone => self.on_phone(text, &mut effects)?,
            RegistrationOffered => self.on_offer(text, &mut effects)?,
            AwaitingRegistrationName => self.on_name(text, &mut effects)?,
            AwaitingRegistrationCuil => self.on_cuil(text, &mut effects)?,
            AwaitingRegistrationPlatform => self.on_registration_platform(text, &mut effects)?,
            AwaitingCommand => self.on_command(text, &mut effects)?,
            AwaitingWithdrawAmount => self.on_amount(text, &mut effects)?,
            AwaitingWithdrawPlatform => self.on_withdraw_platform(text, &mut effects)?,
            AwaitingComplaintText => self.on_complaint(text, &mut effects)?,
            // Pending states; in_flight already refused them above.
            Inactive | LookupPending | RegistrationPending | WithdrawPending
            | ComplaintPending | ViewingHistory | RelayPending => return Err(SessionError::Busy),
        }
        Ok(effects)
    }

    /// Feed back the outcome of a dispatched request.
    pub fn apply_response(&mut self, response: Response) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.ticket == response.ticket => in_flight,
            other => {
                self.in_flight = other;
                tracing::debug!(ticket = ?response.ticket, epoch = self.epoch, "ignoring stale response");
                return Ok(effects);
            }
        };

        match response.result {
            Ok(reply) => self.on_success(reply, in_flight, &mut effects)?,
            Err(error) => self.on_failure(&error, &mut effects)?,
        }
        Ok(effects)
    }

    /// Inactivity timeout.
    pub fn expire(&mut self) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        if self.state() != ConversationState::Inactive {
            self.close_into(&mut effects, CloseReason::TimedOut, replies::TIMED_OUT)?;
        }
        Ok(effects)
    }

    /// Explicit close.
    pub fn close(&mut self) -> Result<Vec<Effect>> {
        let mut effects = Vec::new();
        if self.state() != ConversationState::Inactive {
            self.close_into(&mut effects, CloseReason::Cancelled, replies::CLOSED)?;
        }
        Ok(effects)
    }

    // ========== Input handlers ==========

    fn on_phone(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        match PhoneNumber::parse(text) {
            Ok(phone) => {
                self.transition(ConversationEvent::PhoneSubmitted)?;
                let in_flight = self.dispatch(effects, ApiCall::Lookup(phone.clone()));
                in_flight.phone = Some(phone);
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_offer(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        let choice = OfferChoice::parse(text).or_else(|| {
            match label_position(&self.offer_labels, text)? {
                0 => Some(OfferChoice::Register),
                1 => Some(OfferChoice::Cancel),
                _ => None,
            }
        });
        match choice {
            Some(OfferChoice::Register) => {
                self.transition(ConversationEvent::RegistrationAccepted)?;
                self.bot(effects, replies::ASK_NAME);
            }
            Some(OfferChoice::Cancel) => {
                self.close_into(effects, CloseReason::Cancelled, replies::REGISTRATION_CANCELLED)?
            }
            None => self.show_offer(effects, None),
        }
        Ok(())
    }

    fn on_name(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.close_into(effects, CloseReason::Cancelled, replies::REGISTRATION_CANCELLED);
        }
        match FullName::parse(text) {
            Ok(name) => {
                self.buffer.insert(Field::Nombre, name.as_str().to_string());
                self.transition(ConversationEvent::NameCaptured)?;
                self.bot(effects, replies::ASK_CUIL);
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_cuil(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.close_into(effects, CloseReason::Cancelled, replies::REGISTRATION_CANCELLED);
        }
        match Cuil::parse(text) {
            Ok(cuil) => {
                self.buffer.insert(Field::Cuil, cuil.as_str().to_string());
                self.transition(ConversationEvent::CuilCaptured)?;
                self.ask_platform(effects);
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_registration_platform(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.close_into(effects, CloseReason::Cancelled, replies::REGISTRATION_CANCELLED);
        }
        match Platform::parse(text, &self.platforms) {
            Ok(platform) => {
                let request = RegistrationRequest {
                    nombre: self.field(Field::Nombre),
                    cuil: self.field(Field::Cuil),
                    plataforma: platform.as_str().to_string(),
                    telefono: self.telefono(),
                };
                self.transition(ConversationEvent::PlatformCaptured)?;
                self.dispatch(effects, ApiCall::Register(request));
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_command(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        let command = Command::parse(text).or_else(|| {
            label_position(&self.menu_labels, text).and_then(|i| Command::ALL.get(i).copied())
        });
        if let Some(command) = command {
            return self.run_command(command, effects);
        }

        let picked = self
            .platform_choices
            .iter()
            .find(|p| p.eq_ignore_ascii_case(text))
            .cloned();
        let request = RelayRequest {
            telefono: self.telefono(),
            mensaje: text.to_string(),
            plataforma: picked.clone().or_else(|| self.selected_platform.clone()),
        };
        self.transition(ConversationEvent::RelaySent)?;
        self.dispatch(effects, ApiCall::Relay(request)).platform = picked;
        Ok(())
    }

    fn run_command(&mut self, command: Command, effects: &mut Vec<Effect>) -> Result<()> {
        self.transition(ConversationEvent::CommandSelected { command })?;
        match command {
            Command::Retiro => self.bot(effects, replies::ASK_AMOUNT),
            Command::Mensaje => self.bot(effects, replies::ASK_COMPLAINT),
            Command::Historial => {
                let phone = self.phone.clone().ok_or(SessionError::NotAuthenticated)?;
                self.dispatch(effects, ApiCall::History(phone));
            }
            Command::Cancelar => {
                self.buffer.clear();
                self.bot(effects, replies::CANCELLED);
                self.show_menu(effects);
            }
        }
        Ok(())
    }

    fn on_amount(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.run_command(Command::Cancelar, effects);
        }
        match Amount::parse(text) {
            Ok(amount) => {
                self.buffer.insert(Field::Monto, amount.value().to_string());
                self.transition(ConversationEvent::AmountCaptured)?;
                self.ask_platform(effects);
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_withdraw_platform(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.run_command(Command::Cancelar, effects);
        }
        match Platform::parse(text, &self.platforms) {
            Ok(platform) => {
                let monto = self
                    .buffer
                    .get(&Field::Monto)
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or_default();
                let request = WithdrawRequest {
                    telefono: self.telefono(),
                    monto,
                    plataforma: platform.as_str().to_string(),
                };
                self.transition(ConversationEvent::WithdrawPlatformCaptured)?;
                self.dispatch(effects, ApiCall::Withdraw(request));
            }
            Err(error) => self.bot(effects, replies::invalid_input(&error)),
        }
        Ok(())
    }

    fn on_complaint(&mut self, text: &str, effects: &mut Vec<Effect>) -> Result<()> {
        if is_cancel(text) {
            return self.run_command(Command::Cancelar, effects);
        }
        let request = ComplaintRequest {
            telefono: self.telefono(),
            mensaje: text.to_string(),
        };
        self.transition(ConversationEvent::ComplaintCaptured)?;
        self.dispatch(effects, ApiCall::Complaint(request));
        Ok(())
    }

    // ========== Response handlers ==========

    fn on_success(
        &mut self,
        reply: ApiReply,
        in_flight: InFlight,
        effects: &mut Vec<Effect>,
    ) -> Result<()> {
        match reply {
            ApiReply::Lookup(outcome) => {
                self.phone = in_flight.phone;
                if outcome.found {
                    self.registered = true;
                    self.menu_labels = outcome.options.clone();
                    self.transition(ConversationEvent::LookupFound)?;
                    let greeting = outcome
                        .reply
                        .clone()
                        .unwrap_or_else(|| replies::welcome_back(outcome.user_name()));
                    self.bot(effects, greeting);
                    self.show_menu(effects);
                } else {
                    self.offer_labels = outcome.options;
                    self.transition(ConversationEvent::LookupNotFound)?;
                    self.show_offer(effects, outcome.reply);
                }
            }
            ApiReply::Registered(outcome) => {
                self.registered = true;
                self.buffer.clear();
                self.transition(ConversationEvent::RegistrationConfirmed)?;
                self.bot(effects, outcome.reply.unwrap_or_else(|| replies::REGISTERED.to_string()));
                self.show_menu(effects);
            }
            ApiReply::Withdrawn(text) | ApiReply::ComplaintFiled(text) => {
                self.buffer.clear();
                self.transition(ConversationEvent::RequestCompleted)?;
                self.bot(effects, text);
                self.show_menu(effects);
            }
            ApiReply::History(entries) => {
                self.transition(ConversationEvent::RequestCompleted)?;
                self.bot(effects, replies::history(&entries));
                self.show_menu(effects);
            }
            ApiReply::Relayed(relay) => {
                self.transition(ConversationEvent::RequestCompleted)?;
                if let Some(platform) = in_flight.platform {
                    tracing::info!(%platform, "platform selected through relay");
                    self.selected_platform = Some(platform);
                }
                if let Some(text) = relay.reply.as_deref().filter(|t| !t.trim().is_empty()) {
                    let sender = Sender::from_role(relay.rol.as_deref().unwrap_or("bot"));
                    self.append(effects, text.to_string(), sender);
                }
                self.platform_choices = if relay.selects_platform() {
                    relay.options.clone()
                } else {
                    Vec::new()
                };
                if !relay.options.is_empty() {
                    let mut content = MessageContent::options(relay.options);
                    if let Some(action) = relay.action {
                        content = content.with_action(action);
                    }
                    self.bot(effects, content);
                }
            }
        }
        Ok(())
    }

    fn on_failure(&mut self, error: &ApiError, effects: &mut Vec<Effect>) -> Result<()> {
        if error.is_network() {
            tracing::warn!(state = ?self.state(), %error, "request failed, rolling back");
        } else {
            tracing::info!(state = ?self.state(), %error, "request rejected, rolling back");
        }
        self.transition(ConversationEvent::RequestFailed)?;
        let apology = match error.user_message() {
            Some(message) => format!("⚠️ {}", message),
            None => replies::NETWORK_ERROR.to_string(),
        };
        self.bot(effects, apology);
        Ok(())
    }

    // ========== Helpers ==========

    fn open_into(&mut self, effects: &mut Vec<Effect>) -> Result<()> {
        if self.state() != ConversationState::Inactive {
            return Ok(());
        }
        self.transition(ConversationEvent::ChatOpened)?;
        self.bot(effects, replies::WELCOME);
        Ok(())
    }

    fn close_into(
        &mut self,
        effects: &mut Vec<Effect>,
        reason: CloseReason,
        farewell: &str,
    ) -> Result<()> {
        self.transition(ConversationEvent::SessionClosed { reason })?;
        self.phone = None;
        self.registered = false;
        self.buffer.clear();
        self.selected_platform = None;
        self.platform_choices.clear();
        self.offer_labels.clear();
        self.menu_labels.clear();
        self.in_flight = None;
        self.epoch += 1;
        tracing::info!(?reason, epoch = self.epoch, "session reset");

        effects.retain(|e| !matches!(e, Effect::ArmTimer));
        effects.push(Effect::CancelTimer);
        self.bot(effects, farewell);
        Ok(())
    }

    fn transition(&mut self, event: ConversationEvent) -> Result<()> {
        self.machine.handle_event(event)?;
        Ok(())
    }

    /// Queue `call` and mark it outstanding. The returned slot carries
    /// what to commit once the call succeeds.
    fn dispatch(&mut self, effects: &mut Vec<Effect>, call: ApiCall) -> &mut InFlight {
        let ticket = Ticket {
            id: self.next_request_id,
            epoch: self.epoch,
        };
        self.next_request_id += 1;
        tracing::debug!(call = call.name(), id = ticket.id, epoch = ticket.epoch, "dispatching request");
        effects.push(Effect::Dispatch(Request { ticket, call }));
        self.in_flight.insert(InFlight {
            ticket,
            phone: None,
            platform: None,
        })
    }

    /// Append to the log. Every entry appended while the chat is open
    /// rearms the inactivity timer.
    fn append(&mut self, effects: &mut Vec<Effect>, content: impl Into<MessageContent>, sender: Sender) {
        self.log.append(content, sender);
        if self.state() != ConversationState::Inactive && !effects.contains(&Effect::ArmTimer) {
            effects.push(Effect::ArmTimer);
        }
    }

    fn bot(&mut self, effects: &mut Vec<Effect>, content: impl Into<MessageContent>) {
        self.append(effects, content, Sender::Bot);
    }

    fn show_menu(&mut self, effects: &mut Vec<Effect>) {
        let labels = if self.menu_labels.is_empty() {
            Command::menu_labels()
        } else {
            self.menu_labels.clone()
        };
        let menu = MessageContent::options(labels).with_prompt(replies::MENU_PROMPT);
        self.bot(effects, menu);
    }

    fn show_offer(&mut self, effects: &mut Vec<Effect>, reply: Option<String>) {
        self.bot(effects, reply.unwrap_or_else(|| replies::NOT_FOUND.to_string()));
        let labels = if self.offer_labels.is_empty() {
            OfferChoice::labels()
        } else {
            self.offer_labels.clone()
        };
        let offer = MessageContent::options(labels).with_prompt(replies::OFFER_PROMPT);
        self.bot(effects, offer);
    }

    fn ask_platform(&mut self, effects: &mut Vec<Effect>) {
        if self.platforms.is_empty() {
            self.bot(effects, replies::ASK_PLATFORM);
        } else {
            let choices =
                MessageContent::options(self.platforms.clone()).with_prompt(replies::ASK_PLATFORM);
            self.bot(effects, choices);
        }
    }

    fn field(&self, field: Field) -> String {
        self.buffer.get(&field).cloned().unwrap_or_default()
    }

    fn telefono(&self) -> String {
        self.phone.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

/// Position of `text` among option labels, ignoring case.
fn label_position(labels: &[String], text: &str) -> Option<usize> {
    labels.iter().position(|l| l.trim().eq_ignore_ascii_case(text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fichas_client::models::{HistoryEntry, LookupOutcome, RegistrationOutcome, RelayReply};

    const SEEDED: &str = "+5491123456789";

    fn only_dispatch(effects: &[Effect]) -> Request {
        let dispatched: Vec<&Request> = effects.iter().filter_map(Effect::as_dispatch).collect();
        assert_eq!(dispatched.len(), 1, "expected one dispatch in {effects:?}");
        dispatched[0].clone()
    }

    fn found(reply: Option<&str>) -> ApiReply {
        ApiReply::Lookup(LookupOutcome {
            found: true,
            reply: reply.map(str::to_string),
            options: vec![],
            meta: None,
        })
    }

    fn not_found() -> ApiReply {
        ApiReply::Lookup(LookupOutcome {
            found: false,
            reply: None,
            options: vec![],
            meta: None,
        })
    }

    fn relayed(reply: &str) -> ApiReply {
        ApiReply::Relayed(RelayReply {
            reply: Some(reply.into()),
            rol: Some("bot".into()),
            options: vec![],
            action: None,
        })
    }

    fn last_text(session: &ChatSession) -> String {
        session.log().last().unwrap().content.plain_text()
    }

    /// Session sitting in AwaitingCommand for the seeded phone.
    fn registered_session(platforms: Vec<String>) -> ChatSession {
        let mut session = ChatSession::new(platforms);
        let request = only_dispatch(&session.submit(SEEDED).unwrap());
        session
            .apply_response(Response::ok(request.ticket, found(Some("¡Hola Juan!"))))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        session
    }

    #[test]
    fn test_open_greets_and_arms_timer() {
        let mut session = ChatSession::default();
        let effects = session.open().unwrap();

        assert_eq!(session.state(), ConversationState::AwaitingPhone);
        assert_eq!(effects, vec![Effect::ArmTimer]);
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().entries()[0].content.as_text(), Some(replies::WELCOME));

        assert!(session.open().unwrap().is_empty());
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_text_while_inactive_opens_chat() {
        let mut session = ChatSession::default();
        session.submit("hola").unwrap();

        let entries = session.log().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].content.as_text(), Some(replies::WELCOME));
        assert_eq!(entries[1].sender, Sender::User);
        assert_eq!(session.state(), ConversationState::AwaitingPhone);
    }

    #[test]
    fn test_valid_phone_dispatches_single_lookup() {
        let mut session = ChatSession::default();
        session.open().unwrap();
        let effects = session.submit("+54 9 11 2345-6789").unwrap();

        let request = only_dispatch(&effects);
        assert_eq!(
            request.call,
            ApiCall::Lookup(PhoneNumber::parse(SEEDED).unwrap())
        );
        assert_eq!(session.state(), ConversationState::LookupPending);
        assert!(session.is_busy());
        assert_eq!(session.phone(), None);
    }

    #[test]
    fn test_invalid_phone_stays_awaiting_phone() {
        let mut session = ChatSession::default();
        session.open().unwrap();
        let before = session.log().len();
        let effects = session.submit("1234").unwrap();

        assert!(effects.iter().all(|e| e.as_dispatch().is_none()));
        assert_eq!(session.state(), ConversationState::AwaitingPhone);
        assert_eq!(session.log().len(), before + 2);
        assert!(last_text(&session).starts_with("⚠️"));
    }

    #[test]
    fn test_lookup_found_shows_menu() {
        let session = registered_session(vec![]);
        assert!(session.is_registered());
        assert_eq!(session.phone().map(|p| p.as_str()), Some(SEEDED));
        assert!(!session.is_busy());

        let last = session.log().last().unwrap();
        assert_eq!(last.content.option_labels(), Command::menu_labels().as_slice());
    }

    #[test]
    fn test_lookup_not_found_then_cancel_resets() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session.apply_response(Response::ok(request.ticket, not_found())).unwrap();

        assert_eq!(session.state(), ConversationState::RegistrationOffered);
        assert_eq!(
            session.log().last().unwrap().content.option_labels(),
            OfferChoice::labels().as_slice()
        );

        let effects = session.submit("cancelar").unwrap();
        assert_eq!(session.state(), ConversationState::Inactive);
        assert_eq!(session.phone(), None);
        assert_eq!(effects, vec![Effect::CancelTimer]);
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn test_registration_flow() {
        let mut session = ChatSession::new(vec!["Zeus".into(), "Ganamos".into()]);
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session.apply_response(Response::ok(request.ticket, not_found())).unwrap();

        session.submit("registrarme").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationName);

        session.submit("  ").unwrap_err();
        session.submit("Ana   García").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationCuil);

        session.submit("27-1234").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationCuil);
        session.submit("27-12345678-0").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationPlatform);

        session.submit("Bet365").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationPlatform);

        let request = only_dispatch(&session.submit("zeus").unwrap());
        assert_eq!(
            request.call,
            ApiCall::Register(RegistrationRequest {
                nombre: "Ana García".into(),
                cuil: "27123456780".into(),
                plataforma: "Zeus".into(),
                telefono: "+5490000000000".into(),
            })
        );

        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Registered(RegistrationOutcome { reply: None }),
            ))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        assert!(session.is_registered());
        assert!(session.buffer().is_empty());
    }

    #[test]
    fn test_cancel_during_registration_returns_inactive() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session.apply_response(Response::ok(request.ticket, not_found())).unwrap();
        session.submit("1").unwrap();
        session.submit("Ana").unwrap();
        assert_eq!(session.buffer().get(&Field::Nombre).map(String::as_str), Some("Ana"));

        session.submit("Cancelar").unwrap();
        assert_eq!(session.state(), ConversationState::Inactive);
        assert!(session.buffer().is_empty());
        assert_eq!(last_text(&session), replies::REGISTRATION_CANCELLED);
    }

    #[test]
    fn test_registration_rejected_shows_service_message() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session.apply_response(Response::ok(request.ticket, not_found())).unwrap();
        session.submit("registrarme").unwrap();
        session.submit("Ana").unwrap();
        session.submit("27123456780").unwrap();
        let request = only_dispatch(&session.submit("Zeus").unwrap());

        session
            .apply_response(Response::err(
                request.ticket,
                ApiError::Rejected("CUIL duplicado".into()),
            ))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationPlatform);
        assert_eq!(last_text(&session), "⚠️ CUIL duplicado");
        assert_eq!(session.buffer().len(), 2);
    }

    #[test]
    fn test_withdraw_amount_validation() {
        let mut session = registered_session(vec![]);
        session.submit("retiro").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingWithdrawAmount);

        for bad in ["abc", "0", "-5"] {
            let effects = session.submit(bad).unwrap();
            assert!(effects.iter().all(|e| e.as_dispatch().is_none()));
            assert_eq!(session.state(), ConversationState::AwaitingWithdrawAmount);
        }

        session.submit("500").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingWithdrawPlatform);
        assert_eq!(session.buffer().get(&Field::Monto).map(String::as_str), Some("500"));

        let request = only_dispatch(&session.submit("Zeus").unwrap());
        assert_eq!(
            request.call,
            ApiCall::Withdraw(WithdrawRequest {
                telefono: SEEDED.into(),
                monto: 500.0,
                plataforma: "Zeus".into(),
            })
        );
        assert_eq!(session.state(), ConversationState::WithdrawPending);

        session
            .apply_response(Response::ok(request.ticket, ApiReply::Withdrawn("Listo".into())))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        assert!(session.buffer().is_empty());
    }

    #[test]
    fn test_failed_withdrawal_restores_previous_prompt() {
        let mut session = registered_session(vec![]);
        session.submit("1").unwrap();
        session.submit("1.500,50").unwrap();
        let request = only_dispatch(&session.submit("Zeus").unwrap());

        let effects = session
            .apply_response(Response::err(request.ticket, ApiError::Transport("down".into())))
            .unwrap();
        assert_eq!(effects, vec![Effect::ArmTimer]);
        assert_eq!(session.state(), ConversationState::AwaitingWithdrawPlatform);
        assert_eq!(last_text(&session), replies::NETWORK_ERROR);
        assert_eq!(session.buffer().get(&Field::Monto).map(String::as_str), Some("1500.5"));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_failed_lookup_keeps_phone_unset() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit(SEEDED).unwrap());
        session
            .apply_response(Response::err(
                request.ticket,
                ApiError::Status {
                    status: 502,
                    body: String::new(),
                },
            ))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingPhone);
        assert_eq!(session.phone(), None);

        let retry = only_dispatch(&session.submit(SEEDED).unwrap());
        assert_ne!(retry.ticket, request.ticket);
    }

    #[test]
    fn test_cancel_inside_subflow_returns_to_menu() {
        let mut session = registered_session(vec![]);
        session.submit("retiro").unwrap();
        session.submit("200").unwrap();
        session.submit("cancelar").unwrap();

        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        assert!(session.buffer().is_empty());
        assert_eq!(session.phone().map(|p| p.as_str()), Some(SEEDED));

        session.submit("mensaje").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingComplaintText);
        session.submit("cancelar").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
    }

    #[test]
    fn test_complaint_submission() {
        let mut session = registered_session(vec![]);
        session.submit("Mensaje").unwrap();
        let request = only_dispatch(&session.submit("No me acreditaron la carga").unwrap());
        assert_eq!(
            request.call,
            ApiCall::Complaint(ComplaintRequest {
                telefono: SEEDED.into(),
                mensaje: "No me acreditaron la carga".into(),
            })
        );
        session
            .apply_response(Response::ok(request.ticket, ApiReply::ComplaintFiled("Recibido".into())))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
    }

    #[test]
    fn test_submit_while_busy_is_refused() {
        let mut session = ChatSession::default();
        session.submit(SEEDED).unwrap();
        let len = session.log().len();

        assert!(matches!(session.submit("hola"), Err(SessionError::Busy)));
        assert_eq!(session.log().len(), len);
        assert!(matches!(session.submit("   "), Err(SessionError::EmptyInput)));
    }

    #[test]
    fn test_stale_response_after_close_is_ignored() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit(SEEDED).unwrap());
        session.close().unwrap();
        let len = session.log().len();

        let effects = session
            .apply_response(Response::ok(request.ticket, found(None)))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(session.state(), ConversationState::Inactive);
        assert_eq!(session.log().len(), len);
        assert_eq!(session.phone(), None);
    }

    #[test]
    fn test_expire_resets_but_keeps_log_and_preferences() {
        let mut session = registered_session(vec![]);
        session.preferences_mut().toggle_theme();
        let len = session.log().len();

        let effects = session.expire().unwrap();
        assert_eq!(effects, vec![Effect::CancelTimer]);
        assert_eq!(session.state(), ConversationState::Inactive);
        assert!(!session.is_registered());
        assert_eq!(session.log().len(), len + 1);
        assert_eq!(last_text(&session), replies::TIMED_OUT);
        assert_eq!(session.preferences().theme, Theme::Light);

        assert!(session.expire().unwrap().is_empty());
    }

    #[test]
    fn test_history_returns_to_menu() {
        let mut session = registered_session(vec![]);
        let request = only_dispatch(&session.submit("historial").unwrap());
        assert_eq!(session.state(), ConversationState::ViewingHistory);

        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::History(vec![HistoryEntry {
                    rol: "user".into(),
                    contenido: "hola".into(),
                    created_at: None,
                }]),
            ))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        assert!(session.is_registered());
        let history_text = &session.log().entries()[session.log().len() - 2];
        assert!(history_text.content.plain_text().contains("user: hola"));
    }

    #[test]
    fn test_relay_platform_selection() {
        let mut session = registered_session(vec![]);
        let request = only_dispatch(&session.submit("quiero cargar").unwrap());
        assert_eq!(session.state(), ConversationState::RelayPending);

        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Relayed(RelayReply {
                    reply: Some("¿En qué plataforma?".into()),
                    rol: Some("bot".into()),
                    options: vec!["Zeus".into(), "Ganamos".into()],
                    action: Some("select_platform".into()),
                }),
            ))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);

        let choice = session.resolve_choice("2");
        assert_eq!(choice, "Ganamos");
        let request = only_dispatch(&session.submit(&choice).unwrap());
        assert_eq!(session.selected_platform(), None);
        match &request.call {
            ApiCall::Relay(relay) => assert_eq!(relay.plataforma.as_deref(), Some("Ganamos")),
            other => panic!("unexpected call {other:?}"),
        }

        session
            .apply_response(Response::ok(request.ticket, relayed("Listo, Ganamos")))
            .unwrap();
        assert_eq!(session.selected_platform(), Some("Ganamos"));
    }

    #[test]
    fn test_failed_relay_keeps_previous_platform() {
        let mut session = registered_session(vec![]);
        let request = only_dispatch(&session.submit("quiero cargar").unwrap());
        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Relayed(RelayReply {
                    reply: None,
                    rol: None,
                    options: vec!["Zeus".into()],
                    action: Some("select_platform".into()),
                }),
            ))
            .unwrap();

        let request = only_dispatch(&session.submit("Zeus").unwrap());
        session
            .apply_response(Response::err(request.ticket, ApiError::Transport("down".into())))
            .unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingCommand);
        assert_eq!(session.selected_platform(), None);
        assert_eq!(last_text(&session), replies::NETWORK_ERROR);

        let retry = only_dispatch(&session.submit("Zeus").unwrap());
        session
            .apply_response(Response::ok(retry.ticket, relayed("Anotado")))
            .unwrap();
        assert_eq!(session.selected_platform(), Some("Zeus"));
    }

    #[test]
    fn test_lookup_not_found_shows_service_options() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Lookup(LookupOutcome {
                    found: false,
                    reply: Some("No encontramos tu número".into()),
                    options: vec!["Crear cuenta".into(), "Salir".into()],
                    meta: None,
                }),
            ))
            .unwrap();

        assert_eq!(
            session.log().last().unwrap().content.option_labels(),
            ["Crear cuenta".to_string(), "Salir".to_string()].as_slice()
        );
        session.submit("quizas").unwrap();
        assert_eq!(session.state(), ConversationState::RegistrationOffered);
        assert_eq!(
            session.log().last().unwrap().content.option_labels(),
            ["Crear cuenta".to_string(), "Salir".to_string()].as_slice()
        );

        let choice = session.resolve_choice("1");
        assert_eq!(choice, "Crear cuenta");
        session.submit(&choice).unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingRegistrationName);
    }

    #[test]
    fn test_service_offer_second_option_cancels() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit("+5490000000000").unwrap());
        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Lookup(LookupOutcome {
                    found: false,
                    reply: None,
                    options: vec!["Crear cuenta".into(), "Volver".into()],
                    meta: None,
                }),
            ))
            .unwrap();

        session.submit("volver").unwrap();
        assert_eq!(session.state(), ConversationState::Inactive);
        assert_eq!(last_text(&session), replies::REGISTRATION_CANCELLED);
    }

    #[test]
    fn test_lookup_found_shows_service_menu() {
        let mut session = ChatSession::default();
        let request = only_dispatch(&session.submit(SEEDED).unwrap());
        let labels: Vec<String> = ["Retirar fichas", "Enviar reclamo", "Ver historial", "Cancelar"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Lookup(LookupOutcome {
                    found: true,
                    reply: Some("¡Hola Juan!".into()),
                    options: labels.clone(),
                    meta: None,
                }),
            ))
            .unwrap();
        assert_eq!(session.log().last().unwrap().content.option_labels(), labels.as_slice());

        let request = only_dispatch(&session.submit("Ver historial").unwrap());
        assert_eq!(session.state(), ConversationState::ViewingHistory);
        session
            .apply_response(Response::ok(request.ticket, ApiReply::History(vec![])))
            .unwrap();
        assert_eq!(session.log().last().unwrap().content.option_labels(), labels.as_slice());

        session.submit("retirar fichas").unwrap();
        assert_eq!(session.state(), ConversationState::AwaitingWithdrawAmount);
    }

    #[test]
    fn test_relay_reply_uses_role() {
        let mut session = registered_session(vec![]);
        let request = only_dispatch(&session.submit("hola").unwrap());
        session
            .apply_response(Response::ok(
                request.ticket,
                ApiReply::Relayed(RelayReply {
                    reply: Some("Te atiende soporte".into()),
                    rol: Some("admin".into()),
                    options: vec![],
                    action: None,
                }),
            ))
            .unwrap();
        assert_eq!(session.log().last().unwrap().sender, Sender::Admin);
    }

    #[test]
    fn test_resolve_choice_without_options() {
        let mut session = ChatSession::default();
        session.open().unwrap();
        assert_eq!(session.resolve_choice(" 3 "), "3");
    }
}
