//! Event loop around [`ChatSession`].
//!
//! The driver owns the session, the inactivity timer and the API handle. It
//! carries out the effects returned by the session: requests run on spawned
//! tasks and report back through a channel, and timer firings arrive on
//! another. [`SessionDriver::next_event`] waits on both.

use std::sync::Arc;

use fichas_client::GestorApi;
use fichas_core::Config;
use tokio::sync::mpsc;

use crate::error::{Result, SessionError};
use crate::session::{ChatSession, Effect, Response};
use crate::timer::{InactivityTimer, TimerFired};

/// What [`SessionDriver::next_event`] processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// A response was applied (or dropped as stale).
    ResponseApplied,
    /// The inactivity timer closed the session.
    TimedOut,
    /// A firing from a countdown that had already been replaced.
    StaleTimer,
}

pub struct SessionDriver {
    session: ChatSession,
    timer: InactivityTimer,
    api: Arc<dyn GestorApi>,
    responses_tx: mpsc::UnboundedSender<Response>,
    responses_rx: mpsc::UnboundedReceiver<Response>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
}

impl SessionDriver {
    pub fn new(api: Arc<dyn GestorApi>, config: &Config) -> Self {
        Self::with_session(api, ChatSession::from_config(config), config.inactivity_timeout())
    }

    pub fn with_session(
        api: Arc<dyn GestorApi>,
        session: ChatSession,
        inactivity_timeout: std::time::Duration,
    ) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            session,
            timer: InactivityTimer::new(inactivity_timeout, timer_tx),
            api,
            responses_tx,
            responses_rx,
            timer_rx,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    pub fn open(&mut self) -> Result<()> {
        let effects = self.session.open()?;
        self.run(effects);
        Ok(())
    }

    pub fn submit(&mut self, input: &str) -> Result<()> {
        let effects = self.session.submit(input)?;
        self.run(effects);
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        let effects = self.session.close()?;
        self.run(effects);
        Ok(())
    }

    /// Wait for the next response or timer firing and apply it.
    pub async fn next_event(&mut self) -> Result<DriverEvent> {
        tokio::select! {
            Some(response) = self.responses_rx.recv() => {
                let effects = self.session.apply_response(response)?;
                self.run(effects);
                Ok(DriverEvent::ResponseApplied)
            }
            Some(fired) = self.timer_rx.recv() => {
                if !self.timer.accept(fired) {
                    return Ok(DriverEvent::StaleTimer);
                }
                tracing::info!("inactivity timeout");
                let effects = self.session.expire()?;
                self.run(effects);
                Ok(DriverEvent::TimedOut)
            }
            else => Err(SessionError::Closed),
        }
    }

    /// Process events until no request is outstanding.
    pub async fn settle(&mut self) -> Result<()> {
        while self.session.is_busy() {
            self.next_event().await?;
        }
        Ok(())
    }

    fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmTimer => {
                    self.timer.rearm();
                }
                Effect::CancelTimer => self.timer.cancel(),
                Effect::Dispatch(request) => {
                    let api = Arc::clone(&self.api);
                    let tx = self.responses_tx.clone();
                    tokio::spawn(async move {
                        let result = request.call.execute(api.as_ref()).await;
                        if let Err(error) = &result {
                            tracing::warn!(call = request.call.name(), %error, "request failed");
                        }
                        let _ = tx.send(Response {
                            ticket: request.ticket,
                            result,
                        });
                    });
                }
            }
        }
    }
}
