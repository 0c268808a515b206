//! Three-step wizard: description → form entry → result.
//!
//! [`WizardState`] is plain data with explicit transition functions. A
//! forward transition is split into [`WizardState::begin`], which marks the
//! state busy and hands out a [`Ticket`], and a `settle_*` call that applies
//! the outcome. While a ticket is outstanding further `begin` calls are
//! inert. A ticket issued before [`WizardState::reset`] no longer matches and
//! its result is dropped.
//!
//! [`WizardSession`] owns one state together with the completion client and
//! credential store and runs whole transitions.

use std::sync::Arc;

use serde::Serialize;

use crate::clients::CompletionClient;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Result, WizardError};
use crate::generators;
use crate::schemas::{FieldSchema, FormData};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Step {
    #[default]
    Description,
    FormEntry,
    Result,
}

impl Step {
    /// 1-based position shown to users
    pub fn number(self) -> u8 {
        match self {
            Step::Description => 1,
            Step::FormEntry => 2,
            Step::Result => 3,
        }
    }

    fn next(self) -> Option<Step> {
        match self {
            Step::Description => Some(Step::FormEntry),
            Step::FormEntry => Some(Step::Result),
            Step::Result => None,
        }
    }
}

/// Handle for one outstanding generator call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    from: Step,
}

/// Outcome of a forward-transition trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advanced(Step),
    /// Still on `step`; `message` is also stored as the state's error message.
    Failed { step: Step, message: String },
    /// Busy, or not in the step the trigger belongs to.
    Inert,
    /// Settled after a reset; the result was discarded.
    Stale,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WizardState {
    step: Step,
    document_prompt: String,
    field_schema: Option<FieldSchema>,
    form_data: FormData,
    document_markup: Option<String>,
    error_message: Option<String>,
    #[serde(skip)]
    in_flight: Option<Ticket>,
    #[serde(skip)]
    issued: u64,
}

// ticket bookkeeping is not part of the observable state
impl PartialEq for WizardState {
    fn eq(&self, other: &Self) -> bool {
        self.step == other.step
            && self.document_prompt == other.document_prompt
            && self.field_schema == other.field_schema
            && self.form_data == other.form_data
            && self.document_markup == other.document_markup
            && self.error_message == other.error_message
            && self.in_flight.is_some() == other.in_flight.is_some()
    }
}

impl Eq for WizardState {}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn document_prompt(&self) -> &str {
        &self.document_prompt
    }

    pub fn field_schema(&self) -> Option<&FieldSchema> {
        self.field_schema.as_ref()
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    /// Current value of a field, empty when untouched
    pub fn field_value(&self, name: &str) -> &str {
        self.form_data.get(name).unwrap_or("")
    }

    pub fn document_markup(&self) -> Option<&str> {
        self.document_markup.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Edit the description. Only applies in the description step.
    pub fn set_document_prompt(&mut self, text: impl Into<String>) -> bool {
        if self.step != Step::Description {
            return false;
        }
        self.document_prompt = text.into();
        true
    }

    /// Record a form value. Only applies in the form-entry step.
    pub fn set_field_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        if self.step != Step::FormEntry {
            return false;
        }
        self.form_data.set(name, value);
        true
    }

    /// Start the forward transition out of `from`.
    ///
    /// Returns `None` (inert) while busy, when `from` is not the active
    /// step, or when `from` has no successor.
    pub fn begin(&mut self, from: Step) -> Option<Ticket> {
        if self.in_flight.is_some() || self.step != from {
            return None;
        }
        from.next()?;
        self.issued += 1;
        let ticket = Ticket {
            id: self.issued,
            from,
        };
        self.in_flight = Some(ticket);
        self.error_message = None;
        tracing::debug!(step = from.number(), "transition started");
        Some(ticket)
    }

    pub fn settle_fields(&mut self, ticket: Ticket, result: Result<FieldSchema>) -> Transition {
        if !self.accept(ticket, Step::Description) {
            return Transition::Stale;
        }
        match result {
            Ok(schema) => {
                self.field_schema = Some(schema);
                self.error_message = None;
                self.advance()
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn settle_document(&mut self, ticket: Ticket, result: Result<String>) -> Transition {
        if !self.accept(ticket, Step::FormEntry) {
            return Transition::Stale;
        }
        match result {
            Ok(markup) => {
                self.document_markup = Some(markup);
                self.error_message = None;
                self.advance()
            }
            Err(err) => self.fail(err),
        }
    }

    /// Back to an empty description step. Any outstanding ticket goes stale.
    pub fn reset(&mut self) {
        let issued = self.issued;
        *self = Self {
            issued,
            ..Self::default()
        };
        tracing::info!("wizard reset");
    }

    /// Clears busy for the matching ticket, before any outcome is applied.
    fn accept(&mut self, ticket: Ticket, expected: Step) -> bool {
        if self.in_flight != Some(ticket) || ticket.from != expected || self.step != expected {
            tracing::debug!(step = ticket.from.number(), "discarding stale result");
            return false;
        }
        self.in_flight = None;
        true
    }

    fn advance(&mut self) -> Transition {
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        tracing::info!(step = self.step.number(), "wizard advanced");
        Transition::Advanced(self.step)
    }

    fn fail(&mut self, err: WizardError) -> Transition {
        let message = err.to_string();
        tracing::info!(step = self.step.number(), error = %message, "transition failed");
        self.error_message = Some(message.clone());
        Transition::Failed {
            step: self.step,
            message,
        }
    }
}

/// One user's wizard: the state plus its collaborators
pub struct WizardSession {
    state: WizardState,
    client: Arc<dyn CompletionClient>,
    store: Arc<dyn CredentialStore>,
    credential: Option<Credential>,
}

impl WizardSession {
    /// Loads the persisted credential once; an unreadable store counts as absent.
    pub fn new(client: Arc<dyn CompletionClient>, store: Arc<dyn CredentialStore>) -> Self {
        let credential = match store.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!("could not load saved credential: {}", e);
                None
            }
        };
        Self {
            state: WizardState::new(),
            client,
            store,
            credential,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn save_credential(&mut self, token: &str) -> Result<()> {
        let credential = Credential::new(token).ok_or_else(|| WizardError::empty_input("API key"))?;
        self.store.save(&credential)?;
        self.credential = Some(credential);
        Ok(())
    }

    pub fn clear_credential(&mut self) -> Result<()> {
        self.store.clear()?;
        self.credential = None;
        Ok(())
    }

    pub fn set_document_prompt(&mut self, text: impl Into<String>) -> bool {
        self.state.set_document_prompt(text)
    }

    pub fn set_field_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        self.state.set_field_value(name, value)
    }

    /// Step 1 → 2: generate the field schema for the current description.
    pub async fn submit_description(&mut self) -> Transition {
        let Some(ticket) = self.state.begin(Step::Description) else {
            return Transition::Inert;
        };
        let result = generators::generate_fields(
            self.client.as_ref(),
            self.credential.as_ref(),
            self.state.document_prompt(),
        )
        .await;
        self.state.settle_fields(ticket, result)
    }

    /// Step 2 → 3: generate the document from the description and form values.
    pub async fn submit_form(&mut self) -> Transition {
        let Some(ticket) = self.state.begin(Step::FormEntry) else {
            return Transition::Inert;
        };
        let result = generators::generate_document(
            self.client.as_ref(),
            self.credential.as_ref(),
            self.state.document_prompt(),
            self.state.form_data(),
        )
        .await;
        self.state.settle_document(ticket, result)
    }

    /// Clears all wizard data; the saved credential is kept.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
