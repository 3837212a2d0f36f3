//! Presentation Views
//!
//! Surface-neutral views over a [`TraversalState`]. A surface (the CLI, a
//! web page) renders these; none of them mutate the traversal except
//! [`SinglePageForm`], which owns its own state machine.
//!
//! - [`StepView`]: the input area of one wizard or chat step
//! - [`ChatTranscript`]: the bot/user message log of chat mode
//! - [`SinglePageForm`]: every field at once, validated on submit
//! - [`HelpChat`]: the help widget beside the form, when enabled

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::augment::EffectiveFieldList;
use crate::field::{Field, FieldType, FormCustomization};
use crate::ids::IdGenerator;
use crate::traversal::{truncate_chars, Answers, FillMode, Phase, Transition, TraversalState};
use crate::validation::{validate_all, ValidationError};

/// Title of the completion screen
pub const COMPLETED_TITLE: &str = "Respostas Enviadas!";

/// Body of the completion screen
pub const COMPLETED_MESSAGE: &str = "Obrigado por preencher o formulário.";

/// Bot message closing the conversation before delivery
pub const CLOSING_MESSAGE: &str = "Perfeito! Recebemos todas as suas respostas. Enviando... ✨";

/// Bot message opening the conversation
#[must_use]
pub fn welcome_message(title: &str) -> String {
    format!("Olá! Vou te ajudar a preencher o formulário \"{title}\". Vamos começar? 👋")
}

/// Question text for a field; required fields get a trailing `" *"`
#[must_use]
pub fn question_text(field: &Field) -> String {
    if field.required {
        format!("{} *", field.label)
    } else {
        field.label.clone()
    }
}

/// How a field takes input
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum InputKind {
    /// One line of text
    SingleLine,
    /// Free text over several lines
    MultiLine,
    /// An email address
    Email,
    /// Pick one of the options
    Choice(Vec<String>),
}

impl InputKind {
    /// Input kind for a field
    #[must_use]
    pub fn for_field(field: &Field) -> Self {
        match field.field_type {
            FieldType::Text => Self::SingleLine,
            FieldType::Textarea => Self::MultiLine,
            FieldType::Email => Self::Email,
            FieldType::Choice => Self::Choice(field.options.clone()),
        }
    }
}

/// What the input area shows for the active field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    /// Field being asked
    pub field_id: String,
    /// Question text (with `" *"` when required)
    pub question: String,
    /// Placeholder hint
    pub placeholder: Option<String>,
    /// How to take the answer
    pub input: InputKind,
    /// Zero-based index in the effective list
    pub index: usize,
    /// Number of fields in the effective list
    pub total: usize,
    /// Completed fraction in `[0, 1]`
    pub progress: f64,
    /// Current draft
    pub draft: String,
    /// Inline error message
    pub error: Option<String>,
    /// `used/max` for text fields with a length bound
    pub char_counter: Option<String>,
    /// Whether a back control should be offered
    pub can_retreat: bool,
}

impl StepView {
    /// View of the active step, or `None` outside `Active`
    #[must_use]
    pub fn from_state(state: &TraversalState) -> Option<Self> {
        let Phase::Active(index) = state.phase() else {
            return None;
        };
        let field = state.current_field()?;

        let char_counter = field
            .max_length
            .filter(|_| field.field_type.supports_max_length())
            .map(|max| format!("{}/{max}", state.draft().chars().count()));

        Some(Self {
            field_id: field.id.clone(),
            question: question_text(field),
            placeholder: field.placeholder.clone().filter(|p| !p.is_empty()),
            input: InputKind::for_field(field),
            index,
            total: state.fields().len(),
            progress: state.progress(),
            draft: state.draft().to_string(),
            error: state.current_error().map(|e| e.to_string()),
            char_counter,
            can_retreat: state.mode().allows_retreat() && index > 0,
        })
    }

    /// `"Pergunta i de N"` header
    #[must_use]
    pub fn header(&self) -> String {
        format!("Pergunta {} de {}", self.index + 1, self.total)
    }
}

/// Who wrote a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The form asking
    Bot,
    /// The respondent answering
    User,
}

/// One bubble of the chat log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id
    pub id: String,
    /// Author
    pub sender: Sender,
    /// Text
    pub content: String,
    /// When it was added
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(ids: &dyn IdGenerator, sender: Sender, content: String) -> Self {
        Self {
            id: ids.next_id(),
            sender,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// Chat-mode message log
///
/// Fed with every [`Transition`] the session produces. Rejected answers
/// never enter the log; their message is shown inline instead.
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    ids: Arc<dyn IdGenerator>,
}

impl ChatTranscript {
    /// Start a transcript with the welcome message
    pub fn new(title: &str, ids: Arc<dyn IdGenerator>) -> Self {
        let mut transcript = Self {
            messages: Vec::new(),
            ids,
        };
        transcript.push(Sender::Bot, welcome_message(title));
        transcript
    }

    /// Append the messages a transition produces
    ///
    /// Returns how many messages were added.
    pub fn observe(&mut self, transition: &Transition, state: &TraversalState) -> usize {
        let before = self.messages.len();
        match transition {
            Transition::Started { phase } => self.ask(*phase, state.fields()),
            Transition::Advanced { value, next, .. } => {
                self.push(Sender::User, value.clone());
                self.ask(*next, state.fields());
            }
            Transition::Retreated { to } => self.ask(Phase::Active(*to), state.fields()),
            Transition::DraftRecorded
            | Transition::Rejected { .. }
            | Transition::Submitted
            | Transition::Ignored(_) => {}
        }
        self.messages.len() - before
    }

    /// Messages in order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Most recent message
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    fn ask(&mut self, phase: Phase, fields: &EffectiveFieldList) {
        match phase {
            Phase::Active(index) => {
                if let Some(field) = fields.get(index) {
                    self.push(Sender::Bot, question_text(field));
                }
            }
            Phase::AllAnswered => self.push(Sender::Bot, CLOSING_MESSAGE.to_string()),
            Phase::NotStarted | Phase::Submitted => {}
        }
    }

    fn push(&mut self, sender: Sender, content: String) {
        self.messages
            .push(ChatMessage::new(self.ids.as_ref(), sender, content));
    }
}

/// Opening line of the help chat
#[must_use]
pub fn help_welcome(title: &str) -> String {
    format!("Olá! Estou aqui para ajudar com o formulário \"{title}\". Como posso ajudar?")
}

/// Canned reply to a help question, chosen by keyword
#[must_use]
pub fn help_reply(question: &str) -> &'static str {
    let question = question.to_lowercase();
    if question.contains("ajuda") || question.contains("help") {
        "Estou aqui para ajudar! Você pode me perguntar sobre qualquer campo do formulário ou como preenchê-lo."
    } else if question.contains("email") {
        "Para o campo de email, digite um endereço válido no formato: seuemail@exemplo.com"
    } else if question.contains("obrigator") {
        "Os campos marcados com * são obrigatórios e devem ser preenchidos para enviar o formulário."
    } else {
        "Entendo sua dúvida. Preencha os campos solicitados e clique em \"Enviar Respostas\" quando terminar."
    }
}

/// Help widget shown next to a form
///
/// Independent of the traversal: questions here never touch the answers.
pub struct HelpChat {
    messages: Vec<ChatMessage>,
    ids: Arc<dyn IdGenerator>,
}

impl HelpChat {
    /// Open the help chat, or `None` when the form has it switched off
    pub fn new(
        title: &str,
        customization: &FormCustomization,
        ids: Arc<dyn IdGenerator>,
    ) -> Option<Self> {
        if !customization.chat_enabled {
            return None;
        }
        let welcome = ChatMessage::new(ids.as_ref(), Sender::Bot, help_welcome(title));
        Some(Self {
            messages: vec![welcome],
            ids,
        })
    }

    /// Post a question and get the bot's reply
    ///
    /// Blank questions are dropped and return `None`.
    pub fn ask(&mut self, question: &str) -> Option<&ChatMessage> {
        if question.trim().is_empty() {
            return None;
        }
        let reply = help_reply(question);
        self.messages
            .push(ChatMessage::new(self.ids.as_ref(), Sender::User, question.to_string()));
        self.messages
            .push(ChatMessage::new(self.ids.as_ref(), Sender::Bot, reply.to_string()));
        self.messages.last()
    }

    /// Messages in order, starting with the welcome
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// Every field on one page, validated together on submit
///
/// Values are held per field until [`SinglePageForm::submit`]. A successful
/// submit replays them through the state machine, so the result is an
/// ordinary `AllAnswered` traversal ready for delivery.
#[derive(Clone, Debug)]
pub struct SinglePageForm {
    state: TraversalState,
    values: BTreeMap<String, String>,
    errors: BTreeMap<String, ValidationError>,
}

impl SinglePageForm {
    /// Form over the author's fields (augmented like any other mode)
    #[must_use]
    pub fn new(author_fields: &[Field]) -> Self {
        Self::from_state(TraversalState::new(author_fields, FillMode::SinglePage))
    }

    fn from_state(state: TraversalState) -> Self {
        Self {
            state,
            values: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Fields to render, in order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        self.state.fields().as_slice()
    }

    /// Set a field's value, capped at its length bound
    ///
    /// Clears that field's error. Returns `false` for an unknown field id.
    pub fn set_value(&mut self, field_id: &str, value: impl Into<String>) -> bool {
        let Some(field) = self.state.fields().iter().find(|f| f.id == field_id) else {
            return false;
        };

        let mut value = value.into();
        if let Some(max) = field.max_length.filter(|_| field.field_type.supports_max_length()) {
            truncate_chars(&mut value, max);
        }

        self.errors.remove(field_id);
        self.values.insert(field_id.to_string(), value);
        true
    }

    /// Current value of a field
    #[must_use]
    pub fn value(&self, field_id: &str) -> &str {
        self.values.get(field_id).map_or("", String::as_str)
    }

    /// Error shown under a field
    #[must_use]
    pub fn error(&self, field_id: &str) -> Option<ValidationError> {
        self.errors.get(field_id).copied()
    }

    /// Every error from the last submit
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, ValidationError> {
        &self.errors
    }

    /// Validate everything and, if clean, run the values through the
    /// state machine
    ///
    /// On failure every failing field gets its error and nothing else
    /// changes. On success the answers are ready for delivery.
    pub fn submit(&mut self) -> Result<&Answers, &BTreeMap<String, ValidationError>> {
        self.errors = validate_all(self.fields(), &self.values);
        if !self.errors.is_empty() {
            tracing::debug!(errors = self.errors.len(), "Single-page submit rejected");
            return Err(&self.errors);
        }

        let mut state =
            TraversalState::from_effective(self.state.fields().clone(), FillMode::SinglePage);
        state.start();
        for field in self.state.fields() {
            let value = self.values.get(&field.id).map_or("", String::as_str);
            if let Transition::Rejected { field_id, error } = state.submit_current(Some(value)) {
                self.errors.insert(field_id, error);
            }
        }
        if !self.errors.is_empty() {
            return Err(&self.errors);
        }

        self.state = state;
        match self.state.pending_answers() {
            Some(answers) => Ok(answers),
            None => Err(&self.errors),
        }
    }

    /// Underlying state machine
    #[must_use]
    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    /// Hand the state machine over for delivery
    #[must_use]
    pub fn into_state(self) -> TraversalState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::field::{REQUIRED_EMAIL_ID, REQUIRED_PHONE_ID};
    use crate::ids::SequentialIds;

    fn transcript(title: &str) -> ChatTranscript {
        ChatTranscript::new(title, Arc::new(SequentialIds::new("msg")))
    }

    fn contents(t: &ChatTranscript) -> Vec<&str> {
        t.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_question_text_marks_required() {
        let optional = Field::new("a", FieldType::Text, "Apelido");
        assert_eq!(question_text(&optional), "Apelido");
        assert_eq!(question_text(&optional.required()), "Apelido *");
    }

    #[test]
    fn test_transcript_follows_conversation() {
        let mut state = TraversalState::new(
            &[Field::new("f1", FieldType::Text, "Nome").required()],
            FillMode::Chat,
        );
        let mut chat = transcript("Cadastro");

        let t = state.start();
        chat.observe(&t, &state);
        let t = state.submit_current(Some("123"));
        assert_eq!(chat.observe(&t, &state), 0);
        let t = state.submit_current(Some("(11) 91234-5678"));
        chat.observe(&t, &state);
        let t = state.submit_current(Some("ana@example.com"));
        chat.observe(&t, &state);
        let t = state.submit_current(Some("Ana"));
        chat.observe(&t, &state);

        assert_eq!(
            contents(&chat),
            vec![
                "Olá! Vou te ajudar a preencher o formulário \"Cadastro\". Vamos começar? 👋",
                "Qual é o seu telefone? *",
                "(11) 91234-5678",
                "Qual é o seu email? *",
                "ana@example.com",
                "Nome *",
                "Ana",
                CLOSING_MESSAGE,
            ]
        );
        let senders: Vec<Sender> = chat.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders[1], Sender::Bot);
        assert_eq!(senders[2], Sender::User);
        assert_eq!(chat.messages()[0].id, "msg_1");
        assert_eq!(chat.last().map(|m| m.id.as_str()), Some("msg_8"));
    }

    #[test]
    fn test_step_view_counter_and_error() {
        let fields = [
            Field::new("mail", FieldType::Email, "Email"),
            Field::new("tel", FieldType::Text, "Telefone"),
            Field::new("bio", FieldType::Textarea, "Bio").with_max_length(10),
        ];
        let mut state = TraversalState::new(&fields, FillMode::Wizard);
        state.start();

        let first = StepView::from_state(&state).unwrap();
        assert_eq!(first.header(), "Pergunta 1 de 3");
        assert!(!first.can_retreat);
        assert_eq!(first.input, InputKind::Email);
        assert_eq!(first.char_counter, None);

        state.submit_current(Some("a@b.co"));
        state.submit_current(Some("11999998888"));
        state.record_draft("olá");
        let bio = StepView::from_state(&state).unwrap();
        assert_eq!(bio.char_counter.as_deref(), Some("3/10"));
        assert!(bio.can_retreat);
        assert_eq!(bio.input, InputKind::MultiLine);

        state.retreat();
        state.record_draft("abc");
        state.submit_current(None);
        let tel = StepView::from_state(&state).unwrap();
        assert_eq!(tel.error.as_deref(), Some("Telefone inválido"));
    }

    #[test]
    fn test_step_view_outside_active() {
        let state = TraversalState::new(&[], FillMode::Chat);
        assert!(StepView::from_state(&state).is_none());
    }

    #[test]
    fn test_chat_mode_never_offers_retreat() {
        let mut state = TraversalState::new(&[], FillMode::Chat);
        state.start();
        state.submit_current(Some("11999998888"));
        let view = StepView::from_state(&state).unwrap();
        assert!(!view.can_retreat);
    }

    #[test]
    fn test_single_page_reports_all_errors() {
        let mut form = SinglePageForm::new(&[Field::new("f1", FieldType::Text, "Nome").required()]);
        assert_eq!(form.fields().len(), 3);

        let errors = form.submit().unwrap_err().clone();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[REQUIRED_PHONE_ID], ValidationError::RequiredFieldEmpty);

        assert!(form.set_value(REQUIRED_PHONE_ID, "(11) 91234-5678"));
        assert_eq!(form.error(REQUIRED_PHONE_ID), None);
        assert_eq!(form.errors().len(), 2);
        assert!(!form.set_value("nope", "x"));
    }

    #[test]
    fn test_single_page_cap_skips_email_fields() {
        let mut form = SinglePageForm::new(&[
            Field::new("mail", FieldType::Email, "Email").with_max_length(5),
        ]);
        assert!(form.set_value("mail", "ana@example.com"));
        assert_eq!(form.value("mail"), "ana@example.com");
    }

    #[test]
    fn test_help_reply_keywords() {
        assert!(help_reply("Preciso de AJUDA").starts_with("Estou aqui para ajudar!"));
        assert!(help_reply("qual email?").contains("seuemail@exemplo.com"));
        assert!(help_reply("o que é obrigatório?").contains("marcados com *"));
        assert!(help_reply("oi").starts_with("Entendo sua dúvida."));
    }

    #[test]
    fn test_help_chat_conversation() {
        let mut help = HelpChat::new(
            "Cadastro",
            &FormCustomization::default(),
            Arc::new(SequentialIds::new("help")),
        )
        .unwrap();
        assert_eq!(
            help.messages()[0].content,
            "Olá! Estou aqui para ajudar com o formulário \"Cadastro\". Como posso ajudar?"
        );

        assert!(help.ask("   ").is_none());
        let reply = help.ask("como preencho o email?").unwrap().clone();
        assert_eq!(reply.sender, Sender::Bot);
        assert!(reply.content.contains("seuemail@exemplo.com"));

        let senders: Vec<Sender> = help.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Bot, Sender::User, Sender::Bot]);
        assert_eq!(help.messages()[2].id, "help_3");
    }

    #[test]
    fn test_help_chat_disabled() {
        let customization = FormCustomization {
            chat_enabled: false,
            ..FormCustomization::default()
        };
        assert!(HelpChat::new("Cadastro", &customization, Arc::new(SequentialIds::new("h"))).is_none());
    }

    #[test]
    fn test_single_page_submit_reaches_all_answered() {
        let mut form = SinglePageForm::new(&[
            Field::new("f1", FieldType::Text, "Nome").required(),
            Field::new("f2", FieldType::Textarea, "Obs").with_max_length(3),
        ]);
        form.set_value(REQUIRED_PHONE_ID, "11 98888-7777");
        form.set_value(REQUIRED_EMAIL_ID, "ana@example.com");
        form.set_value("f1", "Ana");
        form.set_value("f2", "abcdef");
        assert_eq!(form.value("f2"), "abc");

        let answers = form.submit().unwrap().clone();
        assert_eq!(answers.len(), 4);
        assert_eq!(answers["f2"], "abc");
        assert_eq!(form.state().phase(), Phase::AllAnswered);
        assert_eq!(form.into_state().answers(), &answers);
    }
}
