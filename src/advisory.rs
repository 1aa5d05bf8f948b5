//! AI tuning advisor: request construction, response parsing and the
//! per-engine advisor session.
//!
//! The completion service itself sits behind [`AdvisoryTransport`]. This
//! module decides what is sent (system instruction, prompt, output mode) and
//! validates what comes back.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::calculator::parse_decimal;
use crate::catalog_model::Engine;

pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_BUILD_PATH_MODEL: &str = "gemini-2.5-flash";

const ANALYSIS_INSTRUCTION: &str = "You are 'Jessey', an expert automotive engineer and engine \
tuner. Your goal is to provide helpful, accurate, and safe tuning advice. You must use the \
provided engine data as the primary source of truth for all specifications. If details are missing \
or null in the provided engine data, you may use Google Search to find relevant general \
information, but clearly state when you are using external sources. Focus on the engine's \
strengths, common weaknesses, and tuning potential based on its materials, bore/stroke ratio, and \
induction type. Format the response in clear, concise paragraphs using markdown for headings and \
bold text.";

const BUILD_PATH_INSTRUCTION: &str = "You are 'Jessey', an expert automotive engineer and engine \
tuner. Your goal is to provide helpful, accurate, and safe tuning advice. You must use the \
provided engine data as the primary source of truth for all specifications. Keep your answers \
concise and focused on the user's question. Use markdown for formatting like lists or bold text \
when it improves clarity.";

const CHAT_INSTRUCTION: &str = "You are 'Jessey', an expert automotive engineer and engine tuner. \
Your goal is to provide helpful, accurate, and safe tuning advice. You MUST use the provided \
engine data as the primary source of truth for all specifications. If specific details are not \
present or are null in the provided engine data, you may use Google Search to find relevant \
general information, but clearly state when you are using external sources. Keep your answers \
concise and focused on the user's question. Use markdown for formatting like lists or bold text \
when it improves clarity.";

const ANALYSIS_FAILED: &str =
    "Sorry, I couldn't generate an analysis at this time. Please try again later.";
const CHAT_FAILED: &str = "Sorry, I'm having trouble connecting. Please try again.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisoryError {
    #[error("AI advisor unavailable: no API key configured")]
    MissingCredentials,
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("json error: {0}")]
    Serde(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("{0} request already in progress")]
    AlreadyInFlight(RequestKind),
    #[error("{0}")]
    InvalidInput(String),
}

impl AdvisoryError {
    /// Returns true if the error is transient and the same request may succeed
    /// later. Missing credentials never recover within a session.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Analysis,
    BuildPath,
    Chat,
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Analysis => write!(f, "analysis"),
            RequestKind::BuildPath => write!(f, "build path"),
            RequestKind::Chat => write!(f, "chat"),
        }
    }
}

/// A web source the service grounded its answer on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdvisoryReply {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
    Error,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// One step of a generated build plan. Exactly these three fields are
/// accepted from the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
    pub component: String,
    pub recommendation: String,
    pub reasoning: String,
}

/// How the service should answer. A response schema and search grounding
/// cannot be combined, so they live in different variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum OutputMode {
    Freeform { search_grounding: bool },
    Structured { schema: Value },
}

/// Everything a transport needs to perform one completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCall {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub mode: OutputMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportReply {
    Text(AdvisoryReply),
    Structured(Value),
}

/// Round-trip to the remote completion service.
pub trait AdvisoryTransport {
    fn request(&self, call: &TransportCall) -> Result<TransportReply, AdvisoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryModels {
    /// Used for analysis and chat.
    pub analysis: String,
    pub build_path: String,
}

impl Default for AdvisoryModels {
    fn default() -> Self {
        Self {
            analysis: DEFAULT_ANALYSIS_MODEL.to_string(),
            build_path: DEFAULT_BUILD_PATH_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdvisoryRequest {
    Analysis {
        engine: Engine,
    },
    BuildPath {
        engine: Engine,
        horsepower_goal: f64,
        budget: f64,
    },
    Chat {
        engine: Engine,
        history: Vec<ChatMessage>,
        message: String,
    },
}

fn engine_json(engine: &Engine) -> Result<String, AdvisoryError> {
    serde_json::to_string_pretty(engine).map_err(|e| AdvisoryError::Serde(e.to_string()))
}

fn format_number(value: f64) -> String {
    value.to_string()
}

/// JSON schema of the build plan: an array of [`BuildStep`] objects.
pub fn build_path_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "component": {
                    "type": "STRING",
                    "description":
                        "The category of the part (e.g., 'Forged Pistons', 'Turbocharger')."
                },
                "recommendation": {
                    "type": "STRING",
                    "description": "A specific recommendation or type of part \
                        (e.g., 'CP Pistons 9.0:1 CR', 'Garrett G30-770')."
                },
                "reasoning": {
                    "type": "STRING",
                    "description": "A brief explanation of why this component is necessary \
                        or recommended for the build."
                }
            },
            "required": ["component", "recommendation", "reasoning"]
        }
    })
}

impl AdvisoryRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            AdvisoryRequest::Analysis { .. } => RequestKind::Analysis,
            AdvisoryRequest::BuildPath { .. } => RequestKind::BuildPath,
            AdvisoryRequest::Chat { .. } => RequestKind::Chat,
        }
    }

    pub fn engine(&self) -> &Engine {
        match self {
            AdvisoryRequest::Analysis { engine }
            | AdvisoryRequest::BuildPath { engine, .. }
            | AdvisoryRequest::Chat { engine, .. } => engine,
        }
    }

    pub fn to_call(&self, models: &AdvisoryModels) -> Result<TransportCall, AdvisoryError> {
        let call = match self {
            AdvisoryRequest::Analysis { engine } => TransportCall {
                model: models.analysis.clone(),
                system_instruction: ANALYSIS_INSTRUCTION.to_string(),
                prompt: format!(
                    "Based on the following technical specifications, provide a detailed analysis \
of this engine's strengths, common weaknesses, and tuning potential. Explain how factors like its \
materials, bore/stroke ratio, and induction type influence its performance characteristics. Format \
the response in clear, concise paragraphs using markdown for headings and bold text.\n\nEngine \
Data:\n{}",
                    engine_json(engine)?
                ),
                mode: OutputMode::Freeform { search_grounding: true },
            },
            AdvisoryRequest::BuildPath {
                engine,
                horsepower_goal,
                budget,
            } => TransportCall {
                model: models.build_path.clone(),
                system_instruction: BUILD_PATH_INSTRUCTION.to_string(),
                prompt: format!(
                    "Given the following engine specifications, generate a prioritized, \
step-by-step build path to help a user achieve their performance goals.\n\n**Engine \
Data:**\n{}\n\n**User Goals:**\n- Horsepower Target: {} HP\n- Approximate Budget: ${}\n\nPlease \
provide a list of recommended components, starting with the most critical for reliability and \
power at this level. For each component, provide a brief reasoning.",
                    engine_json(engine)?,
                    format_number(*horsepower_goal),
                    format_number(*budget)
                ),
                mode: OutputMode::Structured {
                    schema: build_path_schema(),
                },
            },
            AdvisoryRequest::Chat {
                engine,
                history,
                message,
            } => {
                let transcript: Vec<String> = history
                    .iter()
                    .filter_map(|m| match m.role {
                        ChatRole::User => Some(format!("User: {}", m.text)),
                        ChatRole::Model | ChatRole::System => Some(format!("Advisor: {}", m.text)),
                        ChatRole::Error => None,
                    })
                    .collect();
                let history_block = if transcript.is_empty() {
                    String::new()
                } else {
                    format!("Conversation so far:\n{}\n\n", transcript.join("\n"))
                };

                TransportCall {
                    model: models.analysis.clone(),
                    system_instruction: CHAT_INSTRUCTION.to_string(),
                    prompt: format!(
                        "{}Regarding the {} {} ({}) engine:\n\nEngine \
Specifications:\n{}\n\nUser's question: \"{}\"\n\nPlease provide your expert advice, directly \
referencing the provided engine specifications where applicable.",
                        history_block,
                        engine.make,
                        engine.model,
                        engine.engine_code,
                        engine_json(engine)?,
                        message
                    ),
                    mode: OutputMode::Freeform { search_grounding: true },
                }
            }
        };
        Ok(call)
    }
}

/// Parsed answer for each request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisoryResponse {
    Analysis(AdvisoryReply),
    BuildPath(Vec<BuildStep>),
    Chat(AdvisoryReply),
}

/// Payload of a text reply that should hold JSON. A reply that is already a
/// bare array or object is used as is; otherwise the body of the first fenced
/// block is taken, minus its info string (e.g. `json`).
fn json_payload(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('[') || text.starts_with('{') {
        return text;
    }

    let mut fences = text.splitn(3, "```");
    match (fences.next(), fences.next(), fences.next()) {
        (Some(_), Some(block), Some(_)) => match block.split_once('\n') {
            Some((info, body)) if !info.trim_start().starts_with(['[', '{']) => body.trim(),
            _ => block.trim(),
        },
        _ => text,
    }
}

/// Validates a build plan against the [`BuildStep`] shape.
pub fn parse_build_path(reply: TransportReply) -> Result<Vec<BuildStep>, AdvisoryError> {
    let value = match reply {
        TransportReply::Structured(value) => value,
        TransportReply::Text(reply) => {
            let json_str = json_payload(&reply.text);
            if json_str.is_empty() {
                return Err(AdvisoryError::MalformedResponse(
                    "empty build path response".to_string(),
                ));
            }
            serde_json::from_str(json_str).map_err(|e| {
                warn!("Build path response is not JSON: {e}");
                AdvisoryError::MalformedResponse(format!("not JSON: {e}"))
            })?
        }
    };

    serde_json::from_value(value).map_err(|e| {
        warn!("Build path response has the wrong shape: {e}");
        AdvisoryError::MalformedResponse(format!(
            "expected a list of {{component, recommendation, reasoning}}: {e}"
        ))
    })
}

fn parse_freeform(reply: TransportReply) -> Result<AdvisoryReply, AdvisoryError> {
    match reply {
        TransportReply::Text(reply) if reply.text.trim().is_empty() => {
            Err(AdvisoryError::MalformedResponse("empty response".to_string()))
        }
        TransportReply::Text(reply) => Ok(reply),
        TransportReply::Structured(_) => Err(AdvisoryError::MalformedResponse(
            "structured payload returned for a freeform request".to_string(),
        )),
    }
}

/// The service boundary. Without a transport (no credentials) every request
/// fails with [`AdvisoryError::MissingCredentials`].
pub struct AdvisoryGateway {
    transport: Option<Box<dyn AdvisoryTransport>>,
    models: AdvisoryModels,
}

impl AdvisoryGateway {
    pub fn new(transport: Box<dyn AdvisoryTransport>, models: AdvisoryModels) -> Self {
        Self {
            transport: Some(transport),
            models,
        }
    }

    pub fn unavailable() -> Self {
        Self::configured(AdvisoryModels::default())
    }

    /// A gateway that already knows its models but has no transport yet.
    /// Requests fail with [`AdvisoryError::MissingCredentials`] until
    /// [`AdvisoryGateway::connect`] installs one.
    pub fn configured(models: AdvisoryModels) -> Self {
        Self {
            transport: None,
            models,
        }
    }

    /// Installs (or replaces) the transport, keeping the configured models.
    pub fn connect(&mut self, transport: Box<dyn AdvisoryTransport>) {
        self.transport = Some(transport);
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    pub fn models(&self) -> &AdvisoryModels {
        &self.models
    }

    pub fn ensure_available(&self) -> Result<(), AdvisoryError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AdvisoryError::MissingCredentials)
        }
    }

    /// Performs one round-trip and parses the answer for the request kind.
    pub fn send(&self, request: &AdvisoryRequest) -> Result<AdvisoryResponse, AdvisoryError> {
        let transport = self.transport.as_ref().ok_or(AdvisoryError::MissingCredentials)?;
        let call = request.to_call(&self.models)?;
        debug!("Sending {} request with model {}", request.kind(), call.model);

        let reply = transport.request(&call)?;
        match request.kind() {
            RequestKind::Analysis => parse_freeform(reply).map(AdvisoryResponse::Analysis),
            RequestKind::Chat => parse_freeform(reply).map(AdvisoryResponse::Chat),
            RequestKind::BuildPath => parse_build_path(reply).map(AdvisoryResponse::BuildPath),
        }
    }
}

/// What the analysis slot shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnalysisSlot {
    Ready(AdvisoryReply),
    Failed { message: String },
}

/// A request that has been started and awaits its response.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryTicket {
    pub request: AdvisoryRequest,
    generation: u64,
    id: u64,
}

impl AdvisoryTicket {
    pub fn kind(&self) -> RequestKind {
        self.request.kind()
    }
}

/// Advisor state for the currently selected engine.
///
/// Every engine change calls [`AdvisorState::reset`], which wipes results and
/// bumps the generation so late responses for the old engine are ignored.
/// Each started request is accepted exactly once; a repeated delivery of the
/// same ticket is dropped.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorState {
    #[serde(skip)]
    generation: u64,
    #[serde(skip)]
    next_ticket: u64,
    /// Ticket id awaiting completion, per request kind.
    #[serde(skip)]
    pending: HashMap<RequestKind, u64>,
    pub analysis: Option<AnalysisSlot>,
    pub analysis_loading: bool,
    pub chat: Vec<ChatMessage>,
    pub chat_loading: bool,
    pub build_path: Option<Vec<BuildStep>>,
    pub build_path_loading: bool,
    pub build_path_error: Option<String>,
    pub horsepower_goal: String,
    pub budget: String,
}

impl AdvisorState {
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            next_ticket: self.next_ticket,
            ..Self::default()
        };
    }

    pub fn is_loading(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Analysis => self.analysis_loading,
            RequestKind::BuildPath => self.build_path_loading,
            RequestKind::Chat => self.chat_loading,
        }
    }

    fn set_loading(&mut self, kind: RequestKind, loading: bool) {
        match kind {
            RequestKind::Analysis => self.analysis_loading = loading,
            RequestKind::BuildPath => self.build_path_loading = loading,
            RequestKind::Chat => self.chat_loading = loading,
        }
    }

    /// Adds the greeting the first time the conversation is opened for the
    /// current engine. Returns whether a greeting was added.
    pub fn open_conversation(&mut self, engine: &Engine) -> bool {
        if !self.chat.is_empty() {
            return false;
        }
        self.chat.push(ChatMessage::new(
            ChatRole::System,
            format!(
                "Hi! I'm Jessey, your AI Tuning Advisor. Ask me anything about the {} {}. For \
example, \"What are the first mods I should do for more power?\"",
                engine.make, engine.engine_code
            ),
        ));
        true
    }

    pub fn set_goals(&mut self, horsepower_goal: impl Into<String>, budget: impl Into<String>) {
        self.horsepower_goal = horsepower_goal.into();
        self.budget = budget.into();
    }

    fn start(
        &mut self,
        gateway: &AdvisoryGateway,
        request: AdvisoryRequest,
    ) -> Result<AdvisoryTicket, AdvisoryError> {
        gateway.ensure_available()?;
        let kind = request.kind();
        if self.is_loading(kind) {
            return Err(AdvisoryError::AlreadyInFlight(kind));
        }
        self.set_loading(kind, true);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending.insert(kind, self.next_ticket);
        Ok(AdvisoryTicket {
            request,
            generation: self.generation,
            id: self.next_ticket,
        })
    }

    pub fn begin_analysis(
        &mut self,
        gateway: &AdvisoryGateway,
        engine: &Engine,
    ) -> Result<AdvisoryTicket, AdvisoryError> {
        let ticket = self.start(gateway, AdvisoryRequest::Analysis { engine: engine.clone() })?;
        self.analysis = None;
        Ok(ticket)
    }

    /// Starts a build plan from the stored goal inputs. The previous plan
    /// stays visible until a new one arrives.
    pub fn begin_build_path(
        &mut self,
        gateway: &AdvisoryGateway,
        engine: &Engine,
    ) -> Result<AdvisoryTicket, AdvisoryError> {
        let goals = parse_decimal(&self.horsepower_goal)
            .zip(parse_decimal(&self.budget))
            .filter(|(hp, budget)| *hp > 0.0 && *budget > 0.0);
        let Some((horsepower_goal, budget)) = goals else {
            return Err(AdvisoryError::InvalidInput(
                "Please enter both a horsepower goal and a budget.".to_string(),
            ));
        };

        let ticket = self.start(
            gateway,
            AdvisoryRequest::BuildPath {
                engine: engine.clone(),
                horsepower_goal,
                budget,
            },
        )?;
        self.build_path_error = None;
        Ok(ticket)
    }

    /// Appends the user's message and starts the reply.
    pub fn begin_chat(
        &mut self,
        gateway: &AdvisoryGateway,
        engine: &Engine,
        message: &str,
    ) -> Result<AdvisoryTicket, AdvisoryError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AdvisoryError::InvalidInput("Type a question first.".to_string()));
        }

        let ticket = self.start(
            gateway,
            AdvisoryRequest::Chat {
                engine: engine.clone(),
                history: self.chat.clone(),
                message: message.to_string(),
            },
        )?;
        self.chat.push(ChatMessage::new(ChatRole::User, message));
        Ok(ticket)
    }

    /// Stores the outcome of a started request and clears its loading flag.
    ///
    /// Returns the request's error after recording it: analysis and chat
    /// failures become inline messages, a failed build plan keeps the previous
    /// plan. Responses for a previous engine, and a second delivery for the
    /// same ticket, are dropped.
    pub fn complete(
        &mut self,
        ticket: AdvisoryTicket,
        outcome: Result<AdvisoryResponse, AdvisoryError>,
    ) -> Result<(), AdvisoryError> {
        if ticket.generation != self.generation {
            debug!("Dropping {} response for a previously selected engine", ticket.kind());
            return Ok(());
        }

        let kind = ticket.kind();
        if self.pending.get(&kind) != Some(&ticket.id) {
            debug!("Dropping {kind} response for a request that was already completed");
            return Ok(());
        }
        self.pending.remove(&kind);
        self.set_loading(kind, false);

        match (kind, outcome) {
            (RequestKind::Analysis, Ok(AdvisoryResponse::Analysis(reply))) => {
                self.analysis = Some(AnalysisSlot::Ready(reply));
                Ok(())
            }
            (RequestKind::BuildPath, Ok(AdvisoryResponse::BuildPath(steps))) => {
                self.build_path = Some(steps);
                self.build_path_error = None;
                Ok(())
            }
            (RequestKind::Chat, Ok(AdvisoryResponse::Chat(reply))) => {
                self.chat.push(ChatMessage {
                    role: ChatRole::Model,
                    text: reply.text,
                    citations: reply.citations,
                });
                Ok(())
            }
            (kind, Ok(other)) => {
                let err = AdvisoryError::MalformedResponse(format!(
                    "unexpected response to a {kind} request: {other:?}"
                ));
                self.record_failure(kind, &err);
                Err(err)
            }
            (kind, Err(err)) => {
                self.record_failure(kind, &err);
                Err(err)
            }
        }
    }

    fn record_failure(&mut self, kind: RequestKind, err: &AdvisoryError) {
        warn!("AI {kind} failed: {err}");
        match kind {
            RequestKind::Analysis => {
                self.analysis = Some(AnalysisSlot::Failed {
                    message: ANALYSIS_FAILED.to_string(),
                })
            }
            RequestKind::Chat => self.chat.push(ChatMessage::new(ChatRole::Error, CHAT_FAILED)),
            RequestKind::BuildPath => self.build_path_error = Some(err.to_string()),
        }
    }

    /// Runs a started request through the gateway synchronously.
    pub fn run(
        &mut self,
        gateway: &AdvisoryGateway,
        ticket: AdvisoryTicket,
    ) -> Result<(), AdvisoryError> {
        let outcome = gateway.send(&ticket.request);
        self.complete(ticket, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_payload_bare_reply() {
        let input = "  [{\"component\": \"a\"}]\n";
        assert_eq!(json_payload(input), r#"[{"component": "a"}]"#);
    }

    #[test]
    fn test_json_payload_fenced_block() {
        assert_eq!(json_payload("Here's the plan:\n```json\n[]\n```\nGood luck."), "[]");
        assert_eq!(json_payload("```\n{}\n```"), "{}");
        assert_eq!(json_payload("```[1, 2]```"), "[1, 2]");
    }

    #[test]
    fn test_json_payload_without_fence_is_unchanged() {
        assert_eq!(json_payload("no plan today"), "no plan today");
        let unclosed = "```json\n[] and no closing fence";
        assert_eq!(json_payload(unclosed), unclosed);
    }

    #[test]
    fn test_parse_build_path_rejects_extra_fields() {
        let reply = TransportReply::Structured(json!([
            {"component": "Turbo", "recommendation": "G25-550", "reasoning": "Spool", "price": 1800}
        ]));
        assert!(matches!(parse_build_path(reply), Err(AdvisoryError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_build_path_rejects_missing_fields() {
        let reply = TransportReply::Structured(json!([
            {"component": "Turbo", "recommendation": "G25-550"}
        ]));
        assert!(matches!(parse_build_path(reply), Err(AdvisoryError::MalformedResponse(_))));

        let reply = TransportReply::Structured(json!({"component": "Turbo"}));
        assert!(matches!(parse_build_path(reply), Err(AdvisoryError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_build_path_from_fenced_text() {
        let reply = TransportReply::Text(AdvisoryReply {
            text: "```json\n[{\"component\":\"Pistons\",\"recommendation\":\"Forged 9.0:1\",\
                   \"reasoning\":\"Boost\"}]\n```"
                .to_string(),
            citations: Vec::new(),
        });
        let steps = parse_build_path(reply).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].component, "Pistons");
    }

    #[test]
    fn test_should_retry_classification() {
        assert!(AdvisoryError::Timeout.should_retry());
        assert!(AdvisoryError::Http { status: 503, body: String::new() }.should_retry());
        assert!(!AdvisoryError::Http { status: 400, body: String::new() }.should_retry());
        assert!(!AdvisoryError::MissingCredentials.should_retry());
        assert!(!AdvisoryError::MalformedResponse("x".into()).should_retry());
    }

    #[test]
    fn test_output_modes_per_request_kind() {
        let engine = Engine {
            make: "Honda".into(),
            model: "Civic".into(),
            engine_code: "K20A".into(),
            ..Engine::default()
        };
        let models = AdvisoryModels::default();

        let analysis = AdvisoryRequest::Analysis {
            engine: engine.clone(),
        }
        .to_call(&models)
        .unwrap();
        assert_eq!(analysis.mode, OutputMode::Freeform { search_grounding: true });
        assert_eq!(analysis.model, DEFAULT_ANALYSIS_MODEL);

        let plan = AdvisoryRequest::BuildPath {
            engine,
            horsepower_goal: 300.0,
            budget: 5000.0,
        }
        .to_call(&models)
        .unwrap();
        assert!(matches!(plan.mode, OutputMode::Structured { .. }));
        assert_eq!(plan.model, DEFAULT_BUILD_PATH_MODEL);
        assert!(plan.prompt.contains("Horsepower Target: 300 HP"));
        assert!(plan.prompt.contains("Approximate Budget: $5000"));
    }
}
