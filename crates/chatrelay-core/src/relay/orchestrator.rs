//! The per-turn relay state machine.
//!
//! One inbound frame drives one pass through
//! validate -> resolve session -> sanitize -> assemble -> stream -> record.
//! Nothing is persisted across turns; every turn starts fresh from the
//! stored session. All failures are delivered to the client through the
//! same channel as normal output, never raised to the transport layer.

use chatrelay_types::chat::ChatMessage;
use chatrelay_types::config::RelayConfig;
use chatrelay_types::error::DeliveryError;
use chatrelay_types::generation::{GenerationError, GenerationRequest};
use chatrelay_types::wire::{ClientAction, ClientEnvelope, ErrorCategory, ServerEnvelope};
use futures_util::StreamExt;
use tracing::{debug, error, info, warn};

use std::sync::Arc;

use crate::connection::ConnectionDirectory;
use crate::delivery::DeliveryChannel;
use crate::generation::GenerationBackend;
use crate::prompt::PromptAssembler;
use crate::sanitize::Sanitizer;
use crate::session::SessionStore;

use super::TurnGate;

/// Sender attributed to generated completions.
const ASSISTANT_SENDER: &str = "Assistant";

/// Literal in-text directive that clears history, checked before
/// sanitization (the directive need not pass content validation).
const CLEAR_DIRECTIVE: &str = "/clear";

const CLEARED_NOTICE: &str = "Conversation history cleared.";
const GENERIC_ACK: &str = "Request received.";

/// Drives one inbound turn end to end.
///
/// Generic over its four ports so tests substitute in-memory fakes without
/// touching global state. Cloneable handles only; the service itself sits
/// behind an `Arc` in the transport layer.
pub struct RelayService<S, G, D, C> {
    store: Arc<S>,
    backend: Arc<G>,
    delivery: Arc<D>,
    directory: Arc<C>,
    sanitizer: Sanitizer,
    assembler: PromptAssembler,
    gate: Arc<TurnGate>,
}

impl<S, G, D, C> RelayService<S, G, D, C>
where
    S: SessionStore,
    G: GenerationBackend,
    D: DeliveryChannel,
    C: ConnectionDirectory,
{
    pub fn new(
        config: &RelayConfig,
        store: Arc<S>,
        backend: Arc<G>,
        delivery: Arc<D>,
        directory: Arc<C>,
    ) -> Self {
        Self {
            store,
            backend,
            delivery,
            directory,
            sanitizer: Sanitizer::new(config.sanitizer.clone(), config.parameters.clone()),
            assembler: PromptAssembler::new(config.prompt.clone()),
            gate: Arc::new(TurnGate::new()),
        }
    }

    /// The per-connection turn gate, shared with the transport layer so it
    /// can drop lock entries on disconnect.
    pub fn gate(&self) -> Arc<TurnGate> {
        self.gate.clone()
    }

    /// Entry point for one raw text frame from a connection.
    ///
    /// Never returns an error to the transport: every failure mode is
    /// reported to the client over the delivery channel (or logged and
    /// swallowed when the endpoint is gone).
    pub async fn handle_raw(&self, connection_id: &str, raw: &str) {
        let envelope = ClientEnvelope::parse(raw);
        match envelope.action() {
            ClientAction::Generate => self.handle_generate(connection_id, &envelope).await,
            ClientAction::Clear => self.handle_clear(connection_id).await,
            ClientAction::Other => {
                debug!(connection_id, action = %envelope.action, "unrecognized action");
                self.deliver(connection_id, &ServerEnvelope::system(GENERIC_ACK))
                    .await;
            }
        }
    }

    /// Explicit clear action (and the in-text `/clear` directive).
    async fn handle_clear(&self, connection_id: &str) {
        if let Err(err) = self.store.clear(connection_id).await {
            error!(connection_id, %err, "failed to clear session");
            self.deliver_error(connection_id, ErrorCategory::BackendGeneric, None)
                .await;
            return;
        }
        info!(connection_id, "session history cleared");
        self.deliver(connection_id, &ServerEnvelope::system(CLEARED_NOTICE))
            .await;
    }

    /// The primary generate path, steps validate through record.
    async fn handle_generate(&self, connection_id: &str, envelope: &ClientEnvelope) {
        // Structural validation comes before any acknowledgment or session
        // access: a generate frame without message text is malformed.
        let Some(text) = envelope.message_text() else {
            warn!(connection_id, "generate frame without message text");
            self.deliver_error(connection_id, ErrorCategory::Structural, None)
                .await;
            return;
        };
        let text = text.to_string();

        // Connection metadata is best-effort attribution only.
        let record = self.directory.lookup(connection_id);
        if record.is_none() {
            debug!(connection_id, "no connection record, treating as anonymous");
        }
        let user_id = record.as_ref().and_then(|r| r.user_id.clone());

        self.deliver(connection_id, &ServerEnvelope::processing_ack())
            .await;

        // One turn at a time per connection; a second frame waits here.
        let _turn = self.gate.acquire(connection_id).await;

        if let Err(err) = self.store.create(connection_id, user_id.as_deref()).await {
            error!(connection_id, %err, "failed to create session");
            self.deliver_error(connection_id, ErrorCategory::BackendGeneric, None)
                .await;
            return;
        }

        // The clear directive bypasses sanitization entirely.
        if text.trim().eq_ignore_ascii_case(CLEAR_DIRECTIVE) {
            self.handle_clear(connection_id).await;
            return;
        }

        let sanitized = self.sanitizer.sanitize(&text);
        if !sanitized.valid {
            // Security-relevant: logged distinctly from ordinary errors,
            // with the audit copy of the rejected input.
            warn!(
                connection_id,
                reason = ?sanitized.reason,
                rejected_text = %sanitized.text,
                "input rejected by sanitizer"
            );
            let detail = sanitized
                .reason
                .map(|r| format!("Your message could not be accepted: {r}."));
            self.deliver_error(connection_id, ErrorCategory::InputRejected, detail)
                .await;
            return;
        }

        let history = match self.store.get(connection_id).await {
            Ok(Some(session)) => session.messages,
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(connection_id, %err, "failed to load session history");
                self.deliver_error(connection_id, ErrorCategory::BackendGeneric, None)
                    .await;
                return;
            }
        };

        let user_message = ChatMessage::user(sanitized.text.clone());
        if let Err(err) = self.store.append_message(connection_id, &user_message).await {
            error!(connection_id, %err, "failed to record user turn");
            self.deliver_error(connection_id, ErrorCategory::BackendGeneric, None)
                .await;
            return;
        }

        // Prompt reflects history as stored before this turn; the new turn
        // gets its own framing slot.
        let prompt = self.assembler.assemble(&history, &sanitized.text);
        let parameters = self.sanitizer.sanitize_parameters(envelope.parameters());
        let request = GenerationRequest { prompt, parameters };

        match self.stream_to_client(connection_id, request).await {
            StreamOutcome::Completed(full_text) => {
                let assistant_message = ChatMessage::assistant(full_text.clone());
                if let Err(err) = self
                    .store
                    .append_message(connection_id, &assistant_message)
                    .await
                {
                    error!(connection_id, %err, "failed to record assistant turn");
                }
                self.deliver(
                    connection_id,
                    &ServerEnvelope::completion(full_text, ASSISTANT_SENDER),
                )
                .await;
            }
            StreamOutcome::Failed(err) => {
                let category = classify(&err);
                warn!(
                    connection_id,
                    backend = self.backend.name(),
                    %err,
                    ?category,
                    "generation failed"
                );
                // A failed generation leaves no partial assistant record.
                self.deliver_error(connection_id, category, None).await;
            }
            StreamOutcome::Abandoned => {
                info!(connection_id, "endpoint gone mid-stream, turn abandoned");
            }
        }
    }

    /// Run the streaming call, forwarding each chunk as it arrives.
    ///
    /// Delivery is awaited per chunk before the next is pulled, so the
    /// client's read pace backpressures the backend. Dropping the stream on
    /// abandonment cancels the underlying call.
    async fn stream_to_client(
        &self,
        connection_id: &str,
        request: GenerationRequest,
    ) -> StreamOutcome {
        let mut stream = match self.backend.stream(request).await {
            Ok(stream) => stream,
            Err(err) => return StreamOutcome::Failed(err),
        };

        let mut full_text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    full_text.push_str(&chunk.text);
                    let frame = ServerEnvelope::chunk(chunk.text, chunk.is_complete);
                    match self.delivery.send(connection_id, &frame).await {
                        Ok(()) => {}
                        Err(DeliveryError::EndpointGone) => return StreamOutcome::Abandoned,
                        Err(DeliveryError::Transport(message)) => {
                            warn!(connection_id, %message, "chunk delivery failed");
                            return StreamOutcome::Abandoned;
                        }
                    }
                }
                Err(err) => return StreamOutcome::Failed(err),
            }
        }
        StreamOutcome::Completed(full_text)
    }

    /// Best-effort delivery; a gone endpoint is logged and swallowed.
    async fn deliver(&self, connection_id: &str, envelope: &ServerEnvelope) {
        match self.delivery.send(connection_id, envelope).await {
            Ok(()) => {}
            Err(DeliveryError::EndpointGone) => {
                info!(connection_id, "endpoint gone, delivery dropped");
            }
            Err(DeliveryError::Transport(message)) => {
                warn!(connection_id, %message, "delivery failed");
            }
        }
    }

    async fn deliver_error(
        &self,
        connection_id: &str,
        category: ErrorCategory,
        detail: Option<String>,
    ) {
        let text = detail.unwrap_or_else(|| category.user_message().to_string());
        self.deliver(connection_id, &ServerEnvelope::error(category, text))
            .await;
    }
}

enum StreamOutcome {
    /// Stream drained to completion; carries the concatenated text.
    Completed(String),
    /// Establishment or mid-stream backend failure.
    Failed(GenerationError),
    /// The remote endpoint vanished; nothing left to report to.
    Abandoned,
}

/// Map a backend failure onto the user-facing taxonomy. Classified once
/// here, never re-derived from message text downstream.
fn classify(err: &GenerationError) -> ErrorCategory {
    match err {
        GenerationError::ConnectFailed { .. } | GenerationError::Unavailable(_) => {
            ErrorCategory::BackendConnection
        }
        GenerationError::DeadlineExceeded | GenerationError::Overloaded(_) => {
            ErrorCategory::BackendResource
        }
        GenerationError::Stream(_)
        | GenerationError::Deserialization(_)
        | GenerationError::Backend { .. } => ErrorCategory::BackendGeneric,
    }
}
