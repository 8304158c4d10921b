//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent generation-call instrumentation across the codebase.
//!
//! Span naming convention: `"{operation} {backend}"` (e.g.,
//! `"generate_stream http-generation"`).

// --- Required attributes ---

/// The name of the operation being performed (e.g., "generate").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider serving the request.
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

// --- Operation name values ---

/// Unary full-text generation.
pub const OP_GENERATE: &str = "generate";

/// Incremental streaming generation.
pub const OP_GENERATE_STREAM: &str = "generate_stream";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names_follow_gen_ai_namespace() {
        for name in [
            GEN_AI_OPERATION_NAME,
            GEN_AI_PROVIDER_NAME,
            GEN_AI_REQUEST_TEMPERATURE,
            GEN_AI_REQUEST_MAX_TOKENS,
        ] {
            assert!(name.starts_with("gen_ai."));
        }
    }
}
