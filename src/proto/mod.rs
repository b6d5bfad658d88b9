//! Wire messages for the `Sessions/DetectIntent` procedure.
//!
//! Only the fields this client reads or writes are declared; unknown fields in a
//! reply are skipped by the protobuf decoder. Tags follow the `session.proto`
//! service definition.

/// Request for `DetectIntent`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DetectIntentRequest {
    /// `projects/<project>/agent/sessions/<session>`
    #[prost(string, tag = "1")]
    pub session: String,
    #[prost(message, optional, tag = "3")]
    pub query_input: Option<QueryInput>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryInput {
    #[prost(message, optional, tag = "2")]
    pub text: Option<TextInput>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TextInput {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(string, tag = "2")]
    pub language_code: String,
}

/// Reply to `DetectIntent`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DetectIntentResponse {
    #[prost(string, tag = "1")]
    pub response_id: String,
    #[prost(message, optional, tag = "2")]
    pub query_result: Option<QueryResult>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryResult {
    #[prost(string, tag = "1")]
    pub query_text: String,
    #[prost(string, tag = "3")]
    pub action: String,
    #[prost(string, tag = "6")]
    pub fulfillment_text: String,
    #[prost(message, optional, tag = "11")]
    pub intent: Option<Intent>,
    #[prost(float, tag = "12")]
    pub intent_detection_confidence: f32,
    #[prost(string, tag = "15")]
    pub language_code: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Intent {
    /// `projects/<project>/agent/intents/<intent id>`
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub display_name: String,
}
