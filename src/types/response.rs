use crate::error::CallError;
use crate::proto;
use prost::Message;

/// Decoded result of a successful intent-detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectIntentResponse {
    /// Display name of the matched intent; empty when nothing matched.
    pub intent_name: String,
    /// Intent detection confidence in `[0, 1]`.
    pub confidence: f32,
    pub fulfillment_text: String,
    pub response_id: String,
    /// Query text as understood by the service.
    pub query_text: String,
    /// The full decoded reply.
    pub raw: proto::DetectIntentResponse,
}

impl DetectIntentResponse {
    /// Decodes reply bytes into a response.
    pub fn decode(bytes: &[u8]) -> Result<Self, CallError> {
        let raw = proto::DetectIntentResponse::decode(bytes)
            .map_err(|e| CallError::Decode(e.to_string()))?;
        Self::from_wire(raw)
    }

    pub fn from_wire(raw: proto::DetectIntentResponse) -> Result<Self, CallError> {
        let result = raw
            .query_result
            .as_ref()
            .ok_or_else(|| CallError::Decode("reply has no query_result".into()))?;

        let confidence = result.intent_detection_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(CallError::Decode(format!(
                "intent_detection_confidence {confidence} is outside [0, 1]"
            )));
        }

        Ok(Self {
            intent_name: result
                .intent
                .as_ref()
                .map(|intent| intent.display_name.clone())
                .unwrap_or_default(),
            confidence,
            fulfillment_text: result.fulfillment_text.clone(),
            response_id: raw.response_id.clone(),
            query_text: result.query_text.clone(),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(confidence: f32) -> proto::DetectIntentResponse {
        proto::DetectIntentResponse {
            response_id: "r-1".into(),
            query_result: Some(proto::QueryResult {
                query_text: "Hi".into(),
                fulfillment_text: "Hello!".into(),
                intent: Some(proto::Intent {
                    name: "projects/p1/agent/intents/42".into(),
                    display_name: "greeting".into(),
                }),
                intent_detection_confidence: confidence,
                language_code: "en".into(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn decodes_reply() {
        let bytes = reply(0.95).encode_to_vec();
        let resp = DetectIntentResponse::decode(&bytes).unwrap();
        assert_eq!(resp.intent_name, "greeting");
        assert_eq!(resp.confidence, 0.95);
        assert_eq!(resp.fulfillment_text, "Hello!");
        assert_eq!(resp.raw, reply(0.95));
    }

    #[test]
    fn missing_intent_yields_empty_name() {
        let mut raw = reply(0.0);
        raw.query_result.as_mut().unwrap().intent = None;
        let resp = DetectIntentResponse::from_wire(raw).unwrap();
        assert_eq!(resp.intent_name, "");
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        assert!(matches!(DetectIntentResponse::from_wire(reply(1.5)), Err(CallError::Decode(_))));
        assert!(matches!(
            DetectIntentResponse::from_wire(reply(f32::NAN)),
            Err(CallError::Decode(_))
        ));
    }

    #[test]
    fn rejects_missing_query_result() {
        let raw = proto::DetectIntentResponse {
            response_id: "r".into(),
            query_result: None,
        };
        assert!(matches!(DetectIntentResponse::from_wire(raw), Err(CallError::Decode(_))));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            DetectIntentResponse::decode(&[0xff, 0xff, 0xff]),
            Err(CallError::Decode(_))
        ));
    }
}
