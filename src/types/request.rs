use crate::error::CallError;
use crate::proto;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language tag shape: a 2-8 letter primary subtag followed by 1-8 alphanumeric subtags.
static LANGUAGE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("valid regex"));

/// A single intent-detection request.
///
/// All fields are required; whitespace-only values count as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectIntentRequest {
    pub project_id: String,
    pub session_id: String,
    pub text: String,
    /// BCP-47 language tag, e.g. `en` or `de-AT`.
    pub language_code: String,
}

impl DetectIntentRequest {
    pub fn new(
        project_id: impl Into<String>,
        session_id: impl Into<String>,
        text: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: session_id.into(),
            text: text.into(),
            language_code: language_code.into(),
        }
    }

    /// Generates a fresh session id for callers that start a new conversation.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// `projects/<project>/agent/sessions/<session>`
    pub fn session_path(&self) -> String {
        format!(
            "projects/{}/agent/sessions/{}",
            self.project_id.trim(),
            self.session_id.trim()
        )
    }

    pub fn validate(&self) -> Result<(), CallError> {
        for (field, value) in [
            ("project_id", &self.project_id),
            ("session_id", &self.session_id),
            ("text", &self.text),
            ("language_code", &self.language_code),
        ] {
            if value.trim().is_empty() {
                return Err(CallError::invalid_request(field, "must not be empty"));
            }
        }

        for (field, value) in [("project_id", &self.project_id), ("session_id", &self.session_id)] {
            if value.contains('/') {
                return Err(CallError::invalid_request(field, "must not contain '/'"));
            }
        }

        if !LANGUAGE_TAG.is_match(self.language_code.trim()) {
            return Err(CallError::invalid_request(
                "language_code",
                format!("'{}' is not a BCP-47 language tag", self.language_code),
            ));
        }

        Ok(())
    }

    /// Validates and converts into the wire message.
    pub fn to_wire(&self) -> Result<proto::DetectIntentRequest, CallError> {
        self.validate()?;
        Ok(proto::DetectIntentRequest {
            session: self.session_path(),
            query_input: Some(proto::QueryInput {
                text: Some(proto::TextInput {
                    text: self.text.clone(),
                    language_code: self.language_code.trim().to_string(),
                }),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DetectIntentRequest {
        DetectIntentRequest::new("p1", "s1", "Hi", "en")
    }

    #[test]
    fn builds_session_path() {
        let wire = sample().to_wire().unwrap();
        assert_eq!(wire.session, "projects/p1/agent/sessions/s1");
        let text = wire.query_input.unwrap().text.unwrap();
        assert_eq!(text.text, "Hi");
        assert_eq!(text.language_code, "en");
    }

    #[test]
    fn each_empty_field_is_reported() {
        let cases = [
            ("project_id", DetectIntentRequest { project_id: "".into(), ..sample() }),
            ("session_id", DetectIntentRequest { session_id: " ".into(), ..sample() }),
            ("text", DetectIntentRequest { text: "\n".into(), ..sample() }),
            ("language_code", DetectIntentRequest { language_code: "".into(), ..sample() }),
        ];
        for (expected, req) in cases {
            match req.validate() {
                Err(CallError::InvalidRequest { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidRequest for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn language_tags() {
        for ok in ["en", "de-AT", "zh-Hant-TW", "es-419"] {
            assert!(DetectIntentRequest { language_code: ok.into(), ..sample() }.validate().is_ok(), "{ok}");
        }
        for bad in ["e", "en_US", "english language", "-en"] {
            assert!(DetectIntentRequest { language_code: bad.into(), ..sample() }.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn ids_cannot_escape_the_session_path() {
        let req = DetectIntentRequest { session_id: "s1/../other".into(), ..sample() };
        assert!(matches!(req.validate(), Err(CallError::InvalidRequest { ref field, .. }) if field == "session_id"));
    }

    #[test]
    fn generated_session_ids_are_unique() {
        assert_ne!(DetectIntentRequest::new_session_id(), DetectIntentRequest::new_session_id());
    }
}
