//! Record parsing
//!
//! A record is one newline-delimited line of the response body. Only lines
//! carrying the `data:` prefix are meaningful; everything else (comments,
//! keep-alives, `event:` lines) is framing noise.

use crate::error::RecordError;
use crate::events::ChatEvent;

/// Prefix marking a payload line
pub const DATA_PREFIX: &str = "data:";

/// Parse one complete line
///
/// Returns `Ok(None)` for lines that carry no payload. Both `data:` and
/// `data: ` are accepted.
///
/// # Errors
///
/// Returns [`RecordError::Malformed`] when the payload is not a JSON object
/// with a `type` discriminator and the fields its kind requires.
pub fn parse_record(line: &str) -> Result<Option<ChatEvent>, RecordError> {
    let line = line.trim();

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);

    if payload.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(payload)
        .map(Some)
        .map_err(|source| RecordError::Malformed {
            line: line.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_prefix_forms() {
        let spaced = parse_record(r#"data: {"type":"talk","chunk":"a"}"#).unwrap();
        let tight = parse_record(r#"data:{"type":"talk","chunk":"a"}"#).unwrap();
        assert_eq!(spaced, Some(ChatEvent::talk("a")));
        assert_eq!(tight, spaced);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let event = parse_record("  data: {\"type\":\"talk\",\"chunk\":\"x\"}\r").unwrap();
        assert_eq!(event, Some(ChatEvent::talk("x")));
    }

    #[test]
    fn test_fragment_whitespace_preserved() {
        let event = parse_record(r#"data: {"type":"talk","chunk":" there"}"#).unwrap();
        assert_eq!(event, Some(ChatEvent::talk(" there")));
    }

    #[test]
    fn test_non_data_lines_ignored() {
        assert!(parse_record(": keep-alive").unwrap().is_none());
        assert!(parse_record("event: message").unwrap().is_none());
        assert!(parse_record("").unwrap().is_none());
        assert!(parse_record("data:").unwrap().is_none());
        assert!(parse_record("data:   ").unwrap().is_none());
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_record("data: {not json").unwrap_err();
        let RecordError::Malformed { line, .. } = err;
        assert_eq!(line, "data: {not json");
    }

    #[test]
    fn test_missing_discriminator_malformed() {
        assert!(parse_record(r#"data: {"chunk":"hi"}"#).is_err());
    }

    #[test]
    fn test_recommend_with_null_and_float_fields() {
        let line = r#"data: {"type":"recommend","message":"근처 수영장","vouchers":[{"id":7,"name":"Swim","category":"수영","distance":1.2,"price":30000.0,"facilityName":"Pool","description":null,"telephone":null}]}"#;
        let Some(ChatEvent::Recommend { summary, items }) = parse_record(line).unwrap() else {
            panic!("expected a recommend event");
        };
        assert_eq!(summary, "근처 수영장");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 7);
        assert!((items[0].price - 30000.0).abs() < f64::EPSILON);
        assert!(items[0].telephone.is_empty());
        assert!(items[0].description.is_empty());
    }

    #[test]
    fn test_null_summary_and_items_default() {
        let event = parse_record(r#"data: {"type":"home_workout","message":null,"videos":null}"#).unwrap();
        assert_eq!(
            event,
            Some(ChatEvent::HomeWorkout {
                summary: String::new(),
                videos: Vec::new(),
            })
        );
    }

    #[test]
    fn test_unknown_kind_is_event() {
        let event = parse_record(r#"data: {"type":"ping"}"#).unwrap();
        assert_eq!(event, Some(ChatEvent::Unknown));
    }
}
