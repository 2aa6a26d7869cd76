//! Structural validation for [`Segment`] rows before they are persisted.
//!
//! Ported from the API service's `segment_schema.py`: in that Python codebase the
//! segment is an untyped dict and validation has to check key sets and value types;
//! here the struct already enforces shape, so this module narrows to the one
//! invariant the type system can't express — `message_id` must be angle-bracket free.

use thiserror::Error;

use crate::types::Segment;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentSchemaError {
    #[error("segment message_id must not contain angle brackets: {0:?}")]
    MessageIdHasAngleBrackets(String),
    #[error("segment message_id must not be empty")]
    EmptyMessageId,
    #[error("segment group must not be empty")]
    EmptyGroup,
}

/// Validate one segment's structural invariants.
pub fn validate(segment: &Segment) -> Result<(), SegmentSchemaError> {
    if segment.message_id.is_empty() {
        return Err(SegmentSchemaError::EmptyMessageId);
    }
    if segment.message_id.contains('<') || segment.message_id.contains('>') {
        return Err(SegmentSchemaError::MessageIdHasAngleBrackets(segment.message_id.clone()));
    }
    if segment.group.is_empty() {
        return Err(SegmentSchemaError::EmptyGroup);
    }
    Ok(())
}

/// Validate every segment in `segments`, short-circuiting on the first failure.
pub fn validate_all(segments: &[Segment]) -> Result<(), SegmentSchemaError> {
    segments.iter().try_for_each(validate)
}

/// Strip enclosing `<...>` from a raw wire message-id, the form NNTP responses use.
pub fn strip_angle_brackets(message_id: &str) -> String {
    message_id.trim_start_matches('<').trim_end_matches('>').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(message_id: &str) -> Segment {
        Segment {
            number: 1,
            message_id: message_id.to_string(),
            group: "alt.binaries.test".to_string(),
            size: 100,
        }
    }

    #[test]
    fn well_formed_segment_passes() {
        assert!(validate(&segment("abc123@example.com")).is_ok());
    }

    #[test]
    fn angle_brackets_are_rejected() {
        let result = validate(&segment("<abc123@example.com>"));
        assert!(matches!(result, Err(SegmentSchemaError::MessageIdHasAngleBrackets(_))));
    }

    #[test]
    fn empty_message_id_is_rejected() {
        assert_eq!(validate(&segment("")), Err(SegmentSchemaError::EmptyMessageId));
    }

    #[test]
    fn strip_angle_brackets_removes_both_ends() {
        assert_eq!(strip_angle_brackets("<abc@example.com>"), "abc@example.com");
        assert_eq!(strip_angle_brackets("abc@example.com"), "abc@example.com");
    }

    #[test]
    fn validate_all_short_circuits_on_first_bad_segment() {
        let segments = vec![segment("ok@x"), segment("<bad@x>")];
        assert!(validate_all(&segments).is_err());
    }
}
