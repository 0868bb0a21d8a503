//! Validation helpers for DTOs.

use validator::ValidationError;

/// Bounds of a question body, counted in characters after trimming.
pub const QUESTION_BODY_MIN: usize = 10;
/// Longest accepted question body.
pub const QUESTION_BODY_MAX: usize = 500;
const REQUEST_ID_MAX: usize = 100;

/// Validates that a question body is 10 to 500 characters once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_question_body("What is the capital of Peru?") // Ok
/// validate_question_body("   short   ")                  // Err - too short once trimmed
/// ```
pub fn validate_question_body(body: &str) -> Result<(), ValidationError> {
    let length = body.trim().chars().count();
    if !(QUESTION_BODY_MIN..=QUESTION_BODY_MAX).contains(&length) {
        let mut err = ValidationError::new("question_body_length");
        err.message = Some(
            format!(
                "Question body must be between {QUESTION_BODY_MIN} and {QUESTION_BODY_MAX} characters (got {length})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that at least one accepted answer is given and none is blank.
pub fn validate_correct_answers(answers: &[String]) -> Result<(), ValidationError> {
    if answers.is_empty() {
        let mut err = ValidationError::new("correct_answers_empty");
        err.message = Some("At least one correct answer is required".into());
        return Err(err);
    }

    if answers.iter().any(|answer| answer.trim().is_empty()) {
        let mut err = ValidationError::new("correct_answers_blank");
        err.message = Some("Correct answers must not be blank".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a client supplied request id: non-blank, at most 100 characters.
pub fn validate_request_id(request_id: &str) -> Result<(), ValidationError> {
    if request_id.trim().is_empty() || request_id.chars().count() > REQUEST_ID_MAX {
        let mut err = ValidationError::new("request_id_format");
        err.message =
            Some(format!("Request id must be 1 to {REQUEST_ID_MAX} non-blank characters").into());
        return Err(err);
    }

    Ok(())
}
