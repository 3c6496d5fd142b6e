//! Canned reply for queries outside the guideline's scope.

use cdss_model::Message;

pub const GENERAL_RESPONSE: &str = "Hello! This Clinical Decision Support System is designed to \
answer questions strictly based on the 2022 AHA/ACC/HFSA Guideline for the Management of Heart \
Failure. Your question does not appear to be related to this guideline, so I am unable to provide \
a response within the scope of this system.";

/// The deflection appended for `general` queries. Makes no external calls.
pub fn general_response() -> Message {
    Message::assistant(GENERAL_RESPONSE)
}
