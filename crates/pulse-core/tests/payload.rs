//! Response payload encoding.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use pulse_core::StatusMessage;

#[test]
fn success_encodes_as_json_line() {
    let bytes = StatusMessage::success().to_json_line().unwrap();
    assert_eq!(&bytes[..], b"{\"message\":\"success\"}\n");
}

#[test]
fn decodes_back_without_newline_sensitivity() {
    let bytes = StatusMessage::success().to_json_line().unwrap();
    let msg: StatusMessage = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(msg, StatusMessage::success());
}
