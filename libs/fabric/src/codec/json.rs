use serde::{Deserialize, Serialize};
use usb2snes_core::{Command, Space};

use crate::codec::{Codec, Response};
use crate::error::{Error, Result};
use crate::transport::Frame;

/// JSON envelope codec used by USB2SNES servers
///
/// Requests go out as text frames. Replies are either text frames carrying a
/// `Results` array or binary frames carrying raw data.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestEnvelope<'a> {
    opcode: &'a str,
    space: Space,
    // An absent field, not an empty list, means "none" on the wire
    #[serde(skip_serializing_if = "is_empty")]
    operands: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    flags: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultsEnvelope {
    results: Vec<String>,
}

fn is_empty(values: &&[String]) -> bool {
    values.is_empty()
}

impl Codec for JsonCodec {
    fn encode(&self, command: &Command) -> Result<Frame> {
        let envelope = RequestEnvelope {
            opcode: &command.opcode,
            space: command.space,
            operands: &command.operands,
            flags: &command.flags,
        };
        serde_json::to_string(&envelope)
            .map(Frame::Text)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode(&self, frame: Frame) -> Result<Response> {
        match frame {
            Frame::Binary(bytes) => Ok(Response::Binary(bytes)),
            Frame::Text(text) => serde_json::from_str::<ResultsEnvelope>(&text)
                .map(|envelope| Response::Results(envelope.results))
                .map_err(|e| Error::Protocol(format!("Undecodable reply {:?}: {}", text, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use usb2snes_core::Opcode;

    use super::*;

    fn encoded(command: &Command) -> Value {
        match JsonCodec.encode(command).unwrap() {
            Frame::Text(text) => serde_json::from_str(&text).unwrap(),
            Frame::Binary(_) => panic!("Requests must be text frames"),
        }
    }

    #[test]
    fn empty_lists_are_omitted() {
        let value = encoded(&Command::new(Opcode::Info));
        assert_eq!(value, json!({"Opcode": "Info", "Space": "SNES"}));
    }

    #[test]
    fn populated_lists_are_emitted_in_order() {
        let command = Command::new(Opcode::GetAddress)
            .operands(["F50010", "2"])
            .flag("NORESPONSE")
            .space(usb2snes_core::Space::Cmd);
        let value = encoded(&command);
        assert_eq!(
            value,
            json!({
                "Opcode": "GetAddress",
                "Space": "CMD",
                "Operands": ["F50010", "2"],
                "Flags": ["NORESPONSE"],
            })
        );
    }

    #[test]
    fn flags_without_operands_omit_operands_only() {
        let value = encoded(&Command::new("Boot").flag("X"));
        assert!(value.get("Operands").is_none());
        assert_eq!(value["Flags"], json!(["X"]));
    }

    #[test]
    fn field_order_matches_wire_layout() {
        let frame = JsonCodec
            .encode(&Command::new("List").operand("/").flag("F"))
            .unwrap();
        assert_eq!(
            frame,
            Frame::Text(r#"{"Opcode":"List","Space":"SNES","Operands":["/"],"Flags":["F"]}"#.into())
        );
    }

    #[test]
    fn binary_frames_pass_through() {
        let response = JsonCodec.decode(Frame::Binary(vec![0x00, 0x42])).unwrap();
        assert_eq!(response, Response::Binary(vec![0x00, 0x42]));
    }

    #[test]
    fn text_frames_yield_results() {
        let response = JsonCodec
            .decode(Frame::Text(r#"{"Results":["a","b"]}"#.into()))
            .unwrap();
        assert_eq!(response, Response::Results(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn missing_results_is_a_protocol_error() {
        let err = JsonCodec
            .decode(Frame::Text(r#"{"Other":[]}"#.into()))
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let err = JsonCodec.decode(Frame::Text("not json".into())).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn response_accessors_check_shape() {
        assert_eq!(
            Response::Results(vec!["1".into()]).into_results().unwrap(),
            ["1"]
        );
        assert!(Response::Binary(vec![1]).into_results().is_err());
        assert_eq!(Response::Binary(vec![1]).into_bytes().unwrap(), [1]);
        assert!(Response::Results(vec![]).into_bytes().is_err());
    }
}
