//! Response serialisation for the dispatch loop.

use std::io::Write;

use scenelink_protocol::CommandResponse;

use super::errors::DispatchError;

/// Writer that frames envelopes as JSON lines.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one envelope followed by a newline and flushes it.
    ///
    /// Each response is flushed on its own so a client waiting on one reply
    /// is never held back by buffering.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation, writing or flushing fails.
    pub fn write_response(&mut self, response: &CommandResponse) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, response)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scenelink_protocol::ErrorCode;

    use super::*;

    #[test]
    fn writes_one_line_per_response() {
        let mut output = Vec::new();
        let mut writer = ResponseWriter::new(&mut output);
        writer
            .write_response(&CommandResponse::error(
                ErrorCode::UnknownCommand,
                "Unknown command: explode",
            ))
            .expect("write error");
        writer
            .write_response(&CommandResponse::success("done", serde_json::Map::new()))
            .expect("write success");

        let text = String::from_utf8(output).expect("valid utf8");
        assert_eq!(
            text,
            concat!(
                r#"{"status":"error","message":"Unknown command: explode","code":"unknown_command"}"#,
                "\n",
                r#"{"status":"success","message":"done"}"#,
                "\n",
            )
        );
    }
}
