use std::io::{self, Read};

use brinson_core::AttributionInput;

/// Read an `AttributionInput` document piped on stdin.
///
/// Returns `None` when stdin is a terminal or the pipe is empty, so the
/// caller can ask for `--input` instead.
pub fn read_stdin_input() -> Result<Option<AttributionInput>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let input = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse attribution input from stdin: {e}"))?;
    Ok(Some(input))
}
