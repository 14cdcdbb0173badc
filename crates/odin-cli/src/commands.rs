//! Command implementations

use anyhow::{Context, Result};
use odin_core::{load_batch, load_message, save_batch, save_message, Message, MessageBatch};
use std::path::Path;
use tracing::info;

/// Decode a `.odin` file into pretty-printed JSON
pub fn inspect(path: &Path, batch: bool) -> Result<String> {
    let json = if batch {
        let batch = load_batch(path)
            .with_context(|| format!("failed to read batch from {}", path.display()))?;
        info!("Decoded batch {} with {} messages", batch.batch_id, batch.len());
        serde_json::to_string_pretty(&batch)?
    } else {
        let message = load_message(path)
            .with_context(|| format!("failed to read message from {}", path.display()))?;
        info!("Decoded message {}", message.trace_id());
        serde_json::to_string_pretty(&message)?
    };
    Ok(json)
}

/// Parse JSON from `input`, validate it, and write the binary form to
/// `output`. Returns the number of messages written.
pub fn encode(input: &Path, output: &Path, batch: bool) -> Result<usize> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let count = if batch {
        let batch: MessageBatch = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid message batch", input.display()))?;
        save_batch(output, &batch)
            .with_context(|| format!("failed to write {}", output.display()))?;
        batch.len()
    } else {
        let message: Message = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid message", input.display()))?;
        save_message(output, &message)
            .with_context(|| format!("failed to write {}", output.display()))?;
        1
    };

    info!("Wrote {} message(s) to {}", count, output.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odin_core::{create_batch, MessageBuilder, Role};
    use tempfile::TempDir;

    #[test]
    fn test_encode_then_inspect() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("message.json");
        let output = dir.path().join("message.odin");
        std::fs::write(
            &input,
            r#"{"trace_id":"t1","session_id":"s1","sender_id":"a","receiver_id":"b",
               "role":"mediator","raw_output":"hi","semantic_drift":3.0,"timestamp_ms":5}"#,
        )
        .unwrap();

        assert_eq!(encode(&input, &output, false).unwrap(), 1);

        let json = inspect(&output, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["role"], "mediator");
        assert_eq!(value["healed_output"], "hi");
        assert_eq!(value["semantic_drift"], 1.0);
        assert_eq!(value["timestamp_ms"], 5);
    }

    #[test]
    fn test_encode_rejects_invalid_message() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.json");
        std::fs::write(
            &input,
            r#"{"trace_id":"","session_id":"s","sender_id":"a","receiver_id":"b"}"#,
        )
        .unwrap();

        let err = encode(&input, &dir.path().join("out.odin"), false).unwrap_err();
        assert!(err.to_string().contains("not a valid message"));
        assert!(!dir.path().join("out.odin").exists());
    }

    #[test]
    fn test_inspect_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.odin");
        let messages = ["m1", "m2"]
            .iter()
            .map(|trace| {
                MessageBuilder::new()
                    .identifiers(*trace, "s", "a", "b")
                    .role(Role::User)
                    .content("x")
                    .build()
                    .unwrap()
            })
            .collect();
        save_batch(&path, &create_batch(messages, "b-7")).unwrap();

        let json = inspect(&path, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["batch_id"], "b-7");
        assert_eq!(value["messages"][1]["trace_id"], "m2");
    }

    #[test]
    fn test_inspect_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(inspect(&dir.path().join("missing.odin"), false).is_err());
    }
}
