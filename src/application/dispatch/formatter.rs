//! Serialization of dispatch outcomes into a context block for the model.
//!
//! Failure markers are deliberately loud: models otherwise tend to invent
//! plausible success output for a tool they were told ran.

use super::types::DispatchResult;
use serde_json::Value;

const FAILURE_INSTRUCTION: &str =
    "This capability FAILED. Report the failure to the user; do not fabricate a result.";

pub fn format_results(dispatch: &DispatchResult) -> String {
    let mut block = String::from("=== TOOL EXECUTION RESULTS ===\n");

    for result in &dispatch.results {
        if result.success {
            block.push_str(&format!("[{}] success\n", result.name));
            block.push_str(&render_data(result.data.as_ref()));
        } else {
            block.push_str(&format!("[{}] FAILED\n", result.name));
            block.push_str(&format!(
                "Error: {}\n",
                result.error.as_deref().unwrap_or("unknown error")
            ));
            block.push_str(FAILURE_INSTRUCTION);
            block.push('\n');
        }
    }

    block.push_str("=== END TOOL EXECUTION RESULTS ===\n");

    let failed = dispatch.failed_names();
    if !failed.is_empty() {
        block.push_str(&format!("FAILED CAPABILITIES: {}\n", failed.join(", ")));
        block.push_str(
            "Acknowledge each failure above in your answer; never invent output for them.\n",
        );
    }
    block
}

fn render_data(data: Option<&Value>) -> String {
    match data {
        None | Some(Value::Null) => "(no output)\n".to_string(),
        Some(Value::String(text)) => {
            let mut rendered = text.clone();
            if !rendered.ends_with('\n') {
                rendered.push('\n');
            }
            rendered
        }
        Some(other) => {
            let mut rendered =
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            rendered.push('\n');
            rendered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::types::{ExecutionSource, ToolResult};
    use serde_json::json;

    fn result(name: &str, success: bool, data: Option<Value>, error: Option<&str>) -> ToolResult {
        ToolResult {
            call_id: format!("call-{name}"),
            name: name.to_string(),
            success,
            data,
            error: error.map(String::from),
            duration_ms: 3,
            source: ExecutionSource::Local,
        }
    }

    fn dispatch(results: Vec<ToolResult>) -> DispatchResult {
        let success = results.iter().all(|r| r.success);
        DispatchResult {
            success,
            results,
            total_duration_ms: 5,
            parallel_groups: 0,
            sequential_groups: 1,
        }
    }

    #[test]
    fn renders_text_data_as_is_and_structures_pretty() {
        let block = format_results(&dispatch(vec![
            result("web_search", true, Some(json!("sunny")), None),
            result("read_file", true, Some(json!({"lines": 3})), None),
        ]));
        assert!(block.contains("[web_search] success\nsunny\n"));
        assert!(block.contains("\"lines\": 3"));
        assert!(!block.contains("FAILED CAPABILITIES"));
    }

    #[test]
    fn failures_carry_marker_error_and_instruction() {
        let block = format_results(&dispatch(vec![
            result("write_file", false, None, Some("disk full")),
            result("current_time", true, Some(json!("10:00")), None),
        ]));
        assert!(block.contains("[write_file] FAILED"));
        assert!(block.contains("Error: disk full"));
        assert!(block.contains(FAILURE_INSTRUCTION));
        assert!(block.contains("FAILED CAPABILITIES: write_file"));
    }
}
