use serde_json::Value;

use crate::cli::{FunctionResponse, OutputFormat};

/// Print a function reply, failing the command when the status is not a success.
pub fn output_response(output_format: OutputFormat, message: &str, response: &FunctionResponse) -> anyhow::Result<()> {
    if !response.status.is_success() {
        let detail = response
            .error_message()
            .map(str::to_string)
            .unwrap_or_else(|| response.body.to_string());
        if output_format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        anyhow::bail!("{} ({})", detail, response.status);
    }

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.body)?),
        OutputFormat::Text => {
            println!("✓ {}", message);
            print_text(&response.body)?;
        }
    }
    Ok(())
}

/// Print a locally produced value.
pub fn output_value(output_format: OutputFormat, message: &str, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            println!("✓ {}", message);
            print_text(value)?;
        }
    }
    Ok(())
}

fn print_text(value: &Value) -> anyhow::Result<()> {
    match value {
        Value::Null => {}
        Value::String(s) => println!("{}", s),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

/// Parse a JSON object given on the command line.
pub fn parse_json_object(raw: &str, what: &str) -> anyhow::Result<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => anyhow::bail!("{} must be a JSON object", what),
        Err(e) => anyhow::bail!("{} is not valid JSON: {}", what, e),
    }
}
