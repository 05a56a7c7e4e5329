use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data_value) = data {
                response["data"] = data_value;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Config loaded the same way the server loads it, with .env applied.
pub fn load_config() -> anyhow::Result<&'static crate::config::AppConfig> {
    let _ = dotenvy::dotenv();
    let config = crate::config::config();
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
