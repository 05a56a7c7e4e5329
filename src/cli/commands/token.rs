use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::load_config;
use crate::cli::OutputFormat;

pub fn handle(id: String, role: String, hours: Option<u64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let hours = hours.unwrap_or(config.security.jwt_expiry_hours);

    let claims = Claims::new(id, role, hours);
    let token = generate_jwt(&claims, &config.security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "token": token,
                "id": claims.id,
                "role": claims.role,
                "expires_at": claims.exp
            }))?
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
