use crate::utils::{seal_token, AppError, ConfigError};

/// Print `token` sealed with `TOKEN_ENCRYPTION_KEY`, ready for `DERIV_API_TOKEN_SEALED`
pub fn execute(token: &str) -> Result<(), AppError> {
    let key = std::env::var("TOKEN_ENCRYPTION_KEY")
        .map_err(|_| ConfigError::Missing("TOKEN_ENCRYPTION_KEY"))?;

    let sealed = seal_token(token, &key)?;
    println!("DERIV_API_TOKEN_SEALED={}", sealed);
    Ok(())
}
