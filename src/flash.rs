use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::ToSchema;

use crate::error::AppError;

/// Session key for the queued flash channels.
pub const FLASH_KEY: &str = "flash";

/// Flash
///
/// One-shot, session-scoped user-facing messages in two named channels.
/// Messages accumulate across redirects and are drained exactly once by the
/// next read response that calls [`take`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Flash {
    pub success: Vec<String>,
    pub error: Vec<String>,
}

/// Queues a success message for the next read response.
pub async fn push_success(session: &Session, message: impl Into<String>) -> Result<(), AppError> {
    let mut flash: Flash = session.get(FLASH_KEY).await?.unwrap_or_default();
    flash.success.push(message.into());
    session.insert(FLASH_KEY, flash).await?;
    Ok(())
}

/// Queues an error message for the next read response.
pub async fn push_error(session: &Session, message: impl Into<String>) -> Result<(), AppError> {
    let mut flash: Flash = session.get(FLASH_KEY).await?.unwrap_or_default();
    flash.error.push(message.into());
    session.insert(FLASH_KEY, flash).await?;
    Ok(())
}

/// Drains the queued flash messages. Removing the key is what makes the
/// channel one-shot: a second read within the same session sees nothing.
pub async fn take(session: &Session) -> Result<Flash, AppError> {
    Ok(session.remove::<Flash>(FLASH_KEY).await?.unwrap_or_default())
}
