//! Caller identity as forwarded by the upstream identity provider.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, state::quiz_match::PlayerRef};

/// Header carrying the authenticated player id.
pub const PLAYER_ID_HEADER: &str = "x-player-id";
/// Header carrying the player's display login.
pub const PLAYER_LOGIN_HEADER: &str = "x-player-login";

/// Player making the request. The login falls back to the id when not forwarded.
#[derive(Debug, Clone)]
pub struct AuthenticatedPlayer(pub PlayerRef);

impl<S> FromRequestParts<S> for AuthenticatedPlayer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, PLAYER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized(format!("missing player identity header `{PLAYER_ID_HEADER}`"))
        })?;
        let login = header_value(parts, PLAYER_LOGIN_HEADER).unwrap_or_else(|| id.clone());

        Ok(Self(PlayerRef { id, login }))
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<AuthenticatedPlayer, AppError> {
        let (mut parts, _) = request.into_parts();
        AuthenticatedPlayer::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn login_defaults_to_id() {
        let request = Request::builder()
            .header(PLAYER_ID_HEADER, " alice ")
            .body(())
            .unwrap();
        let AuthenticatedPlayer(player) = extract(request).await.unwrap();
        assert_eq!(player.id, "alice");
        assert_eq!(player.login, "alice");
    }

    #[tokio::test]
    async fn blank_id_is_unauthorized() {
        let request = Request::builder()
            .header(PLAYER_ID_HEADER, "   ")
            .header(PLAYER_LOGIN_HEADER, "ghost")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
