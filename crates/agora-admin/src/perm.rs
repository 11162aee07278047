//! Admin permission middleware

use axum::{
	extract::{Request, State},
	middleware::Next,
	response::Response,
};

use agora_core::extract::Auth;

use crate::prelude::*;

/// Middleware that lets only site administrators through
pub async fn require_admin(
	State(_app): State<App>,
	Auth(viewer): Auth,
	req: Request,
	next: Next,
) -> Result<Response, Error> {
	if !viewer.is_admin {
		warn!(user_id = ?viewer.user_id, "Admin permission denied");
		return Err(Error::PermissionDenied);
	}

	Ok(next.run(req).await)
}

// vim: ts=4
