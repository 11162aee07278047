//! Custom extractors for Agora-specific data

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::prelude::*;

// Auth //
//******//
/// Authenticated viewer. Rejects anonymous requests.
#[derive(Debug, Clone)]
pub struct Auth(pub Viewer);

impl<S> FromRequestParts<S> for Auth
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match parts.extensions.get::<Auth>() {
			Some(auth) if !auth.0.is_anonymous() => Ok(auth.clone()),
			_ => Err(Error::PermissionDenied),
		}
	}
}

// OptionalAuth //
//***************//
/// Viewer of the request, anonymous when no one is logged in
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Viewer);

impl<S> FromRequestParts<S> for OptionalAuth
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let viewer = parts.extensions.get::<Auth>().map_or_else(Viewer::anonymous, |a| a.0.clone());
		Ok(OptionalAuth(viewer))
	}
}

// Site //
//******//
/// Site the request is addressed to. Defaults to the primary site.
#[derive(Debug, Clone, Copy)]
pub struct Site(pub SiteId);

impl<S> FromRequestParts<S> for Site
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(Site(parts.extensions.get::<SiteId>().copied().unwrap_or_default()))
	}
}

// vim: ts=4
