//! Request identity
//!
//! Agora does not authenticate users itself. It runs behind a gateway that
//! does and forwards the result in trusted headers:
//!
//! - `X-Agora-User`: numeric user id, absent for anonymous visitors
//! - `X-Agora-Groups`: comma separated group ids
//! - `X-Agora-Admin`, `X-Agora-Staged`: `true` / `1` when set
//! - `X-Agora-Site`: site id, the primary site when absent

use axum::{
	extract::Request,
	http::HeaderMap,
	middleware::Next,
	response::Response,
};

use agora_core::extract::Auth;

use crate::prelude::*;

pub const USER_HEADER: &str = "x-agora-user";
pub const GROUPS_HEADER: &str = "x-agora-groups";
pub const ADMIN_HEADER: &str = "x-agora-admin";
pub const STAGED_HEADER: &str = "x-agora-staged";
pub const SITE_HEADER: &str = "x-agora-site";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> ClResult<Option<&'a str>> {
	match headers.get(name) {
		Some(value) => value
			.to_str()
			.map(|v| Some(v.trim()))
			.map_err(|_| Error::InvalidParameters(format!("invalid {} header", name))),
		None => Ok(None),
	}
}

fn header_flag(headers: &HeaderMap, name: &str) -> ClResult<bool> {
	Ok(matches!(header_str(headers, name)?, Some(v) if v.eq_ignore_ascii_case("true") || v == "1"))
}

/// Build the viewer from the gateway headers
pub fn viewer_from_headers(headers: &HeaderMap) -> ClResult<Viewer> {
	let Some(user) = header_str(headers, USER_HEADER)?.filter(|u| !u.is_empty()) else {
		return Ok(Viewer::anonymous());
	};
	let user_id = user.parse::<i64>().map_err(|_| {
		warn!("Rejected malformed user header: {:?}", user);
		Error::PermissionDenied
	})?;

	let group_ids = match header_str(headers, GROUPS_HEADER)? {
		Some(groups) => groups
			.split(',')
			.map(str::trim)
			.filter(|g| !g.is_empty())
			.map(|g| {
				g.parse::<i64>()
					.map(GroupId)
					.map_err(|_| Error::InvalidParameters(format!("invalid group id '{}'", g)))
			})
			.collect::<ClResult<Box<[GroupId]>>>()?,
		None => Box::default(),
	};

	Ok(Viewer {
		user_id: Some(user_id),
		is_admin: header_flag(headers, ADMIN_HEADER)?,
		is_staged: header_flag(headers, STAGED_HEADER)?,
		group_ids,
	})
}

pub fn site_from_headers(headers: &HeaderMap) -> ClResult<SiteId> {
	match header_str(headers, SITE_HEADER)? {
		Some(site) => site
			.parse::<u32>()
			.map(SiteId)
			.map_err(|_| Error::InvalidParameters(format!("invalid site id '{}'", site))),
		None => Ok(SiteId::default()),
	}
}

/// Middleware placing the viewer and the site into the request extensions
pub async fn identify(mut req: Request, next: Next) -> ClResult<Response> {
	let viewer = viewer_from_headers(req.headers())?;
	let site_id = site_from_headers(req.headers())?;

	if !viewer.is_anonymous() {
		debug!(user_id = ?viewer.user_id, site_id = %site_id, "Request by {:?}", viewer.group_ids);
	}
	req.extensions_mut().insert(site_id);
	req.extensions_mut().insert(Auth(viewer));

	Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::{HeaderName, HeaderValue};

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
		}
		map
	}

	#[test]
	fn test_anonymous_without_user() {
		let viewer = viewer_from_headers(&headers(&[(GROUPS_HEADER, "3")])).unwrap();
		assert!(viewer.is_anonymous());
		assert!(viewer.group_ids.is_empty());
	}

	#[test]
	fn test_member_viewer() {
		let viewer = viewer_from_headers(&headers(&[
			(USER_HEADER, "42"),
			(GROUPS_HEADER, "3, 11,,100"),
			(STAGED_HEADER, "TRUE"),
		]))
		.unwrap();
		assert_eq!(viewer.user_id, Some(42));
		assert_eq!(&*viewer.group_ids, &[GroupId(3), GroupId(11), GroupId(100)]);
		assert!(viewer.is_staged);
		assert!(!viewer.is_admin);
	}

	#[test]
	fn test_malformed_headers() {
		assert!(matches!(
			viewer_from_headers(&headers(&[(USER_HEADER, "alice")])),
			Err(Error::PermissionDenied)
		));
		assert!(matches!(
			viewer_from_headers(&headers(&[(USER_HEADER, "1"), (GROUPS_HEADER, "staff")])),
			Err(Error::InvalidParameters(_))
		));
		assert!(site_from_headers(&headers(&[(SITE_HEADER, "-1")])).is_err());
	}

	#[test]
	fn test_site_header() {
		assert_eq!(site_from_headers(&HeaderMap::new()).unwrap(), SiteId(1));
		assert_eq!(site_from_headers(&headers(&[(SITE_HEADER, "7")])).unwrap(), SiteId(7));
	}
}

// vim: ts=4
