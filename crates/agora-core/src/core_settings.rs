//! Core site settings registration
//!
//! Registers the settings every Agora site has. Feature crates register
//! their own settings next to these before the registry is frozen.

use std::sync::Arc;

use crate::prelude::*;
use crate::settings::{
	LocaleEnum, SettingDefinition, SettingType, SettingValue, SettingsRegistry, TrustLevelEnum,
};

/// Register all core settings
pub fn register_settings(registry: &mut SettingsRegistry) -> ClResult<()> {
	// Required
	registry.register(
		SettingDefinition::builder("title")
			.description("The name of this site")
			.category("required")
			.default(SettingValue::String("Agora".into()))
			.max(100)
			.client(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("site_description")
			.description("Describe this site in one sentence")
			.category("required")
			.default(SettingValue::String(String::new()))
			.max(300)
			.client(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("contact_email")
			.description("Email address of the person responsible for this site")
			.category("required")
			.default(SettingValue::String(String::new()))
			.regex(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
			.regex_error("Not a valid email address.")
			.build()?,
	)?;

	// Basic
	registry.register(
		SettingDefinition::builder("default_locale")
			.description("The default language of this site")
			.category("basic")
			.default(SettingValue::String("en".into()))
			.enum_provider(Arc::new(LocaleEnum))
			.client(true)
			.refresh(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("top_menu")
			.description("Navigation items shown on the homepage, in order")
			.category("basic")
			.data_type(SettingType::List)
			.default(SettingValue::String("latest|new|unread|categories".into()))
			.client(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("max_users")
			.description("Maximum number of active users")
			.category("basic")
			.default(SettingValue::Integer(10))
			.min(1)
			.build()?,
	)?;

	// Login
	registry.register(
		SettingDefinition::builder("login_required")
			.description("Require authentication to read content")
			.category("login")
			.default(SettingValue::Bool(false))
			.client(true)
			.refresh(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("allowed_iframes")
			.description("Sources that may be embedded in posts")
			.category("security")
			.data_type(SettingType::UrlList)
			.default(SettingValue::String("https://www.youtube.com/embed/".into()))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("cors_origins")
			.description("Hosts allowed to make cross-origin requests")
			.category("security")
			.data_type(SettingType::HostList)
			.default(SettingValue::List(Vec::new()))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("blocked_email_domains")
			.description("Email domains not allowed to register")
			.category("login")
			.data_type(SettingType::ValueList)
			.default(SettingValue::String("mailinator.com".into()))
			.build()?,
	)?;

	// Trust
	registry.register(
		SettingDefinition::builder("min_trust_to_flag")
			.description("Minimum trust level required to flag posts")
			.category("trust")
			.default(SettingValue::Integer(1))
			.enum_provider(Arc::new(TrustLevelEnum))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("default_trust_level")
			.description("Trust level granted to new users")
			.category("trust")
			.default(SettingValue::Integer(0))
			.enum_provider(Arc::new(TrustLevelEnum))
			.build()?,
	)?;

	// Posting
	registry.register(
		SettingDefinition::builder("min_post_length")
			.description("Minimum allowed post length in characters")
			.category("posting")
			.default(SettingValue::Integer(20))
			.min(1)
			.max(10_000)
			.client(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("newuser_spam_host_threshold")
			.description("Ratio of links to the same host that marks a new user's post as spam")
			.category("spam")
			.default(SettingValue::Float(0.5))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("blocked_words")
			.description("Posts matching this pattern are rejected")
			.category("posting")
			.data_type(SettingType::Regex)
			.default(SettingValue::String(String::new()))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("default_composer_category")
			.description("Categories preselected in the composer")
			.category("posting")
			.data_type(SettingType::CategoryList)
			.default(SettingValue::List(Vec::new()))
			.client(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("digest_time")
			.description("Time of day the email digest is sent")
			.category("email")
			.data_type(SettingType::Time)
			.default(SettingValue::String("08:00".into()))
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("email_in_style")
			.description("How incoming email is formatted")
			.category("email")
			.default(SettingValue::String("plain".into()))
			.choices([SettingValue::String("plain".into()), SettingValue::String("markdown".into())])
			.build()?,
	)?;

	// Operator controlled
	registry.register(
		SettingDefinition::builder("smtp_address")
			.description("Outgoing mail server")
			.category("email")
			.default(SettingValue::String(String::new()))
			.shadowed_by_global(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("cdn_url")
			.description("URL prefix of static assets")
			.category("developer")
			.default(SettingValue::String(String::new()))
			.shadowed_by_global(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("api_secret")
			.description("Shared secret for trusted API clients")
			.category("developer")
			.default(SettingValue::String(String::new()))
			.secret(true)
			.build()?,
	)?;

	registry.register(
		SettingDefinition::builder("experimental_flag")
			.description("Feature switch whose type is fixed by the first value stored")
			.category("developer")
			.default(SettingValue::Null)
			.hidden(true)
			.build()?,
	)?;

	registry.add_validation("max_users", |value| match value.as_i64() {
		Some(n) if n > 1_000_000 => Err(Error::InvalidParameters(
			"max_users cannot exceed one million".into(),
		)),
		_ => Ok(()),
	})?;

	Ok(())
}


// vim: ts=4
