//! Field-token parsing
//!
//! A field-token list is the comma-separated value of a `fields` or
//! `fields[<relation>]` query parameter. Besides field names and `@group`
//! markers it may carry the pagination directives `page(<n>)` and
//! `page_size(<n>)`. Nothing in this module fails: a directive whose digits
//! do not form a `usize` is reported as [`Directive::Invalid`] and the caller
//! decides what that means.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a `page(<n>)` directive.
pub static PAGE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page\(([0-9_]+)\)").unwrap());

/// Matches a `page_size(<n>)` directive.
pub static PAGE_SIZE_PATTERN: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^page_size\(([0-9_]+)\)").unwrap());

/// Returns the first capture group of the first item matching `pattern`.
///
/// Items are scanned in order and matching is anchored at the start of each
/// item. Later matches are ignored.
///
/// # Examples
///
/// ```
/// use reinhardt_extras_core::tokens::{match_iterator_pattern, PAGE_PATTERN};
///
/// let tokens = ["id", "page(3)", "page(7)"];
/// assert_eq!(match_iterator_pattern(&PAGE_PATTERN, &tokens), Some("3".to_string()));
/// assert_eq!(match_iterator_pattern(&PAGE_PATTERN, &["id"]), None);
/// ```
pub fn match_iterator_pattern<I, S>(pattern: &Regex, items: I) -> Option<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	items.into_iter().find_map(|item| {
		pattern
			.captures(item.as_ref())
			.and_then(|captures| captures.get(1))
			.map(|group| group.as_str().to_string())
	})
}

/// Splits a comma-separated field selection into its tokens.
///
/// Surrounding whitespace is trimmed and empty tokens are dropped.
pub fn split_field_tokens(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.map(str::to_string)
		.collect()
}

/// Whether a token is a pagination directive rather than a field selector.
pub fn is_pagination_token(token: &str) -> bool {
	PAGE_PATTERN.is_match(token) || PAGE_SIZE_PATTERN.is_match(token)
}

/// Value of a matched `page(<n>)` or `page_size(<n>)` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
	Number(usize),
	/// The digits were only `_` separators or overflow a `usize`.
	Invalid,
}

impl Directive {
	/// Digits captured by the directive patterns may contain `_` separators.
	fn parse(digits: &str) -> Self {
		let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
		cleaned
			.parse::<usize>()
			.map_or(Directive::Invalid, Directive::Number)
	}

	pub fn number(self) -> Option<usize> {
		match self {
			Directive::Number(n) => Some(n),
			Directive::Invalid => None,
		}
	}
}

/// A field-token list split into field selectors and pagination directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTokens {
	/// Tokens that are not pagination directives, in request order.
	pub fields: Vec<String>,
	/// Value of the first `page(<n>)` directive.
	pub page: Option<Directive>,
	/// Value of the first `page_size(<n>)` directive.
	pub page_size: Option<Directive>,
}

impl FieldTokens {
	/// Parse a token list. The input is not modified.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_extras_core::tokens::{Directive, FieldTokens};
	///
	/// let parsed = FieldTokens::parse(&["id", "page_size(1_0)", "page(2)", "bar"]);
	/// assert_eq!(parsed.fields, vec!["id", "bar"]);
	/// assert_eq!(parsed.page, Some(Directive::Number(2)));
	/// assert_eq!(parsed.page_size, Some(Directive::Number(10)));
	/// ```
	pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
		let page = match_iterator_pattern(&PAGE_PATTERN, tokens).map(|n| Directive::parse(&n));
		let page_size =
			match_iterator_pattern(&PAGE_SIZE_PATTERN, tokens).map(|n| Directive::parse(&n));
		let fields = tokens
			.iter()
			.map(AsRef::as_ref)
			.filter(|token| !is_pagination_token(token))
			.map(str::to_string)
			.collect();
		Self {
			fields,
			page,
			page_size,
		}
	}

	/// Page number, defaulting to the first page. `None` when the
	/// directive is invalid.
	pub fn page_number(&self) -> Option<usize> {
		self.page.map_or(Some(1), Directive::number)
	}

	/// Page size, falling back to `default` when no directive was given.
	/// `None` when the directive is invalid.
	pub fn page_size_or(&self, default: usize) -> Option<usize> {
		self.page_size.map_or(Some(default), Directive::number)
	}

	/// Whether any pagination directive was present.
	pub fn has_pagination(&self) -> bool {
		self.page.is_some() || self.page_size.is_some()
	}
}
