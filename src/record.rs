//! Submission validation and the attribute-to-record mapper.
//!
//! Web forms send a primary email plus an open-ended attribute bag. [`RecordMapper`] resolves
//! known keys through the [`alias`] table into CRM fields and collects everything else into an
//! overflow bag that is serialized into `Description`, so no submitted value is ever dropped.

pub mod alias;

pub use alias::{AliasTarget, CanonicalField};

// std
use std::sync::LazyLock;
// crates.io
use regex::Regex;
// self
use crate::{_prelude::*, error::ValidationError};

/// Label that introduces the serialized overflow bag inside `Description`.
pub const OVERFLOW_LABEL: &str = "Additional fields:";
/// Account name written when the submission names no company.
pub const ACCOUNT_PLACEHOLDER: &str = "—";
/// Lead source used when neither the submission nor configuration supplies one.
pub const DEFAULT_LEAD_SOURCE: &str = "Website";

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Returns `true` when `value` has the shape `local@domain.tld` with no whitespace.
pub fn is_plausible_email(value: &str) -> bool {
	EMAIL_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(value))
}

/// Fails with [`ValidationError::InvalidEmail`] unless the email is plausible.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
	if is_plausible_email(value) { Ok(()) } else { Err(ValidationError::InvalidEmail) }
}

/// Returns `true` when the anti-bot decoy field carries anything a human would not send.
///
/// Absent, `null`, blank strings, `false`, and `0` are treated as empty.
pub fn honeypot_triggered(value: Option<&Value>) -> bool {
	match value {
		None | Some(Value::Null) => false,
		Some(Value::String(text)) => !text.trim().is_empty(),
		Some(Value::Bool(flag)) => *flag,
		Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
		Some(Value::Array(_) | Value::Object(_)) => true,
	}
}

/// Fails with [`ValidationError::HoneypotTriggered`] when the decoy field is filled.
pub fn check_honeypot(value: Option<&Value>) -> Result<(), ValidationError> {
	if honeypot_triggered(value) { Err(ValidationError::HoneypotTriggered) } else { Ok(()) }
}

/// Normalized record ready for the CRM upsert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactRecord {
	/// Deduplication key; always equals the submitted email.
	pub primary_key: String,
	/// Canonical field values, including `Email`, `Lead_Source`, and `Account_Name`.
	pub fields: BTreeMap<CanonicalField, String>,
	/// Entries that did not map to a canonical field, keyed by their original names.
	pub overflow: JsonMap<String, Value>,
}
impl ContactRecord {
	/// Returns the value stored for `field`, if any.
	pub fn get(&self, field: CanonicalField) -> Option<&str> {
		self.fields.get(&field).map(String::as_str)
	}
}
impl Serialize for ContactRecord {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.collect_map(self.fields.iter().map(|(field, value)| (field.as_str(), value)))
	}
}

/// Turns `(email, attributes)` submissions into [`ContactRecord`]s.
#[derive(Clone, Debug)]
pub struct RecordMapper {
	default_lead_source: String,
}
impl RecordMapper {
	/// Creates a mapper that falls back to `default_lead_source` for `Lead_Source`.
	pub fn new(default_lead_source: impl Into<String>) -> Self {
		let default_lead_source = default_lead_source.into();
		let default_lead_source = if default_lead_source.trim().is_empty() {
			DEFAULT_LEAD_SOURCE.to_owned()
		} else {
			default_lead_source
		};

		Self { default_lead_source }
	}

	/// Lead source applied when the submission does not carry one.
	pub fn default_lead_source(&self) -> &str {
		&self.default_lead_source
	}

	/// Validates the submission and maps it into a record.
	///
	/// The email is checked first, then the attribute bag, which must be a mapping or `null`.
	/// Mapping is pure: the same input always yields the same record.
	pub fn build_record(
		&self,
		primary_key: &str,
		attributes: &Value,
	) -> Result<ContactRecord, ValidationError> {
		validate_email(primary_key)?;

		let empty = JsonMap::new();
		let attributes = match attributes {
			Value::Null => &empty,
			Value::Object(map) => map,
			_ => return Err(ValidationError::AttributesNotObject),
		};
		let mut fields = BTreeMap::new();
		let mut overflow = JsonMap::new();
		let mut notes = Vec::new();
		let mut full_name = None;

		for (key, value) in attributes {
			if value.is_null() {
				continue;
			}

			let Some(target) = alias::lookup(key) else {
				overflow.insert(key.clone(), value.clone());

				continue;
			};
			let Some(text) = scalar_text(value) else {
				overflow.insert(key.clone(), value.clone());

				continue;
			};

			match target {
				AliasTarget::PrimaryKey => {},
				AliasTarget::FullName if text.trim().is_empty() => {},
				AliasTarget::FullName =>
					if full_name.is_none() {
						full_name = Some((key.clone(), value.clone(), text));
					} else {
						overflow.insert(key.clone(), value.clone());
					},
				AliasTarget::Field(CanonicalField::Description) =>
					if !text.trim().is_empty() {
						notes.push(text);
					},
				AliasTarget::Field(field) => {
					fields.insert(field, text);
				},
			}
		}

		if let Some((key, original, name)) = full_name {
			if is_blank(&fields, CanonicalField::LastName) {
				split_full_name(&mut fields, &name);
			} else {
				overflow.insert(key, original);
			}
		}
		if is_blank(&fields, CanonicalField::AccountName) {
			fields.insert(CanonicalField::AccountName, ACCOUNT_PLACEHOLDER.to_owned());
		}
		if is_blank(&fields, CanonicalField::LeadSource) {
			fields.insert(CanonicalField::LeadSource, self.default_lead_source.clone());
		}

		if let Some(description) = compose_description(&notes, &overflow) {
			fields.insert(CanonicalField::Description, description);
		}

		fields.insert(CanonicalField::Email, primary_key.to_owned());

		Ok(ContactRecord { primary_key: primary_key.to_owned(), fields, overflow })
	}
}
impl Default for RecordMapper {
	fn default() -> Self {
		Self::new(DEFAULT_LEAD_SOURCE)
	}
}

/// Extracts the overflow bag from a `Description` produced by [`RecordMapper`].
pub fn parse_overflow(description: &str) -> Option<JsonMap<String, Value>> {
	let (_, serialized) = description.rsplit_once(OVERFLOW_LABEL)?;

	serde_json::from_str(serialized.trim()).ok()
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		Value::Null | Value::Array(_) | Value::Object(_) => None,
	}
}

fn is_blank(fields: &BTreeMap<CanonicalField, String>, field: CanonicalField) -> bool {
	fields.get(&field).is_none_or(|value| value.trim().is_empty())
}

// First token becomes the first name (unless one was supplied); the remainder becomes the last
// name, or the first token again when nothing remains.
fn split_full_name(fields: &mut BTreeMap<CanonicalField, String>, name: &str) {
	let mut parts = name.split_whitespace();
	let Some(first) = parts.next() else { return };
	let rest = parts.collect::<Vec<_>>().join(" ");

	if is_blank(fields, CanonicalField::FirstName) {
		fields.insert(CanonicalField::FirstName, first.to_owned());
	}

	let last = if rest.is_empty() { first.to_owned() } else { rest };

	fields.insert(CanonicalField::LastName, last);
}

fn compose_description(notes: &[String], overflow: &JsonMap<String, Value>) -> Option<String> {
	let text = notes.join("\n");

	if overflow.is_empty() {
		return (!text.is_empty()).then_some(text);
	}

	let serialized = serde_json::to_string(overflow).ok()?;
	let section = format!("{OVERFLOW_LABEL}\n{serialized}");

	if text.is_empty() { Some(section) } else { Some(format!("{text}\n\n{section}")) }
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn map(attributes: Value) -> ContactRecord {
		RecordMapper::default()
			.build_record("jane@example.com", &attributes)
			.expect("Submission should map.")
	}

	#[test]
	fn email_validation_matches_address_shape() {
		assert!(is_plausible_email("jane@example.com"));
		assert!(is_plausible_email("a.b+tag@sub.example.co"));
		assert!(!is_plausible_email(""));
		assert!(!is_plausible_email("not-an-email"));
		assert!(!is_plausible_email("jane@example"));
		assert!(!is_plausible_email("jane doe@example.com"));
		assert!(!is_plausible_email("jane@@example.com"));
	}

	#[test]
	fn honeypot_treats_falsy_values_as_empty() {
		assert!(!honeypot_triggered(None));
		assert!(!honeypot_triggered(Some(&Value::Null)));
		assert!(!honeypot_triggered(Some(&json!(""))));
		assert!(!honeypot_triggered(Some(&json!("   "))));
		assert!(!honeypot_triggered(Some(&json!(false))));
		assert!(!honeypot_triggered(Some(&json!(0))));
		assert!(honeypot_triggered(Some(&json!("x"))));
		assert!(honeypot_triggered(Some(&json!(true))));
		assert!(honeypot_triggered(Some(&json!(7))));
		assert!(honeypot_triggered(Some(&json!(["x"]))));
		assert_eq!(check_honeypot(Some(&json!("bot"))), Err(ValidationError::HoneypotTriggered));
	}

	#[test]
	fn invalid_email_is_checked_before_attributes() {
		let mapper = RecordMapper::default();

		assert_eq!(
			mapper.build_record("nope", &json!([1, 2])),
			Err(ValidationError::InvalidEmail)
		);
		assert_eq!(
			mapper.build_record("jane@example.com", &json!([1, 2])),
			Err(ValidationError::AttributesNotObject)
		);
		assert_eq!(
			mapper.build_record("jane@example.com", &json!("text")),
			Err(ValidationError::AttributesNotObject)
		);
	}

	#[test]
	fn null_attributes_produce_defaults_only() {
		let record = map(Value::Null);

		assert_eq!(record.primary_key, "jane@example.com");
		assert_eq!(record.get(CanonicalField::Email), Some("jane@example.com"));
		assert_eq!(record.get(CanonicalField::LeadSource), Some("Website"));
		assert_eq!(record.get(CanonicalField::AccountName), Some(ACCOUNT_PLACEHOLDER));
		assert_eq!(record.get(CanonicalField::Description), None);
		assert!(record.overflow.is_empty());
	}

	#[test]
	fn aliases_map_case_insensitively() {
		let record = map(json!({
			"firstname": "Jane",
			"LASTNAME": "Doe",
			"Company": "Acme",
			"phone": 5551234,
			"city": "Lisbon",
		}));

		assert_eq!(record.get(CanonicalField::FirstName), Some("Jane"));
		assert_eq!(record.get(CanonicalField::LastName), Some("Doe"));
		assert_eq!(record.get(CanonicalField::AccountName), Some("Acme"));
		assert_eq!(record.get(CanonicalField::Phone), Some("5551234"));
		assert_eq!(record.get(CanonicalField::MailingCity), Some("Lisbon"));
		assert!(record.overflow.is_empty());
	}

	#[test]
	fn attribute_email_never_overrides_primary_key() {
		let record = map(json!({ "EMAIL": "other@example.com", "email": "third@example.com" }));

		assert_eq!(record.get(CanonicalField::Email), Some("jane@example.com"));
		assert!(record.overflow.is_empty());
	}

	#[test]
	fn unknown_keys_overflow_into_description() {
		let record = map(json!({
			"FIRSTNAME": "Jane",
			"utm_campaign": "spring",
			"score": 42,
			"tags": ["a", "b"],
			"skip": null,
		}));
		let description =
			record.get(CanonicalField::Description).expect("Overflow should populate Description.");
		let parsed = parse_overflow(description).expect("Overflow section should parse.");

		assert!(description.starts_with(OVERFLOW_LABEL));
		assert_eq!(parsed, record.overflow);
		assert_eq!(parsed.get("utm_campaign"), Some(&json!("spring")));
		assert_eq!(parsed.get("score"), Some(&json!(42)));
		assert_eq!(parsed.get("tags"), Some(&json!(["a", "b"])));
		assert!(!parsed.contains_key("skip"));
		assert!(!parsed.contains_key("FIRSTNAME"));
	}

	#[test]
	fn notes_are_appended_before_overflow() {
		let record = map(json!({
			"MESSAGE": "Call me.",
			"notes": "After 5pm.",
			"referrer": "newsletter",
		}));
		let description =
			record.get(CanonicalField::Description).expect("Description should be present.");

		assert!(description.starts_with("Call me.\nAfter 5pm.\n\nAdditional fields:\n"));
		assert_eq!(
			parse_overflow(description).and_then(|bag| bag.get("referrer").cloned()),
			Some(json!("newsletter"))
		);
	}

	#[test]
	fn structured_values_under_known_aliases_overflow() {
		let record = map(json!({ "PHONE": { "home": "1", "work": "2" } }));

		assert_eq!(record.get(CanonicalField::Phone), None);
		assert_eq!(record.overflow.get("PHONE"), Some(&json!({ "home": "1", "work": "2" })));
	}

	#[test]
	fn full_name_splits_when_last_name_missing() {
		let record = map(json!({ "name": "Jane Q. Doe" }));

		assert_eq!(record.get(CanonicalField::FirstName), Some("Jane"));
		assert_eq!(record.get(CanonicalField::LastName), Some("Q. Doe"));

		let single = map(json!({ "NAME": "Cher" }));

		assert_eq!(single.get(CanonicalField::FirstName), Some("Cher"));
		assert_eq!(single.get(CanonicalField::LastName), Some("Cher"));

		let keeps_first = map(json!({ "FIRSTNAME": "J.", "full_name": "Jane Doe" }));

		assert_eq!(keeps_first.get(CanonicalField::FirstName), Some("J."));
		assert_eq!(keeps_first.get(CanonicalField::LastName), Some("Doe"));
	}

	#[test]
	fn full_name_overflows_when_last_name_supplied() {
		let record = map(json!({ "LASTNAME": "Doe", "NAME": "Janet Smith" }));

		assert_eq!(record.get(CanonicalField::LastName), Some("Doe"));
		assert_eq!(record.get(CanonicalField::FirstName), None);
		assert_eq!(record.overflow.get("NAME"), Some(&json!("Janet Smith")));
	}

	#[test]
	fn lead_source_and_account_defaults_respect_input() {
		let record = RecordMapper::new("Landing Page")
			.build_record("jane@example.com", &json!({ "COMPANY": "  " }))
			.expect("Submission should map.");

		assert_eq!(record.get(CanonicalField::LeadSource), Some("Landing Page"));
		assert_eq!(record.get(CanonicalField::AccountName), Some(ACCOUNT_PLACEHOLDER));

		let explicit = map(json!({ "source": "Referral", "company": "Acme" }));

		assert_eq!(explicit.get(CanonicalField::LeadSource), Some("Referral"));
		assert_eq!(explicit.get(CanonicalField::AccountName), Some("Acme"));
		assert_eq!(RecordMapper::new("").default_lead_source(), DEFAULT_LEAD_SOURCE);
	}

	#[test]
	fn mapping_is_deterministic() {
		let attributes = json!({ "z": 1, "FIRSTNAME": "Jane", "a": true, "note": "hi" });
		let mapper = RecordMapper::default();
		let first = mapper.build_record("jane@example.com", &attributes);
		let second = mapper.build_record("jane@example.com", &attributes);

		assert_eq!(first, second);
	}

	#[test]
	fn record_serializes_with_crm_field_names() {
		let record = map(json!({ "FIRSTNAME": "Jane", "LASTNAME": "Doe" }));
		let rendered = serde_json::to_value(&record).expect("Record should serialize.");

		assert_eq!(rendered.as_object().map(JsonMap::len), Some(record.fields.len()));
		assert_eq!(rendered["Email"], "jane@example.com");
		assert_eq!(rendered["First_Name"], "Jane");
		assert_eq!(rendered["Last_Name"], "Doe");
		assert_eq!(rendered["Lead_Source"], "Website");
	}
}
