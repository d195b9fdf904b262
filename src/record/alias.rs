//! Explicit alias table mapping caller-supplied attribute keys onto CRM fields.

// self
use crate::_prelude::*;

/// Fixed schema attribute recognized by the CRM `Contacts` module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
	/// `Email`; always the submission's primary key.
	Email,
	/// `First_Name`.
	FirstName,
	/// `Last_Name`.
	LastName,
	/// `Phone`.
	Phone,
	/// `Mobile`.
	Mobile,
	/// `Account_Name`; never empty.
	AccountName,
	/// `Title`.
	Title,
	/// `Department`.
	Department,
	/// `Mailing_Street`.
	MailingStreet,
	/// `Mailing_City`.
	MailingCity,
	/// `Mailing_State`.
	MailingState,
	/// `Mailing_Zip`.
	MailingZip,
	/// `Mailing_Country`.
	MailingCountry,
	/// `Lead_Source`; never empty.
	LeadSource,
	/// `Description`; append-only free text plus the overflow section.
	Description,
}
impl CanonicalField {
	/// Returns the CRM API name of the field.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Email => "Email",
			Self::FirstName => "First_Name",
			Self::LastName => "Last_Name",
			Self::Phone => "Phone",
			Self::Mobile => "Mobile",
			Self::AccountName => "Account_Name",
			Self::Title => "Title",
			Self::Department => "Department",
			Self::MailingStreet => "Mailing_Street",
			Self::MailingCity => "Mailing_City",
			Self::MailingState => "Mailing_State",
			Self::MailingZip => "Mailing_Zip",
			Self::MailingCountry => "Mailing_Country",
			Self::LeadSource => "Lead_Source",
			Self::Description => "Description",
		}
	}
}
impl Display for CanonicalField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What an attribute key resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasTarget {
	/// Value is written into a canonical field.
	Field(CanonicalField),
	/// Value is a full name split into first/last name when no last name is supplied.
	FullName,
	/// Value duplicates the primary key; the validated primary key always wins.
	PrimaryKey,
}

const ALIASES: &[(&str, AliasTarget)] = {
	use AliasTarget::{Field, FullName, PrimaryKey};
	use CanonicalField::*;

	&[
		("EMAIL", PrimaryKey),
		("E_MAIL", PrimaryKey),
		("FIRSTNAME", Field(FirstName)),
		("FIRST_NAME", Field(FirstName)),
		("FNAME", Field(FirstName)),
		("GIVEN_NAME", Field(FirstName)),
		("LASTNAME", Field(LastName)),
		("LAST_NAME", Field(LastName)),
		("LNAME", Field(LastName)),
		("SURNAME", Field(LastName)),
		("FAMILY_NAME", Field(LastName)),
		("NAME", FullName),
		("FULLNAME", FullName),
		("FULL_NAME", FullName),
		("PHONE", Field(Phone)),
		("TELEPHONE", Field(Phone)),
		("SMS", Field(Phone)),
		("MOBILE", Field(Mobile)),
		("CELL", Field(Mobile)),
		("COMPANY", Field(AccountName)),
		("COMPANY_NAME", Field(AccountName)),
		("ACCOUNT_NAME", Field(AccountName)),
		("ORGANIZATION", Field(AccountName)),
		("TITLE", Field(Title)),
		("JOB_TITLE", Field(Title)),
		("DEPARTMENT", Field(Department)),
		("ADDRESS", Field(MailingStreet)),
		("STREET", Field(MailingStreet)),
		("CITY", Field(MailingCity)),
		("STATE", Field(MailingState)),
		("PROVINCE", Field(MailingState)),
		("ZIP", Field(MailingZip)),
		("ZIPCODE", Field(MailingZip)),
		("ZIP_CODE", Field(MailingZip)),
		("POSTCODE", Field(MailingZip)),
		("POSTAL_CODE", Field(MailingZip)),
		("COUNTRY", Field(MailingCountry)),
		("LEAD_SOURCE", Field(LeadSource)),
		("SOURCE", Field(LeadSource)),
		("NOTE", Field(Description)),
		("NOTES", Field(Description)),
		("MESSAGE", Field(Description)),
		("COMMENT", Field(Description)),
		("COMMENTS", Field(Description)),
		("DESCRIPTION", Field(Description)),
	]
};

/// Resolves an attribute key, ignoring case and treating `-` and spaces as `_`.
///
/// The table is scanned in order and the first matching alias wins.
pub fn lookup(key: &str) -> Option<AliasTarget> {
	let normalized: String = key
		.trim()
		.chars()
		.map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
		.collect();

	ALIASES.iter().find(|(alias, _)| *alias == normalized).map(|(_, target)| *target)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn lookup_is_case_insensitive() {
		assert_eq!(lookup("first_name"), Some(AliasTarget::Field(CanonicalField::FirstName)));
		assert_eq!(lookup("FirstName"), Some(AliasTarget::Field(CanonicalField::FirstName)));
		assert_eq!(lookup("Company"), Some(AliasTarget::Field(CanonicalField::AccountName)));
		assert_eq!(lookup("city"), Some(AliasTarget::Field(CanonicalField::MailingCity)));
		assert_eq!(lookup("Message"), Some(AliasTarget::Field(CanonicalField::Description)));
	}

	#[test]
	fn lookup_normalizes_separators() {
		assert_eq!(lookup(" last-name "), Some(AliasTarget::Field(CanonicalField::LastName)));
		assert_eq!(lookup("postal code"), Some(AliasTarget::Field(CanonicalField::MailingZip)));
	}

	#[test]
	fn special_targets_resolve() {
		assert_eq!(lookup("name"), Some(AliasTarget::FullName));
		assert_eq!(lookup("EMAIL"), Some(AliasTarget::PrimaryKey));
		assert_eq!(lookup("utm_campaign"), None);
	}

	#[test]
	fn aliases_are_unique_and_uppercase() {
		for (idx, (alias, _)) in ALIASES.iter().enumerate() {
			assert_eq!(*alias, alias.to_ascii_uppercase());
			assert!(
				ALIASES[idx + 1..].iter().all(|(other, _)| other != alias),
				"Alias `{alias}` is listed twice."
			);
		}
	}
}
