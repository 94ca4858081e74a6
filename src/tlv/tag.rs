//! EMV tag metadata: a name lookup for diagnostics, and the data-element
//! format classification the DOL builder needs to pick a truncation/padding
//! rule (spec §4.B).
//!
//! The name table follows the same `process_emv_tag`/`identify_tag` shape
//! used elsewhere for tag metadata lookups, and the format classification
//! follows `artemist-emvsign`'s `ElementType`/`ELEMENTS` map
//! (`other_examples/178a034f_...tlv-elements.rs.rs`) - the field this
//! kernel actually needs to act on.

/// The EMV data element format a tag's value is encoded in (EMV Book 3
/// annex B). Only the formats relevant to the DOL builder's truncation
/// rule are distinguished; `Binary`/`Template` share a rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementFormat {
	/// `n` - numeric, BCD digits.
	Numeric,
	/// `cn` - compressed numeric, left-justified BCD padded with `0xF`.
	CompressedNumeric,
	/// `a`/`an`/`ans` - alphabetic/alphanumeric/alphanumeric-special.
	Alphanumeric,
	/// `b` - binary, or a constructed template.
	Binary,
}

/// Looks up the wire format of a well-known EMV tag, for use by the DOL
/// builder (spec §4.B). Unknown tags default to [`ElementFormat::Binary`],
/// matching the "if not found, treat conservatively" posture the spec's
/// truncation rule implies for data sources outside the catalog.
pub fn element_format(tag: u32) -> ElementFormat {
	use ElementFormat::{Alphanumeric, Binary, CompressedNumeric, Numeric};

	match tag {
		0x5A => CompressedNumeric,
		0x5F2A | 0x5F36 | 0x9F02 | 0x9F03 | 0x9C => Numeric,
		0x9A => Numeric,
		0x50 | 0x9F12 | 0x5F20 | 0x5F2D => Alphanumeric,
		_ => Binary,
	}
}

/// Looks up a human-readable name for a well-known EMV tag, for logging
/// and diagnostics only - never for control flow (spec §1).
pub fn identify_tag(tag: u32) -> Option<&'static str> {
	Some(match tag {
		0x42 => "Issuer Identification Number (IIN)",
		0x4F => "Application Dedicated File (ADF) Name",
		0x50 => "Application Label",
		0x56 => "Track 1 Data",
		0x57 => "Track 2 Equivalent Data",
		0x5A => "Application Primary Account Number (PAN)",
		0x61 => "Application Template",
		0x6F => "File Control Information (FCI) Template",
		0x70 => "READ RECORD Response Message Template",
		0x71 => "Issuer Script Template 1",
		0x72 => "Issuer Script Template 2",
		0x73 => "Directory Discretionary Template",
		0x77 => "Response Message Template Format 2",
		0x80 => "Response Message Template Format 1",
		0x81 => "Amount, Authorised (Binary)",
		0x82 => "Application Interchange Profile",
		0x83 => "Command Template",
		0x84 => "Dedicated File (DF) Name",
		0x86 => "Issuer Script Command",
		0x87 => "Application Priority Indicator",
		0x88 => "Short File Identifier (SFI)",
		0x8A => "Authorisation Response Code",
		0x8C => "Card Risk Management Data Object List 1 (CDOL1)",
		0x8D => "Card Risk Management Data Object List 2 (CDOL2)",
		0x8E => "Cardholder Verification Method (CVM) List",
		0x8F => "Certification Authority Public Key Index",
		0x90 => "Issuer Public Key Certificate",
		0x91 => "Issuer Authentication Data",
		0x92 => "Issuer Public Key Remainder",
		0x93 => "Signed Static Application Data",
		0x94 => "Application File Locator (AFL)",
		0x95 => "Terminal Verification Results",
		0x9A => "Transaction Date",
		0x9B => "Transaction Status Information",
		0x9C => "Transaction Type",
		0x9F02 => "Amount, Authorised (Numeric)",
		0x9F03 => "Amount, Other (Numeric)",
		0x9F06 => "Application Identifier (AID) - terminal",
		0x9F07 => "Application Usage Control",
		0x9F08 => "Application Version Number - ICC",
		0x9F09 => "Application Version Number - terminal",
		0x9F0D => "Issuer Action Code - Default",
		0x9F0E => "Issuer Action Code - Denial",
		0x9F0F => "Issuer Action Code - Online",
		0x9F10 => "Issuer Application Data",
		0x9F12 => "Application Preferred Name",
		0x9F13 => "Last Online Application Transaction Counter (ATC) Register",
		0x9F14 => "Lower Consecutive Offline Limit",
		0x9F1A => "Terminal Country Code",
		0x9F1B => "Terminal Floor Limit",
		0x9F23 => "Upper Consecutive Offline Limit",
		0x9F26 => "Application Cryptogram",
		0x9F27 => "Cryptogram Information Data",
		0x9F32 => "Issuer Public Key Exponent",
		0x9F33 => "Terminal Capabilities",
		0x9F35 => "Terminal Type",
		0x9F36 => "Application Transaction Counter (ATC)",
		0x9F37 => "Unpredictable Number",
		0x9F38 => "Processing Options Data Object List (PDOL)",
		0x9F39 => "Point-of-Service (POS) Entry Mode",
		0x9F40 => "Additional Terminal Capabilities",
		0x9F45 => "Data Authentication Code",
		0x9F46 => "ICC Public Key Certificate",
		0x9F47 => "ICC Public Key Exponent",
		0x9F48 => "ICC Public Key Remainder",
		0x9F49 => "Dynamic Data Authentication Data Object List (DDOL)",
		0x9F4A => "Static Data Authentication Tag List",
		0x9F4B => "Signed Dynamic Application Data",
		0x9F4C => "ICC Dynamic Number",
		0x5F24 => "Application Expiration Date",
		0x5F25 => "Application Effective Date",
		0x5F28 => "Issuer Country Code",
		0x5F2A => "Transaction Currency Code",
		0x5F2D => "Language Preference",
		0x5F20 => "Cardholder Name",
		_ => return None,
	})
}
