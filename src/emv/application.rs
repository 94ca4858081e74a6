//! Component C: the per-candidate [`Application`] object and the
//! [`ApplicationList`] the Terminal Application Layer builds during
//! discovery (spec §4.C).

use crate::{
	error::ParseError,
	tlv::{AidMatchMode, TlvField, TlvList},
};

/// Converts an ISO 8859 code-table-encoded byte string to UTF-8. A real
/// terminal wires up every code table 1..=10; this kernel treats the
/// conversion itself as an external collaborator (spec §1) and only
/// validates the code table index against what the terminal claims to
/// support.
pub trait Iso8859Converter {
	fn convert(&self, code_table: u8, bytes: &[u8]) -> Result<String, ParseError>;
}

/// A conversion that only accepts 7-bit ASCII, valid for every ISO 8859
/// code table page since they agree on the ASCII range. Sufficient for
/// card data in practice and avoids pulling in a dedicated codec crate for
/// a feature spec §1 marks as consumed, not implemented, here.
#[derive(Copy, Clone, Debug, Default)]
pub struct AsciiSubsetConverter;

impl Iso8859Converter for AsciiSubsetConverter {
	fn convert(&self, _code_table: u8, bytes: &[u8]) -> Result<String, ParseError> {
		if !bytes.is_ascii() {
			return Err(ParseError::Unsupported);
		}
		Ok(String::from_utf8_lossy(bytes).into_owned())
	}
}

/// A single candidate application discovered via PSE or AID probing (spec
/// §3, §4.C).
#[derive(Clone, Debug)]
pub struct Application {
	pub aid:                   Vec<u8>,
	pub display_name:          String,
	pub priority:              u8,
	pub confirmation_required: bool,
	pub tlv_list:              TlvList,
}

fn is_acceptable_label_byte(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || byte == b' '
}

impl Application {
	/// Builds an `Application` from a PSE Application Template (tag `61`)
	/// or a SELECT FCI Template (tag `6F`) whose children have already
	/// been flattened into `tlv_list` by the BER-TLV parser.
	///
	/// `supported_code_tables` lists the Issuer Code Table Index values
	/// (tag `9F11`) the terminal can render; `converter` performs the
	/// actual ISO 8859 -> UTF-8 conversion once the index is validated.
	pub fn from_tlv_list(
		tlv_list: TlvList,
		supported_code_tables: &[u8],
		converter: &dyn Iso8859Converter,
	) -> Result<Self, ParseError> {
		let aid = tlv_list
			.find_value(0x4F)
			.or_else(|| tlv_list.find_value(0x84))
			.ok_or(ParseError::NonCompliant)?
			.to_vec();
		if !(5..=16).contains(&aid.len()) {
			return Err(ParseError::NonCompliantValue);
		}

		let display_name = Self::derive_display_name(&tlv_list, &aid, supported_code_tables, converter)?;

		let (priority, confirmation_required) = match tlv_list.find_value(0x87) {
			Some(value) if value.len() == 1 => (value[0] & 0x0F, value[0] & 0x80 != 0),
			Some(_) => return Err(ParseError::NonCompliantValue),
			None => (0, false),
		};

		Ok(Self {
			aid,
			display_name,
			priority,
			confirmation_required,
			tlv_list,
		})
	}

	fn derive_display_name(
		tlv_list: &TlvList,
		aid: &[u8],
		supported_code_tables: &[u8],
		converter: &dyn Iso8859Converter,
	) -> Result<String, ParseError> {
		// 1. Application Preferred Name (9F12), gated on a supported code
		// table index (9F11).
		if let Some(preferred_name) = tlv_list.find_value(0x9F12) {
			let code_table = tlv_list
				.find_value(0x9F11)
				.and_then(|value| value.first().copied());
			if let Some(code_table) = code_table {
				if supported_code_tables.contains(&code_table) {
					if let Ok(name) = converter.convert(code_table, preferred_name) {
						return Ok(name);
					}
				}
			}
		}

		// 2. Application Label (50), restricted to a-zA-Z0-9 and space.
		if let Some(label) = tlv_list.find_value(0x50) {
			if label.iter().all(|&byte| is_acceptable_label_byte(byte)) {
				return Ok(String::from_utf8_lossy(label).trim_end().to_string());
			}
		}

		// 3. AID as uppercase hexadecimal.
		Ok(aid.iter().map(|byte| format!("{byte:02X}")).collect())
	}
}

/// Whether `candidate` matches a supported-AID entry per its
/// [`AidMatchMode`] (spec §4.C).
pub fn aid_matches(entry: &TlvField, candidate: &[u8]) -> bool {
	match AidMatchMode::try_from(entry.flags) {
		Ok(AidMatchMode::Exact) => entry.value == candidate,
		Ok(AidMatchMode::Partial) => candidate.starts_with(entry.value.as_slice()),
		Err(_) => false,
	}
}

/// An ordered list of [`Application`] candidates (spec §3, §4.C).
#[derive(Clone, Debug, Default)]
pub struct ApplicationList {
	applications: Vec<Application>,
}

impl ApplicationList {
	pub fn new() -> Self {
		Self {
			applications: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.applications.len()
	}

	pub fn is_empty(&self) -> bool {
		self.applications.is_empty()
	}

	pub fn push_back(&mut self, application: Application) {
		self.applications.push(application);
	}

	pub fn pop_front(&mut self) -> Option<Application> {
		if self.applications.is_empty() {
			None
		} else {
			Some(self.applications.remove(0))
		}
	}

	pub fn remove(&mut self, index: usize) -> Application {
		self.applications.remove(index)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Application> {
		self.applications.iter()
	}

	/// Stable sort ascending by priority, treating `0` (unassigned) as
	/// greater than `15` - the lowest priority (spec §3, §4.C, §8 property
	/// 3).
	pub fn sort_by_priority(&mut self) {
		self.applications.sort_by_key(|application| {
			if application.priority == 0 {
				16
			} else {
				application.priority
			}
		});
	}

	/// Keeps only the applications whose AID matches one of the supported
	/// AID entries (spec §4.C).
	pub fn filter_by_supported_aids(&mut self, supported_aids: &TlvList) {
		self.applications
			.retain(|application| supported_aids.iter().any(|entry| aid_matches(entry, &application.aid)));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tlv::TlvField;

	fn minimal_fci(aid: &[u8]) -> TlvList {
		let mut list = TlvList::new();
		list.push(TlvField::new(0x4F, aid.to_vec()));
		list
	}

	#[test]
	fn display_name_falls_back_to_hex_aid() {
		let aid = [0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];
		let application =
			Application::from_tlv_list(minimal_fci(&aid), &[], &AsciiSubsetConverter).unwrap();
		assert_eq!(application.display_name, "A0000000031010");
	}

	#[test]
	fn priority_high_bit_is_confirmation_required() {
		let aid = [0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];
		let mut list = minimal_fci(&aid);
		list.push(TlvField::new(0x87, vec![0x85]));
		let application = Application::from_tlv_list(list, &[], &AsciiSubsetConverter).unwrap();
		assert_eq!(application.priority, 5);
		assert!(application.confirmation_required);
	}

	#[test]
	fn sort_treats_zero_priority_as_lowest() {
		let aid = [0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];
		let mut list = ApplicationList::new();
		let mut zero_priority = minimal_fci(&aid);
		zero_priority.push(TlvField::new(0x87, vec![0x00]));
		let mut high_priority = minimal_fci(&aid);
		high_priority.push(TlvField::new(0x87, vec![0x01]));

		list.push_back(Application::from_tlv_list(zero_priority, &[], &AsciiSubsetConverter).unwrap());
		list.push_back(Application::from_tlv_list(high_priority, &[], &AsciiSubsetConverter).unwrap());
		list.sort_by_priority();

		let priorities: Vec<u8> = list.iter().map(|app| app.priority).collect();
		assert_eq!(priorities, vec![1, 0]);
	}
}
