//! Two configuration concerns, deliberately kept apart (spec §6.4):
//!
//! - [`validate_terminal_config`]/[`validate_transaction_parameters`]/
//!   [`validate_supported_aids`] check the mandatory-field and
//!   fixed-length invariants a transaction-time `TlvList` must satisfy
//!   before an [`crate::emv::EmvContext`] is built from it.
//! - [`KernelConfig`] is the ambient, non-transactional settings layer -
//!   log verbosity hints, diagnostic masking, and which random-selection
//!   draw source to prefer - loaded via layered `figment` (`Serialized`
//!   defaults -> TOML file -> environment variables), `serde`-derived.

use figment::{
	providers::{Env, Format, Serialized, Toml},
	value::{Dict, Map},
	Error as FigmentError,
	Figment,
	Metadata,
	Profile,
	Provider,
};
use log::error;
use serde_derive::{Deserialize, Serialize};

use crate::{error::KernelError, tlv::AidMatchMode, tlv::TlvList};

const FILE_NAME: &str = "emvkernel.toml";
const ENV_PREFIX: &str = "EMVKERNEL_";
const ENV_FILE_NAME_OVERRIDE: &str = "CONFIG";
const ENV_PROFILE: &str = "PROFILE";

/// Checks the terminal configuration list carries every mandatory
/// fixed-length field spec §6.4 requires: `9F33` (3 bytes), `9F35` (1
/// byte), `9F40` (5 bytes), `9F1A` (2 bytes), `9F1B` (4 bytes), `9F09` (2
/// bytes), `9F49` (at least 2 bytes).
pub fn validate_terminal_config(config: &TlvList) -> Result<(), KernelError> {
	for (tag, expected_len) in [
		(0x9F33, 3),
		(0x9F35, 1),
		(0x9F40, 5),
		(0x9F1A, 2),
		(0x9F1B, 4),
		(0x9F09, 2),
	] {
		require_exact_length(config, tag, expected_len)?;
	}
	match config.find_value(0x9F49) {
		Some(value) if value.len() >= 2 => Ok(()),
		_ => {
			error!("mandatory tag 9F49 missing or shorter than 2 bytes");
			Err(KernelError::InvalidConfig)
		}
	}
}

/// Checks the transaction-parameters list carries `9C` (1 byte), `9A` (3
/// bytes), and `81` (4 bytes) (spec §6.4).
pub fn validate_transaction_parameters(parameters: &TlvList) -> Result<(), KernelError> {
	for (tag, expected_len) in [(0x9C, 1), (0x9A, 3), (0x81, 4)] {
		require_exact_length(parameters, tag, expected_len)?;
	}
	Ok(())
}

/// Checks every entry in the supported-AID list is `5..=16` bytes of AID
/// carrying a recognised one-byte match-mode flag (spec §6.4, §4.C).
pub fn validate_supported_aids(supported_aids: &TlvList) -> Result<(), KernelError> {
	for entry in supported_aids.iter() {
		if !(5..=16).contains(&entry.value.len()) {
			error!("supported AID {:02X?} is {} byte(s), outside 5..=16", entry.value, entry.value.len());
			return Err(KernelError::InvalidConfig);
		}
		AidMatchMode::try_from(entry.flags).map_err(|_| {
			error!("supported AID {:02X?} carries an unrecognised match-mode flag {:02X}", entry.value, entry.flags);
			KernelError::InvalidConfig
		})?;
	}
	Ok(())
}

fn require_exact_length(list: &TlvList, tag: u32, expected_len: usize) -> Result<(), KernelError> {
	match list.find_value(tag) {
		Some(value) if value.len() == expected_len => Ok(()),
		Some(value) => {
			error!("tag {tag:04X} present but {} byte(s), expected {expected_len}", value.len());
			Err(KernelError::InvalidConfig)
		}
		None => {
			error!("mandatory tag {tag:04X} missing from configuration");
			Err(KernelError::InvalidConfig)
		}
	}
}

/// Which source feeds the random-online-selection draw (spec §4.F).
/// `Deterministic` exists for reproducible test fixtures; production
/// kernels should leave this at the default.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum RandomSource {
	Cryptographic,
	Deterministic,
}

impl Default for RandomSource {
	fn default() -> Self {
		Self::Cryptographic
	}
}

/// Ambient kernel settings, orthogonal to any single transaction (spec
/// §6.4 "Ambient kernel configuration").
#[non_exhaustive]
#[derive(Deserialize, Serialize)]
pub struct KernelConfig {
	#[serde(skip)]
	pub profile:              Profile,
	/// Whether PAN and certificate bodies are masked in diagnostic log
	/// output.
	pub mask_sensitive_dumps: bool,
	pub random_source:        RandomSource,
}

impl Default for KernelConfig {
	fn default() -> Self {
		Self {
			profile:              Self::DEFAULT_PROFILE,
			mask_sensitive_dumps: true,
			random_source:        RandomSource::default(),
		}
	}
}

impl KernelConfig {
	pub const DEFAULT_PROFILE: Profile = Profile::const_new("default");
	pub const MASK_SENSITIVE_DUMPS: &'static str = "mask_sensitive_dumps";
	pub const PROFILE: &'static str = "profile";
	pub const RANDOM_SOURCE: &'static str = "random_source";

	/// Allows the configuration to be extracted from any [`Provider`].
	pub fn try_from<P>(provider: P) -> Result<Self, FigmentError>
	where
		P: Provider,
	{
		Figment::from(provider).extract()
	}

	/// `Serialized` defaults -> TOML file -> environment variables
	/// prefixed `EMVKERNEL_`, selecting a profile the same way the
	/// teacher's CLI config does.
	pub fn figment() -> Figment {
		Figment::from(Serialized::defaults(Self::default()))
			.merge(
				Toml::file(Env::var_or(
					format!("{}{}", ENV_PREFIX, ENV_FILE_NAME_OVERRIDE).as_str(),
					FILE_NAME,
				))
				.nested(),
			)
			.merge(
				Env::prefixed(ENV_PREFIX)
					.ignore(&[ENV_FILE_NAME_OVERRIDE, ENV_PROFILE])
					.global(),
			)
			.select(Profile::from_env_or(
				format!("{}{}", ENV_PREFIX, ENV_PROFILE).as_str(),
				Self::DEFAULT_PROFILE,
			))
	}
}

impl Provider for KernelConfig {
	fn metadata(&self) -> Metadata {
		Metadata::named("EMV Kernel Config")
	}

	fn data(&self) -> Result<Map<Profile, Dict>, FigmentError> {
		Serialized::defaults(self).data()
	}

	fn profile(&self) -> Option<Profile> {
		Some(self.profile.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tlv::TlvField;

	#[test]
	fn terminal_config_rejects_missing_mandatory_tag() {
		let config = TlvList::new();
		assert_eq!(validate_terminal_config(&config), Err(KernelError::InvalidConfig));
	}

	#[test]
	fn terminal_config_accepts_well_formed_list() {
		let mut config = TlvList::new();
		config.push(TlvField::new(0x9F33, vec![0x00; 3]));
		config.push(TlvField::new(0x9F35, vec![0x00]));
		config.push(TlvField::new(0x9F40, vec![0x00; 5]));
		config.push(TlvField::new(0x9F1A, vec![0x00; 2]));
		config.push(TlvField::new(0x9F1B, vec![0x00; 4]));
		config.push(TlvField::new(0x9F09, vec![0x00; 2]));
		config.push(TlvField::new(0x9F49, vec![0x9A, 0x03]));
		assert!(validate_terminal_config(&config).is_ok());
	}

	#[test]
	fn transaction_parameters_reject_wrong_length() {
		let mut parameters = TlvList::new();
		parameters.push(TlvField::new(0x9C, vec![0x00, 0x00]));
		assert_eq!(
			validate_transaction_parameters(&parameters),
			Err(KernelError::InvalidConfig)
		);
	}

	#[test]
	fn supported_aids_reject_unrecognised_flag() {
		let mut supported_aids = TlvList::new();
		supported_aids.push(TlvField::with_flags(0, vec![0xA0, 0x00, 0x00, 0x00, 0x03], 0xFF));
		assert_eq!(
			validate_supported_aids(&supported_aids),
			Err(KernelError::InvalidConfig)
		);
	}

	#[test]
	fn supported_aids_accept_valid_entry() {
		let mut supported_aids = TlvList::new();
		supported_aids.push(TlvField::with_flags(0, vec![0xA0, 0x00, 0x00, 0x00, 0x03], 0x01));
		assert!(validate_supported_aids(&supported_aids).is_ok());
	}

	#[test]
	fn kernel_config_default_masks_sensitive_dumps() {
		let config = KernelConfig::default();
		assert!(config.mask_sensitive_dumps);
		assert_eq!(config.random_source, RandomSource::Cryptographic);
	}
}
