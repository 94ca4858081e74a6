//! Application Interchange Profile (tag `0x82`, 2 bytes).
//!
//! Information for this can be found in EMV Book 3, under section `C3`.
//! The distilled spec only consumed this as a raw byte pair for ODA method
//! selection (spec §4.E); it's modeled here as a typed bitflag value like
//! every other fixed-format tag (SPEC_FULL "Supplemented features"), and
//! [`crate::emv::oda::select_method`] reads it directly.

use crate::bitflag_value;

bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ApplicationInterchangeProfile: 2 {
	0 {
		pub sda_supported: bool =                      0b1000_0000 => "SDA supported",
		pub dda_supported: bool =                      0b0100_0000 => "DDA supported",
		pub cardholder_verification_supported: bool =  0b0010_0000
			=> "Cardholder verification is supported",
		pub terminal_risk_management_required: bool =  0b0001_0000
			=> "Terminal risk management is to be performed",
		pub issuer_authentication_supported: bool =    0b0000_1000
			=> "Issuer authentication is supported",
		pub cda_supported: bool =                      0b0000_0010 => "CDA supported",
	}
	1 {}
}
}

#[cfg(test)]
mod tests {
	use crate::{bitflag_unique_values, wrong_byte_count};

	wrong_byte_count!(super::ApplicationInterchangeProfile, 2);
	bitflag_unique_values!(super::ApplicationInterchangeProfile, 2);

	#[test]
	fn scenario_s3_gpo_format_1_aip() {
		// AIP 32 80: 0x32 = 0011_0010 -> cardholder verification and
		// terminal risk management bits set, plus the CDA bit.
		let aip = super::ApplicationInterchangeProfile::try_from([0x32, 0x80].as_slice())
			.unwrap();
		assert!(aip.cardholder_verification_supported);
		assert!(aip.terminal_risk_management_required);
		assert!(aip.cda_supported);
		assert!(!aip.sda_supported);
		assert!(!aip.dda_supported);
	}
}
