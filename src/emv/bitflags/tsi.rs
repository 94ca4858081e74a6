//! Transaction Status Information (tag `0x9B`, 2 bytes).
//!
//! Information for this can be found in EMV Book 3, under section `C6`.

use crate::bitflag_value;

bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TransactionStatusInformation: 2 {
	0 {
		pub offline_data_authentication_performed: bool = 0b1000_0000
			=> "Offline data authentication was performed",
		pub cardholder_verification_performed: bool =     0b0100_0000
			=> "Cardholder verification was performed",
		pub card_risk_management_performed: bool =        0b0010_0000
			=> "Card risk management was performed",
		pub issuer_authentication_performed: bool =       0b0001_0000
			=> "Issuer authentication was performed",
		pub terminal_risk_management_performed: bool =    0b0000_1000
			=> "Terminal risk management was performed",
		pub script_processing_performed: bool =           0b0000_0100
			=> "Script processing was performed",
	}
	1 {}
}
}

#[cfg(test)]
mod tests {
	use crate::{bitflag_unique_values, wrong_byte_count};

	wrong_byte_count!(super::TransactionStatusInformation, 2);
	bitflag_unique_values!(super::TransactionStatusInformation, 2);

	#[test]
	fn scenario_s4_terminal_risk_management_performed_bit() {
		let tsi =
			super::TransactionStatusInformation::try_from([0x08, 0x00].as_slice()).unwrap();
		assert!(tsi.terminal_risk_management_performed);
	}
}
