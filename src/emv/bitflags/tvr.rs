//! Terminal Verification Results (tag `0x95`, 5 bytes).
//!
//! Information for this can be found in EMV Book 3, under section `C5`.
//! Every named bit from that annex is present even though the session
//! orchestrator only sets a handful of them during first-GENERATE-AC
//! processing (spec §4.G); the rest exist so a future Terminal Action
//! Analysis implementation (spec §9) has every bit available.

use crate::bitflag_value;

bitflag_value! {
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TerminalVerificationResults: 5 {
	0 {
		pub offline_data_authentication_not_performed: bool = 0b1000_0000
			=> "Offline data authentication was not performed",
		pub sda_failed: bool =                                0b0100_0000
			=> "SDA (Static Data Authentication) failed",
		pub icc_data_missing: bool =                          0b0010_0000
			=> "ICC data missing",
		pub terminal_card_exception: bool =                   0b0001_0000
			=> "Card appears on terminal exception file",
		pub dda_failed: bool =                                0b0000_1000
			=> "DDA (Dynamic Data Authentication) failed",
		pub cda_failed: bool =                                0b0000_0100
			=> "CDA (Combined Data Authentication) failed",
	}
	1 {
		pub icc_terminal_version_mismatch: bool = 0b1000_0000
			=> "ICC and terminal have different application versions",
		pub application_expired: bool =           0b0100_0000
			=> "Expired application",
		pub application_not_yet_effective: bool = 0b0010_0000
			=> "Application not yet effective",
		pub service_not_allowed: bool =            0b0001_0000
			=> "Requested service not allowed for card product",
		pub new_card: bool =                       0b0000_1000
			=> "New card",
	}
	2 {
		pub cardholder_verification_unsuccessful: bool = 0b1000_0000
			=> "Cardholder verification was not successful",
		pub unrecognized_cvm: bool =                     0b0100_0000
			=> "Unrecognised CVM (Cardholder Verification Method)",
		pub pin_try_limit_exceeded: bool =               0b0010_0000
			=> "PIN try limit exceeded",
		pub pin_entry_required_but_no_pinpad: bool =     0b0001_0000
			=> "PIN entry required and PIN pad not present or not working",
		pub pin_entry_required_but_no_entry: bool =      0b0000_1000
			=> "PIN entry required, PIN pad present, but PIN was not entered",
		pub online_pin_entered: bool =                   0b0000_0100
			=> "Online PIN entered",
	}
	3 {
		pub txn_floor_limit_exceeded: bool =                   0b1000_0000
			=> "Transaction exceeds floor limit",
		pub consecutive_offline_limit_lower_exceeded: bool =   0b0100_0000
			=> "Lower consecutive offline limit exceeded",
		pub consecutive_offline_limit_upper_exceeded: bool =   0b0010_0000
			=> "Upper consecutive offline limit exceeded",
		pub random_selected_online: bool =                     0b0001_0000
			=> "Transaction selected randomly for online processing",
		pub merchant_forced_transaction_online: bool =         0b0000_1000
			=> "Merchant forced transaction online",
	}
	4 {
		pub default_tdol_used: bool =                            0b1000_0000
			=> "Default TDOL (Transaction Certificate Data Object List) used",
		pub issuer_authentication_failed: bool =                 0b0100_0000
			=> "Issuer authentication failed",
		pub script_processing_failed_before_final_gen_ac: bool = 0b0010_0000
			=> "Script processing failed before final GENERATE AC",
		pub script_processing_failed_after_final_gen_ac: bool =  0b0001_0000
			=> "Script processing failed after final GENERATE AC",
	}
}
}

#[cfg(test)]
mod tests {
	use crate::{bitflag_unique_values, wrong_byte_count};

	wrong_byte_count!(super::TerminalVerificationResults, 5);
	bitflag_unique_values!(super::TerminalVerificationResults, 5);

	#[test]
	fn scenario_s4_floor_limit_exceeded_bit() {
		let tvr = super::TerminalVerificationResults::try_from(
			[0x00, 0x00, 0x00, 0x80, 0x00].as_slice(),
		)
		.unwrap();
		assert!(tvr.txn_floor_limit_exceeded);
	}

	#[test]
	fn scenario_s7_application_expired_bit() {
		let tvr = super::TerminalVerificationResults::try_from(
			[0x00, 0x40, 0x00, 0x00, 0x00].as_slice(),
		)
		.unwrap();
		assert!(tvr.application_expired);
	}
}
