//! Component F: the risk manager - floor limit, random online selection,
//! and velocity checking (spec §4.F).

use crate::{
	crypto::CryptoRng,
	emv::{
		bitflags::{TerminalVerificationResults, TransactionStatusInformation},
		ttl::Ttl,
	},
	util::byte_slice_to_u32,
};

/// One entry from the terminal's offline transaction log, consulted by the
/// floor-limit check (spec §3 `TxnLogEntry`).
#[derive(Clone, Debug)]
pub struct TxnLogEntry {
	pub pan:                Vec<u8>,
	pub transaction_amount: u32,
}

/// The random-online-selection configuration a terminal carries per
/// application (spec §4.F).
#[derive(Copy, Clone, Debug)]
pub struct RandomSelectionConfig {
	pub percentage:     u8,
	pub max_percentage: u8,
	pub threshold:      u32,
}

/// Checks the transaction amount plus the latest log entry for the same
/// PAN against the floor limit (spec §4.F "Floor limit"). Returns the
/// summed amount used for the comparison - callers feeding it into random
/// selection use the raw transaction amount instead, per spec wording.
pub fn check_floor_limit(
	transaction_amount: u32,
	pan: &[u8],
	floor_limit: u32,
	log: &[TxnLogEntry],
	tvr: &mut TerminalVerificationResults,
) {
	let latest_matching = log.iter().rev().find(|entry| entry.pan == pan);
	let summed = transaction_amount.saturating_add(latest_matching.map_or(0, |entry| entry.transaction_amount));
	if summed >= floor_limit {
		tvr.txn_floor_limit_exceeded = true;
	}
}

/// Runs the piecewise-linear biased random-selection draw (EMV Book 3
/// figure 15, spec §4.F). Only called when `amount < floor_limit` and
/// `config.percentage > 0`; validates `percentage <= max_percentage <= 99`
/// and `threshold < floor_limit` before drawing.
pub fn random_online_selection(
	transaction_amount: u32,
	floor_limit: u32,
	config: &RandomSelectionConfig,
	rng: &mut impl CryptoRng,
	tvr: &mut TerminalVerificationResults,
) {
	if transaction_amount >= floor_limit || config.percentage == 0 {
		return;
	}
	if config.percentage > config.max_percentage || config.max_percentage > 99 {
		return;
	}
	if config.threshold >= floor_limit {
		return;
	}

	let draw = rng.byte_inclusive(1, 99);

	let selected = if transaction_amount < config.threshold {
		draw <= config.percentage
	} else {
		let numerator = (config.max_percentage - config.percentage) as u64
			* (transaction_amount - config.threshold) as u64;
		let denominator = (floor_limit - config.threshold) as u64;
		let target_percentage = config.percentage as u64 + numerator / denominator;
		(draw as u64) <= target_percentage
	};

	if selected {
		tvr.random_selected_online = true;
	}
}

/// Velocity-checks the card's Application Transaction Counter against its
/// consecutive-offline limits (spec §4.F "Velocity"). `9F14`/`9F23` are
/// each a single byte; if either is present, `get_atc`/`get_last_online_atc`
/// fetch tags `9F36`/`9F13` via `GET DATA`.
pub fn check_velocity(
	ttl: &mut impl Ttl,
	lower_consecutive_limit: Option<u8>,
	upper_consecutive_limit: Option<u8>,
	tvr: &mut TerminalVerificationResults,
) {
	if lower_consecutive_limit.is_none() && upper_consecutive_limit.is_none() {
		return;
	}

	let atc = read_counter(ttl, 0x9F36);
	let last_online_atc = read_counter(ttl, 0x9F13);

	let (Some(atc), Some(last_online_atc)) = (atc, last_online_atc) else {
		tvr.consecutive_offline_limit_lower_exceeded = true;
		tvr.consecutive_offline_limit_upper_exceeded = true;
		return;
	};

	if last_online_atc == 0 {
		tvr.new_card = true;
	}

	let consecutive = atc.saturating_sub(last_online_atc);
	if let Some(limit) = lower_consecutive_limit {
		if consecutive > limit as u32 {
			tvr.consecutive_offline_limit_lower_exceeded = true;
		}
	}
	if let Some(limit) = upper_consecutive_limit {
		if consecutive > limit as u32 {
			tvr.consecutive_offline_limit_upper_exceeded = true;
		}
	}
}

fn read_counter(ttl: &mut impl Ttl, tag: u32) -> Option<u32> {
	let (data, sw) = ttl.get_data(tag).ok()?;
	if sw != 0x9000 {
		return None;
	}
	byte_slice_to_u32(&data).ok()
}

/// Marks that terminal risk management ran (spec §4.F: set unconditionally
/// after any of the above checks).
pub fn mark_performed(tsi: &mut TransactionStatusInformation) {
	tsi.terminal_risk_management_performed = true;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fresh_tvr() -> TerminalVerificationResults {
		TerminalVerificationResults::try_from([0x00u8; 5].as_slice()).unwrap()
	}

	#[test]
	fn scenario_s4_floor_limit_exceeded() {
		let mut tvr = fresh_tvr();
		check_floor_limit(1024, &[0x12, 0x34], 1000, &[], &mut tvr);
		assert!(tvr.txn_floor_limit_exceeded);

		let mut tsi = TransactionStatusInformation::try_from([0x00, 0x00].as_slice()).unwrap();
		mark_performed(&mut tsi);
		assert!(tsi.terminal_risk_management_performed);
	}

	#[test]
	fn floor_limit_is_monotonic() {
		let mut low = fresh_tvr();
		check_floor_limit(500, &[], 1000, &[], &mut low);
		assert!(!low.txn_floor_limit_exceeded);

		let mut high = fresh_tvr();
		check_floor_limit(1500, &[], 1000, &[], &mut high);
		assert!(high.txn_floor_limit_exceeded);
	}

	#[test]
	fn floor_limit_adds_latest_matching_log_entry() {
		let mut tvr = fresh_tvr();
		let log = vec![
			TxnLogEntry {
				pan:                vec![0x12, 0x34],
				transaction_amount: 100,
			},
			TxnLogEntry {
				pan:                vec![0x12, 0x34],
				transaction_amount: 950,
			},
		];
		check_floor_limit(100, &[0x12, 0x34], 1000, &log, &mut tvr);
		assert!(tvr.txn_floor_limit_exceeded);
	}

	struct FixedRng(u8);
	impl CryptoRng for FixedRng {
		fn fill_bytes(&mut self, buf: &mut [u8]) {
			buf.fill(self.0);
		}

		fn byte_inclusive(&mut self, _min: u8, _max: u8) -> u8 {
			self.0
		}
	}

	#[test]
	fn random_selection_below_threshold_uses_flat_percentage() {
		let config = RandomSelectionConfig {
			percentage:     50,
			max_percentage: 90,
			threshold:      200,
		};
		let mut tvr = fresh_tvr();
		let mut rng = FixedRng(40);
		random_online_selection(100, 1000, &config, &mut rng, &mut tvr);
		assert!(tvr.random_selected_online);

		let mut tvr2 = fresh_tvr();
		let mut rng2 = FixedRng(60);
		random_online_selection(100, 1000, &config, &mut rng2, &mut tvr2);
		assert!(!tvr2.random_selected_online);
	}

	#[test]
	fn random_selection_above_threshold_scales_linearly() {
		// threshold=200, floor=1000, percentage=10, max=90; amount=600 is
		// halfway between threshold and floor -> target = 10 + (80*400)/800 = 50.
		let config = RandomSelectionConfig {
			percentage:     10,
			max_percentage: 90,
			threshold:      200,
		};
		let mut tvr = fresh_tvr();
		let mut rng = FixedRng(50);
		random_online_selection(600, 1000, &config, &mut rng, &mut tvr);
		assert!(tvr.random_selected_online);

		let mut tvr2 = fresh_tvr();
		let mut rng2 = FixedRng(51);
		random_online_selection(600, 1000, &config, &mut rng2, &mut tvr2);
		assert!(!tvr2.random_selected_online);
	}

	#[test]
	fn random_selection_skipped_at_or_above_floor_limit() {
		let config = RandomSelectionConfig {
			percentage:     50,
			max_percentage: 90,
			threshold:      200,
		};
		let mut tvr = fresh_tvr();
		let mut rng = FixedRng(1);
		random_online_selection(1000, 1000, &config, &mut rng, &mut tvr);
		assert!(!tvr.random_selected_online);
	}

	struct FakeTtl {
		atc:             u32,
		last_online_atc: u32,
	}

	impl Ttl for FakeTtl {
		fn select_by_df_name(&mut self, _df_name: &[u8]) -> crate::emv::ttl::TtlResult {
			Ok((Vec::new(), 0x9000))
		}

		fn select_by_df_name_next(&mut self, _df_name: &[u8]) -> crate::emv::ttl::TtlResult {
			Ok((Vec::new(), 0x9000))
		}

		fn read_record(&mut self, _sfi: u8, _record_number: u8) -> crate::emv::ttl::TtlResult {
			Ok((Vec::new(), 0x9000))
		}

		fn get_processing_options(&mut self, _data: &[u8]) -> crate::emv::ttl::TtlResult {
			Ok((Vec::new(), 0x9000))
		}

		fn get_data(&mut self, tag: u32) -> crate::emv::ttl::TtlResult {
			let value = match tag {
				0x9F36 => self.atc,
				0x9F13 => self.last_online_atc,
				_ => return Ok((Vec::new(), 0x6A88)),
			};
			Ok((value.to_be_bytes().to_vec(), 0x9000))
		}

		fn generate_ac(&mut self, _reference_control: u8, _data: &[u8]) -> crate::emv::ttl::TtlResult {
			Ok((Vec::new(), 0x9000))
		}
	}

	#[test]
	fn velocity_flags_consecutive_limit_exceeded() {
		let mut ttl = FakeTtl {
			atc:             10,
			last_online_atc: 2,
		};
		let mut tvr = fresh_tvr();
		check_velocity(&mut ttl, Some(5), Some(20), &mut tvr);
		assert!(tvr.consecutive_offline_limit_lower_exceeded);
		assert!(!tvr.consecutive_offline_limit_upper_exceeded);
	}

	#[test]
	fn velocity_flags_new_card_when_never_online() {
		let mut ttl = FakeTtl {
			atc:             1,
			last_online_atc: 0,
		};
		let mut tvr = fresh_tvr();
		check_velocity(&mut ttl, Some(5), Some(20), &mut tvr);
		assert!(tvr.new_card);
	}
}
