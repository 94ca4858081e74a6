//! The Terminal Transport Layer contract (spec §6.1) - the one collaborator
//! every TAL operation calls through. APDU marshalling itself is out of
//! scope for this kernel (spec §1); the trait is the full interface a
//! caller must implement.

/// The maximum R-APDU data length ISO 7816 allows (`EMV_RAPDU_DATA_MAX`,
/// spec §6.1).
pub const RAPDU_DATA_MAX: usize = 255;

/// A transport-level failure: a TTL call that could not complete at all
/// (as opposed to a completed exchange carrying a non-9000 SW1SW2). Always
/// terminates the session with `Outcome::CardError` (spec §7).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransportFailure;

/// The result of one APDU exchange: response data plus the two-byte status
/// word, or a [`TransportFailure`].
pub type TtlResult = Result<(Vec<u8>, u16), TransportFailure>;

/// The six operations the Terminal Application Layer issues through the
/// Terminal Transport Layer (spec §6.1).
pub trait Ttl {
	/// `SELECT` by DF name, first occurrence.
	fn select_by_df_name(&mut self, df_name: &[u8]) -> TtlResult;
	/// `SELECT` by DF name, next occurrence (cursor mode), for AID probing
	/// of partial-match applications (spec §4.D.2).
	fn select_by_df_name_next(&mut self, df_name: &[u8]) -> TtlResult;
	/// `READ RECORD` for one record of one SFI.
	fn read_record(&mut self, sfi: u8, record_number: u8) -> TtlResult;
	/// `GET PROCESSING OPTIONS`, given the PDOL-built command data
	/// (already wrapped in tag `83`).
	fn get_processing_options(&mut self, data: &[u8]) -> TtlResult;
	/// `GET DATA` for a single tag.
	fn get_data(&mut self, tag: u32) -> TtlResult;
	/// `GENERATE AC`, given the reference control byte and CDOL-built
	/// command data.
	fn generate_ac(&mut self, reference_control: u8, data: &[u8]) -> TtlResult;
}
