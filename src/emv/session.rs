//! Component G: the session orchestrator - the top-level state machine
//! threading the TLV engine, TAL, ODA engine, and risk manager together
//! (spec §4.G).
//!
//! Generalized from display/identification into the ordered APDU-driven
//! state machine spec §4.G describes; each method below corresponds to one
//! transition of
//! `Idle -> AtrValidated -> CandidateList -> Selected -> GpoDone ->
//! RecordsRead -> OdaDone -> RestrictionsChecked -> RiskDone ->
//! FirstGenAcDone -> Terminal`. ATR validation itself is out of scope
//! (spec §1) and is assumed to have already happened by the time a caller
//! constructs an [`EmvContext`].

use log::{debug, error, info, warn};

use crate::{
	bitflag_value::BitflagValue,
	crypto::{CryptoRng, RsaModExp},
	emv::{
		application::{Application, ApplicationList, AsciiSubsetConverter},
		bitflags::{
			ApplicationInterchangeProfile,
			TerminalCapabilities,
			TerminalVerificationResults,
			TransactionStatusInformation,
		},
		fields::{parse_afl, AflEntry},
		oda::{self, capk, capk::CaPublicKeyStore, OdaContext, OdaMethod, RecoveredKey},
		risk::{self, RandomSelectionConfig, TxnLogEntry},
		ttl::Ttl,
	},
	error::KernelError,
	tlv::{ber_tlv, dol::{build_dol, parse_dol}, AidMatchMode, DataSources, TlvField, TlvList},
};

const PSE_DF_NAME: &[u8] = b"1PAY.SYS.DDF01";
const CDA_SIGNATURE_BIT: u8 = 0b0001_0000;
/// Card Action Analysis is fixed to request AAC (spec §4.G, §9 Open
/// Question) - a conforming kernel wires in the full TAC/IAC algorithm here
/// instead.
const FIRST_GENAC_REFERENCE_CONTROL: u8 = 0x00;

/// Final or continuable results of driving a transaction (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
	Approved,
	Declined,
	CardError,
	CardBlocked,
	NotAccepted,
	GpoNotAccepted,
	TryAgain,
}

/// The per-transaction session state (spec §3 `EmvContext`).
pub struct EmvContext {
	pub config:                TlvList,
	pub supported_aids:        TlvList,
	pub parameters:            TlvList,
	pub terminal:              TlvList,
	pub icc:                   TlvList,
	pub selected:              Option<Application>,
	pub oda:                   OdaContext,
	pub tvr:                   TerminalVerificationResults,
	pub tsi:                   TransactionStatusInformation,
	pub aip:                   Option<ApplicationInterchangeProfile>,
	pub afl:                   Vec<AflEntry>,
	/// Issuer Code Table Index (`9F11`) values this terminal can render,
	/// gating the Application Preferred Name (`9F12`) display tier (spec
	/// §4.C).
	pub supported_code_tables: Vec<u8>,
}

fn zero_tvr() -> TerminalVerificationResults {
	TerminalVerificationResults::try_from([0x00u8; 5].as_slice()).expect("5 zero bytes is always valid")
}

fn zero_tsi() -> TransactionStatusInformation {
	TransactionStatusInformation::try_from([0x00u8; 2].as_slice()).expect("2 zero bytes is always valid")
}

impl EmvContext {
	/// Validates `config`/`parameters`/`supported_aids` (spec §6.4) before
	/// constructing the context - a malformed configuration aborts with
	/// [`KernelError::InvalidConfig`] rather than surfacing later as a
	/// confusing transaction-time failure.
	pub fn new(
		config: TlvList,
		supported_aids: TlvList,
		parameters: TlvList,
		supported_code_tables: Vec<u8>,
	) -> Result<Self, KernelError> {
		crate::config::validate_terminal_config(&config)?;
		crate::config::validate_transaction_parameters(&parameters)?;
		crate::config::validate_supported_aids(&supported_aids)?;

		Ok(Self {
			config,
			supported_aids,
			parameters,
			terminal: TlvList::new(),
			icc: TlvList::new(),
			selected: None,
			oda: OdaContext::default(),
			tvr: zero_tvr(),
			tsi: zero_tsi(),
			aip: None,
			afl: Vec::new(),
			supported_code_tables,
		})
	}

	/// `AtrValidated -> CandidateList` (spec §4.D.1, §4.D.2): reads the PSE
	/// directory, falling back to AID-list probing, and returns the
	/// resulting candidate list sorted by priority.
	pub fn discover_candidates(&mut self, ttl: &mut impl Ttl) -> Result<ApplicationList, Outcome> {
		info!("state: CandidateList");
		let mut candidates = ApplicationList::new();

		match self.read_pse(ttl)? {
			Some(pse_candidates) => candidates = pse_candidates,
			None => self.probe_aid_list(ttl, &mut candidates)?,
		}

		candidates.filter_by_supported_aids(&self.supported_aids);
		candidates.sort_by_priority();

		if candidates.is_empty() {
			warn!("no candidate application survived discovery and supported-AID filtering");
			return Err(Outcome::NotAccepted);
		}
		debug!("{} candidate application(s) found", candidates.len());
		Ok(candidates)
	}

	/// Reads the PSE directory (spec §4.D.1). Returns `Ok(None)` when the
	/// PSE is absent or blocked, per spec "empty, continue" - the caller
	/// falls back to AID-list discovery. Returns `Err(CardBlocked)` on SW
	/// `6A81`.
	fn read_pse(&mut self, ttl: &mut impl Ttl) -> Result<Option<ApplicationList>, Outcome> {
		let (fci, sw) = ttl.select_by_df_name(PSE_DF_NAME).map_err(|_| Outcome::CardError)?;
		debug!("SELECT {PSE_DF_NAME:02X?} -> SW={sw:04X}");
		match sw {
			0x9000 => {}
			0x6A81 => {
				error!("PSE SELECT returned 6A81, card blocked");
				return Err(Outcome::CardBlocked);
			}
			_ => return Ok(None),
		}

		let fci_list = ber_tlv::parse(&fci).map_err(|_| Outcome::CardError)?;
		let Some(sfi) = fci_list.find_value(0x88).and_then(|value| value.first().copied()) else {
			return Ok(None);
		};

		let mut candidates = ApplicationList::new();
		let mut record_number = 1u8;
		loop {
			let (record, sw) = ttl.read_record(sfi, record_number).map_err(|_| Outcome::CardError)?;
			debug!("READ RECORD sfi={sfi} record={record_number} -> SW={sw:04X}, {} byte(s)", record.len());
			if sw == 0x6A83 {
				break;
			}
			if sw != 0x9000 {
				return Err(Outcome::CardError);
			}
			let record_list = ber_tlv::parse(&record).map_err(|_| Outcome::CardError)?;
			for template in record_list.iter().filter(|field| field.tag == 0x61) {
				let app_list = ber_tlv::parse(&template.value).map_err(|_| Outcome::CardError)?;
				if let Ok(application) = Application::from_tlv_list(
					app_list,
					&self.supported_code_tables,
					&AsciiSubsetConverter,
				) {
					candidates.push_back(application);
				}
			}
			record_number = record_number.checked_add(1).ok_or(Outcome::CardError)?;
		}

		Ok(Some(candidates))
	}

	/// AID-list discovery fallback (spec §4.D.2): probes every supported AID
	/// exactly once (exact match) or repeatedly via cursor mode (partial
	/// match), appending every hit that survives to `candidates`.
	fn probe_aid_list(&mut self, ttl: &mut impl Ttl, candidates: &mut ApplicationList) -> Result<(), Outcome> {
		let supported: Vec<(Vec<u8>, u8)> = self
			.supported_aids
			.iter()
			.map(|entry| (entry.value.clone(), entry.flags))
			.collect();

		for (aid, flags) in supported {
			let partial_match = AidMatchMode::try_from(flags) == Ok(AidMatchMode::Partial);
			let mut first_iteration = true;
			loop {
				let result = if first_iteration {
					ttl.select_by_df_name(&aid)
				} else {
					ttl.select_by_df_name_next(&aid)
				};
				first_iteration = false;
				let (fci, sw) = result.map_err(|_| Outcome::CardError)?;

				if sw != 0x9000 && sw != 0x6283 {
					break;
				}
				if sw == 0x6283 {
					// Blocked application: discarded but still counts as
					// "found" for cursor advancement.
					if !partial_match {
						break;
					}
					continue;
				}

				let fci_list = ber_tlv::parse(&fci).map_err(|_| Outcome::CardError)?;
				let Ok(application) = Application::from_tlv_list(
					fci_list,
					&self.supported_code_tables,
					&AsciiSubsetConverter,
				) else {
					if !partial_match {
						break;
					}
					continue;
				};

				let exact = application.aid.len() == aid.len();
				if exact || partial_match {
					candidates.push_back(application);
				}
				if exact || !partial_match {
					break;
				}
			}
		}
		Ok(())
	}

	/// `CandidateList -> Selected` (spec §4.D.3): SELECTs the chosen
	/// candidate's AID directly (not the cursor already primed by
	/// discovery, since the user may pick out of order).
	pub fn select_application(&mut self, ttl: &mut impl Ttl, aid: &[u8]) -> Result<(), Outcome> {
		info!("state: Selected");
		if aid.len() > 16 {
			return Err(Outcome::CardError);
		}
		let (fci, sw) = ttl.select_by_df_name(aid).map_err(|_| Outcome::CardError)?;
		debug!("SELECT {aid:02X?} -> SW={sw:04X}");
		match sw {
			0x9000 => {}
			0x6A81 => {
				error!("SELECT {aid:02X?} returned 6A81, card blocked");
				return Err(Outcome::CardBlocked);
			}
			_ => return Err(Outcome::TryAgain),
		}
		let fci_list = ber_tlv::parse(&fci).map_err(|_| Outcome::CardError)?;
		let application = Application::from_tlv_list(fci_list, &self.supported_code_tables, &AsciiSubsetConverter)
			.map_err(|_| Outcome::CardError)?;
		self.selected = Some(application);
		Ok(())
	}

	/// `Selected -> GpoDone` (spec §4.G "Selected -> GpoDone", §4.D.4).
	pub fn get_processing_options(
		&mut self,
		ttl: &mut impl Ttl,
		rng: &mut impl CryptoRng,
		pos_entry_mode: u8,
	) -> Result<(), Outcome> {
		info!("state: GpoDone");
		let application = self.selected.as_ref().ok_or(Outcome::CardError)?;

		self.terminal.push(TlvField::new(0x9F39, vec![pos_entry_mode]));
		self.terminal.push(TlvField::new(0x9F06, application.aid.clone()));
		self.terminal.push(TlvField::new(0x9B, vec![0x00, 0x00]));
		self.terminal.push(TlvField::new(0x95, vec![0x00; 5]));

		let mut unpredictable_number = [0u8; 4];
		rng.fill_bytes(&mut unpredictable_number);
		self.terminal.push(TlvField::new(0x9F37, unpredictable_number.to_vec()));

		let pdol_entries = match application.tlv_list.find_value(0x9F38) {
			Some(pdol) => parse_dol(pdol).map_err(|_| Outcome::CardError)?,
			None => Vec::new(),
		};
		let sources = DataSources::new(vec![&self.parameters, &self.config, &self.terminal]);
		let mut pdol_data = Vec::new();
		build_dol(&pdol_entries, &sources, &mut pdol_data);
		self.oda.pdol_data = pdol_data.clone();

		let command = wrap_tag_83(&pdol_data);
		let (response, sw) = ttl.get_processing_options(&command).map_err(|_| Outcome::CardError)?;
		debug!("GET PROCESSING OPTIONS -> SW={sw:04X}, {} byte(s)", response.len());
		if sw == 0x6985 {
			warn!("GET PROCESSING OPTIONS returned 6985, conditions of use not satisfied");
			return Err(Outcome::GpoNotAccepted);
		}
		if sw != 0x9000 {
			return Err(Outcome::CardError);
		}

		let gpo_list = ber_tlv::parse(&response).map_err(|_| Outcome::CardError)?;
		let (aip_bytes, afl_bytes) = if let Some(format1) = gpo_list.find_value(0x80) {
			if format1.len() < 2 {
				return Err(Outcome::CardError);
			}
			(format1[0..2].to_vec(), format1[2..].to_vec())
		} else {
			let aip = gpo_list.find_value(0x82).ok_or(Outcome::CardError)?.to_vec();
			let afl = gpo_list.find_value(0x94).ok_or(Outcome::CardError)?.to_vec();
			(aip, afl)
		};

		let aip = ApplicationInterchangeProfile::try_from(aip_bytes.as_slice()).map_err(|_| Outcome::CardError)?;
		let afl = parse_afl(&afl_bytes).map_err(|_| Outcome::CardError)?;

		let mut selected = self.selected.take().expect("checked above");
		self.icc.splice_append(&mut selected.tlv_list);
		for field in gpo_list.iter() {
			if field.tag != 0x80 {
				self.icc.push(field.clone());
			}
		}
		self.selected = Some(selected);

		self.aip = Some(aip);
		self.afl = afl;
		Ok(())
	}

	/// `GpoDone -> RecordsRead` (spec §4.D.5): walks the AFL, reading every
	/// record, verifying the mandatory tag set and accumulating the ODA
	/// record buffer.
	pub fn read_records(&mut self, ttl: &mut impl Ttl) -> Result<(), Outcome> {
		info!("state: RecordsRead");
		for entry in self.afl.clone() {
			for record_number in entry.first_record..=entry.last_record {
				let (record, sw) = ttl.read_record(entry.sfi, record_number).map_err(|_| Outcome::CardError)?;
				debug!("READ RECORD sfi={} record={record_number} -> SW={sw:04X}", entry.sfi);
				if sw != 0x9000 {
					return Err(Outcome::CardError);
				}

				let decoded = ber_tlv::decode_tag_and_length(&record).map_err(|_| Outcome::CardError)?;
				let whole_record_valid = decoded.tag == 0x70 && decoded.consumed == record.len();
				if !whole_record_valid {
					// ODA_RECORD_INVALID: other records still processed
					// (spec §4.D.5).
					warn!("sfi={} record={record_number} failed the template-70 whole-record check", entry.sfi);
					continue;
				}
				let value = &record[decoded.value_start..decoded.value_end];
				let children = ber_tlv::parse(value).map_err(|_| Outcome::CardError)?;
				for field in children.iter() {
					self.icc.push(field.clone());
				}

				let within_oda = record_number - entry.first_record < entry.oda_record_count;
				if within_oda {
					if entry.sfi <= 10 {
						self.oda.record_buf.extend_from_slice(value);
					} else {
						self.oda.record_buf.extend_from_slice(&record[..decoded.consumed]);
					}
				}
			}
		}

		for tag in [0x5F24, 0x5A, 0x8C, 0x8D] {
			if self.icc.find(tag).is_none() || self.icc.has_duplicate(tag) {
				return Err(Outcome::CardError);
			}
		}

		Ok(())
	}

	/// `RecordsRead -> OdaDone` (spec §4.E). Selects the ODA method and
	/// applies it; any cryptographic failure is continuable (sets the
	/// relevant TVR bit) rather than aborting. Clears the sensitive ODA
	/// buffers afterward (spec §5 "Cancellation").
	pub fn apply_oda<R: RsaModExp, G: CryptoRng>(
		&mut self,
		ttl: &mut impl Ttl,
		rsa: &R,
		rng: &mut G,
		capk_store: &impl CaPublicKeyStore,
		digest_of: impl Fn(&[u8]) -> [u8; 20],
	) {
		info!("state: OdaDone");
		let Some(aip) = self.aip.clone() else {
			warn!("ODA skipped: no AIP cached from GET PROCESSING OPTIONS");
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};
		let Some(terminal_capabilities_bytes) = self.config.find_value(0x9F33) else {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};
		let Ok(terminal_capabilities) =
			TerminalCapabilities::try_from(terminal_capabilities_bytes)
		else {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};

		let method = oda::select_method(&aip, &terminal_capabilities);
		self.oda.method = Some(method);
		debug!("ODA method selected: {method:?}");
		if method == OdaMethod::None {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		}

		let Some(pan) = self.icc.find_value(0x5A).map(<[u8]>::to_vec) else {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};
		let Some(transaction_date) = self.parameters.find_value(0x9A).map(<[u8]>::to_vec) else {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};
		let Some(rid) = self.selected.as_ref().map(|app| app.aid[0..5].to_vec()) else {
			self.tvr.offline_data_authentication_not_performed = true;
			return;
		};

		let issuer_key = self.run_sda(rsa, capk_store, &pan, &transaction_date, &rid, &digest_of);

		let Some(issuer_key) = issuer_key else {
			warn!("issuer public key recovery failed, ODA cannot proceed");
			return;
		};

		match method {
			OdaMethod::Sda => {
				self.oda.issuer_pkey = Some(capk::CaPublicKey {
					modulus:  issuer_key.modulus,
					exponent: issuer_key.exponent,
				});
			}
			OdaMethod::Dda => {
				self.run_dda(ttl, rsa, rng, &issuer_key, &pan, &transaction_date, &digest_of);
			}
			OdaMethod::Cda => {
				self.run_cda_recovery(rsa, &issuer_key, &pan, &transaction_date, &digest_of);
			}
			OdaMethod::None => unreachable!("handled above"),
		}
	}

	fn run_sda<R: RsaModExp>(
		&mut self,
		rsa: &R,
		capk_store: &impl CaPublicKeyStore,
		pan: &[u8],
		transaction_date: &[u8],
		rid: &[u8],
		digest_of: &impl Fn(&[u8]) -> [u8; 20],
	) -> Option<RecoveredKey> {
		let ca_key_index = *self.icc.find_value(0x8F)?.first()?;
		let issuer_certificate = self.icc.find_value(0x90)?.to_vec();
		let issuer_remainder = self.icc.find_value(0x92).unwrap_or(&[]).to_vec();
		let issuer_exponent = self.icc.find_value(0x9F32)?.to_vec();
		let ssad = self.icc.find_value(0x93)?.to_vec();

		// SDA Tag List (9F4A): when present it must be exactly [82], meaning
		// AIP is appended to the record buffer before the SSAD hash (spec
		// §4.E step 1, step 8). Any other value is a structural failure.
		let mut static_buf = self.oda.record_buf.clone();
		if let Some(sda_tag_list) = self.icc.find_value(0x9F4A) {
			if sda_tag_list != [0x82].as_slice() {
				return None;
			}
			static_buf.extend_from_slice(&self.aip.clone()?.get_binary_value());
		}

		let input = oda::sda::SdaInput {
			rid,
			ca_key_index,
			issuer_certificate: &issuer_certificate,
			issuer_remainder: &issuer_remainder,
			issuer_exponent: &issuer_exponent,
			ssad: &ssad,
			pan,
			transaction_date,
			static_data: &static_oda_data(&static_buf),
		};
		oda::sda::apply_sda(rsa, capk_store, &input, &mut self.tvr, digest_of)
	}

	fn run_dda<R: RsaModExp>(
		&mut self,
		ttl: &mut impl Ttl,
		rsa: &R,
		rng: &mut impl CryptoRng,
		issuer_key: &RecoveredKey,
		pan: &[u8],
		transaction_date: &[u8],
		digest_of: &impl Fn(&[u8]) -> [u8; 20],
	) {
		let Some(icc_certificate) = self.icc.find_value(0x9F46).map(<[u8]>::to_vec) else {
			warn!("DDA failed: ICC public key certificate (9F46) missing");
			self.tvr.dda_failed = true;
			return;
		};
		let icc_remainder = self.icc.find_value(0x9F48).unwrap_or(&[]).to_vec();
		let Some(icc_exponent) = self.icc.find_value(0x9F47).map(<[u8]>::to_vec) else {
			warn!("DDA failed: ICC public key exponent (9F47) missing");
			self.tvr.dda_failed = true;
			return;
		};
		let ddol = self.icc.find_value(0x9F49).unwrap_or(&[]).to_vec();

		let input = oda::dda::DdaInput {
			icc_certificate: &icc_certificate,
			icc_remainder: &icc_remainder,
			icc_exponent: &icc_exponent,
			pan,
			transaction_date,
			ddol: &ddol,
		};
		if let Some(icc_key) =
			oda::dda::apply_dda(rsa, rng, ttl, issuer_key, &input, &self.terminal, &mut self.tvr, digest_of)
		{
			self.oda.icc_pkey = Some(capk::CaPublicKey {
				modulus:  icc_key.modulus,
				exponent: icc_key.exponent,
			});
		}
	}

	fn run_cda_recovery<R: RsaModExp>(
		&mut self,
		rsa: &R,
		issuer_key: &RecoveredKey,
		pan: &[u8],
		transaction_date: &[u8],
		digest_of: &impl Fn(&[u8]) -> [u8; 20],
	) {
		let Some(icc_certificate) = self.icc.find_value(0x9F46).map(<[u8]>::to_vec) else {
			warn!("CDA failed: ICC public key certificate (9F46) missing");
			self.tvr.cda_failed = true;
			return;
		};
		let icc_remainder = self.icc.find_value(0x9F48).unwrap_or(&[]).to_vec();
		let Some(icc_exponent) = self.icc.find_value(0x9F47).map(<[u8]>::to_vec) else {
			warn!("CDA failed: ICC public key exponent (9F47) missing");
			self.tvr.cda_failed = true;
			return;
		};

		let input = oda::cda::CdaCertInput {
			icc_certificate: &icc_certificate,
			icc_remainder: &icc_remainder,
			icc_exponent: &icc_exponent,
			pan,
			transaction_date,
		};
		if let Some(icc_key) = oda::cda::recover_icc_key(rsa, issuer_key, &input, &mut self.tvr, digest_of) {
			self.oda.icc_pkey = Some(capk::CaPublicKey {
				modulus:  icc_key.modulus,
				exponent: icc_key.exponent,
			});
		}
	}

	/// Clears the sensitive ODA buffers once ODA (and, for CDA, the first
	/// GENERATE AC) has completed (spec §4.G "After this step the ODA
	/// record buffer is cleared", spec §5 "Cancellation").
	pub fn clear_oda_buffers(&mut self) {
		crate::crypto::cleanse(&mut self.oda.record_buf);
		crate::crypto::cleanse(&mut self.oda.pdol_data);
		self.oda.record_buf.clear();
		self.oda.pdol_data.clear();
	}

	/// `OdaDone -> RestrictionsChecked` (spec §4.G "Processing Restrictions
	/// details"). Every check is continuable; none of them abort the
	/// session.
	pub fn check_restrictions(&mut self) {
		info!("state: RestrictionsChecked");
		if let (Some(terminal_version), Some(app_version)) =
			(self.terminal_value(0x9F09), self.icc.find_value(0x9F08).map(<[u8]>::to_vec))
		{
			if terminal_version != app_version {
				self.tvr.icc_terminal_version_mismatch = true;
			}
		}

		self.check_auc();
		self.check_dates();
	}

	fn terminal_value(&self, tag: u32) -> Option<Vec<u8>> {
		self.config.find_value(tag).map(<[u8]>::to_vec)
	}

	fn check_auc(&mut self) {
		let Some(auc) = self.icc.find_value(0x9F07) else {
			return;
		};
		if auc.len() != 2 {
			return;
		}
		let (byte1, byte2) = (auc[0], auc[1]);

		let terminal_type = self.config.find_value(0x9F35).and_then(|value| value.first().copied());
		let additional_caps_byte1 = self
			.config
			.find_value(0x9F40)
			.and_then(|value| value.first().copied());
		let is_atm = matches!(terminal_type, Some(0x14 | 0x15 | 0x16))
			&& additional_caps_byte1.map_or(false, |byte| byte & 0b1000_0000 != 0);

		const AUC_ATM: u8 = 0b0100_0000;
		const AUC_NON_ATM: u8 = 0b1000_0000;
		let location_bit = if is_atm { AUC_ATM } else { AUC_NON_ATM };
		if byte1 & location_bit == 0 {
			self.tvr.service_not_allowed = true;
		}

		let domestic = self.config.find_value(0x9F1A) == self.icc.find_value(0x5F28);
		const AUC_DOMESTIC: u8 = 0b1000_0000;
		const AUC_INTERNATIONAL: u8 = 0b0100_0000;
		let scope_bit = if domestic { AUC_DOMESTIC } else { AUC_INTERNATIONAL };
		if byte1 & scope_bit == 0 {
			self.tvr.service_not_allowed = true;
		}

		if let Some(txn_type) = self.parameters.find_value(0x9C).and_then(|value| value.first().copied()) {
			let required_bit = match txn_type {
				0x00 => Some(0b0010_0000u8), // goods and services
				0x01 => Some(0b0001_0000u8), // cash
				0x09 => Some(0b0000_1000u8), // cashback
				_ => None,
			};
			if let Some(bit) = required_bit {
				if byte2 & bit == 0 {
					self.tvr.service_not_allowed = true;
				}
			}
		}
	}

	fn check_dates(&mut self) {
		let Some(transaction_date) = self.parameters.find_value(0x9A) else {
			return;
		};
		if let Some(expiration) = self.icc.find_value(0x5F24) {
			if transaction_date > expiration {
				self.tvr.application_expired = true;
			}
		}
		if let Some(effective) = self.icc.find_value(0x5F25) {
			if transaction_date < effective {
				self.tvr.application_not_yet_effective = true;
			}
		}
	}

	/// `RestrictionsChecked -> RiskDone` (spec §4.F).
	#[allow(clippy::too_many_arguments)]
	pub fn run_risk_management(
		&mut self,
		ttl: &mut impl Ttl,
		rng: &mut impl CryptoRng,
		transaction_amount: u32,
		pan: &[u8],
		floor_limit: u32,
		log: &[TxnLogEntry],
		random_config: Option<&RandomSelectionConfig>,
		lower_consecutive_limit: Option<u8>,
		upper_consecutive_limit: Option<u8>,
	) {
		info!("state: RiskDone");
		risk::check_floor_limit(transaction_amount, pan, floor_limit, log, &mut self.tvr);
		if self.tvr.txn_floor_limit_exceeded {
			warn!("transaction amount {transaction_amount} exceeds the floor limit of {floor_limit}");
		}
		if let Some(random_config) = random_config {
			risk::random_online_selection(transaction_amount, floor_limit, random_config, rng, &mut self.tvr);
		}
		risk::check_velocity(ttl, lower_consecutive_limit, upper_consecutive_limit, &mut self.tvr);
		risk::mark_performed(&mut self.tsi);
	}

	/// `RiskDone -> FirstGenAcDone -> Terminal` (spec §4.G). Card Action
	/// Analysis is fixed to AAC (spec §9 Open Question); this orchestrator
	/// issues the exchange and, for CDA, verifies the signed dynamic data
	/// riding in the response, but does not itself decide
	/// `Approved`/`Declined` - that belongs to a higher layer once online
	/// processing and the second GENERATE AC are in play (spec §4.G
	/// "orchestrator returns").
	pub fn first_generate_ac<R: RsaModExp>(&mut self, ttl: &mut impl Ttl, rsa: &R, digest_of: impl Fn(&[u8]) -> [u8; 20]) -> Result<(), Outcome> {
		info!("state: FirstGenAcDone");
		let cdol1 = self.icc.find_value(0x8C).ok_or(Outcome::CardError)?.to_vec();
		let entries = parse_dol(&cdol1).map_err(|_| Outcome::CardError)?;
		let sources = DataSources::new(vec![&self.parameters, &self.config, &self.terminal]);
		let mut cdol1_data = Vec::new();
		build_dol(&entries, &sources, &mut cdol1_data);
		self.oda.cdol1_data = cdol1_data.clone();

		let mut reference_control = FIRST_GENAC_REFERENCE_CONTROL;
		let cda_active = self.oda.method == Some(OdaMethod::Cda) && !self.tvr.cda_failed;
		if cda_active {
			reference_control |= CDA_SIGNATURE_BIT;
		}

		let (response, sw) = ttl.generate_ac(reference_control, &cdol1_data).map_err(|_| Outcome::CardError)?;
		debug!("GENERATE AC (reference control {reference_control:02X}) -> SW={sw:04X}");
		if sw != 0x9000 {
			return Err(Outcome::CardError);
		}
		let response_list = ber_tlv::parse(&response).map_err(|_| Outcome::CardError)?;
		if let Some(format1) = response_list.find_value(0x80) {
			// Format 1 (EMV Book 3 §6.5.5) is a flat CID(1) ATC(2) AC(8)
			// [IAD] concatenation, not BER-TLV.
			if format1.len() < 11 {
				return Err(Outcome::CardError);
			}
			self.icc.push(TlvField::new(0x9F27, format1[0..1].to_vec()));
			self.icc.push(TlvField::new(0x9F36, format1[1..3].to_vec()));
			self.icc.push(TlvField::new(0x9F26, format1[3..11].to_vec()));
			if format1.len() > 11 {
				self.icc.push(TlvField::new(0x9F10, format1[11..].to_vec()));
			}
		} else {
			for field in response_list.iter() {
				self.icc.push(field.clone());
			}
		}

		if cda_active {
			if let Some(icc_pkey) = self.oda.icc_pkey.clone() {
				if let Some(signed_dynamic_data) = self.icc.find_value(0x9F4B).map(<[u8]>::to_vec) {
					let icc_key = RecoveredKey {
						modulus:  icc_pkey.modulus,
						exponent: icc_pkey.exponent,
					};
					let unpredictable_number = self.terminal.find_value(0x9F37).unwrap_or(&[]).to_vec();
					oda::cda::verify_signed_dynamic_data(
						rsa,
						&icc_key,
						&signed_dynamic_data,
						&self.oda.record_buf,
						&self.oda.pdol_data,
						&self.oda.cdol1_data,
						&unpredictable_number,
						&mut self.tvr,
						digest_of,
					);
				} else {
					warn!("CDA failed: signed dynamic data (9F4B) missing from GENERATE AC response");
					self.tvr.cda_failed = true;
				}
			} else {
				warn!("CDA failed: no ICC public key recovered during ODA");
				self.tvr.cda_failed = true;
			}
		}

		Ok(())
	}
}

/// Wraps DOL-built command data in BER tag `83` (spec §6.5: short-form
/// length if `< 0x80`, else `81 LL`).
fn wrap_tag_83(data: &[u8]) -> Vec<u8> {
	let mut out = vec![0x83];
	if data.len() < 0x80 {
		out.push(data.len() as u8);
	} else {
		out.push(0x81);
		out.push(data.len() as u8);
	}
	out.extend_from_slice(data);
	out
}

/// The static application data SDA's record-buffer hash binds to (spec
/// §4.E step 8): the ODA record buffer, wrapped as a one-field list so it
/// can be iterated uniformly with `static_data.iter()` in
/// [`oda::sda::SdaInput`].
fn static_oda_data(record_buf: &[u8]) -> TlvList {
	let mut list = TlvList::new();
	list.push(TlvField::new(0, record_buf.to_vec()));
	list
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::emv::ttl::TtlResult;

	struct ScriptedTtl {
		responses: std::collections::VecDeque<TtlResult>,
	}

	impl Ttl for ScriptedTtl {
		fn select_by_df_name(&mut self, _df_name: &[u8]) -> TtlResult {
			self.responses.pop_front().unwrap()
		}

		fn select_by_df_name_next(&mut self, _df_name: &[u8]) -> TtlResult {
			self.responses.pop_front().unwrap()
		}

		fn read_record(&mut self, _sfi: u8, _record_number: u8) -> TtlResult {
			self.responses.pop_front().unwrap()
		}

		fn get_processing_options(&mut self, _data: &[u8]) -> TtlResult {
			self.responses.pop_front().unwrap()
		}

		fn get_data(&mut self, _tag: u32) -> TtlResult {
			self.responses.pop_front().unwrap()
		}

		fn generate_ac(&mut self, _reference_control: u8, _data: &[u8]) -> TtlResult {
			self.responses.pop_front().unwrap()
		}
	}

	struct FixedRng;
	impl CryptoRng for FixedRng {
		fn fill_bytes(&mut self, buf: &mut [u8]) {
			buf.fill(0xAB);
		}

		fn byte_inclusive(&mut self, min: u8, _max: u8) -> u8 {
			min
		}
	}

	/// A terminal configuration list satisfying every mandatory-tag check
	/// [`crate::config::validate_terminal_config`] performs, for tests that
	/// don't exercise configuration validation itself.
	fn valid_config() -> TlvList {
		let mut config = TlvList::new();
		config.push(TlvField::new(0x9F33, vec![0x00; 3]));
		config.push(TlvField::new(0x9F35, vec![0x00]));
		config.push(TlvField::new(0x9F40, vec![0x00; 5]));
		config.push(TlvField::new(0x9F1A, vec![0x00; 2]));
		config.push(TlvField::new(0x9F1B, vec![0x00; 4]));
		config.push(TlvField::new(0x9F09, vec![0x00; 2]));
		config.push(TlvField::new(0x9F49, vec![0x9A, 0x03]));
		config
	}

	/// A transaction-parameters list satisfying every mandatory-tag check
	/// [`crate::config::validate_transaction_parameters`] performs.
	fn valid_parameters() -> TlvList {
		let mut parameters = TlvList::new();
		parameters.push(TlvField::new(0x9C, vec![0x00]));
		parameters.push(TlvField::new(0x9A, vec![0x00; 3]));
		parameters.push(TlvField::new(0x81, vec![0x00; 4]));
		parameters
	}

	#[test]
	fn scenario_s2_pse_absent_aid_probe_finds_one_exact_match() {
		let mut ttl = ScriptedTtl {
			responses: std::collections::VecDeque::from(vec![
				Ok((Vec::new(), 0x6A82)), // PSE SELECT -> absent
				Ok((vec![0x6F, 0x0A, 0x84, 0x07, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10], 0x9000)),
			]),
		};
		let mut supported_aids = TlvList::new();
		supported_aids.push(TlvField::with_flags(
			0,
			vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10],
			0x00,
		));
		let mut ctx = EmvContext::new(valid_config(), supported_aids, valid_parameters(), Vec::new()).unwrap();
		let candidates = ctx.discover_candidates(&mut ttl).unwrap();
		assert_eq!(candidates.len(), 1);
	}

	#[test]
	fn scenario_s3_gpo_format_1_caches_aip_and_afl() {
		let mut ttl = ScriptedTtl {
			responses: std::collections::VecDeque::from(vec![Ok((
				vec![0x80, 0x06, 0x20, 0x80, 0x08, 0x01, 0x01, 0x00],
				0x9000,
			))]),
		};
		let mut ctx = EmvContext::new(valid_config(), TlvList::new(), valid_parameters(), Vec::new()).unwrap();
		ctx.selected = Some(Application {
			aid:                   vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10],
			display_name:          "test".to_string(),
			priority:              1,
			confirmation_required: false,
			tlv_list:              TlvList::new(),
		});
		let mut rng = FixedRng;
		ctx.get_processing_options(&mut ttl, &mut rng, 0x00).unwrap();
		assert!(ctx.aip.unwrap().cardholder_verification_supported);
		assert_eq!(ctx.afl, vec![AflEntry {
			sfi:              1,
			first_record:     1,
			last_record:      1,
			oda_record_count: 0,
		}]);
	}

	#[test]
	fn scenario_s4_risk_management_sets_tvr_and_tsi() {
		let mut ttl = ScriptedTtl {
			responses: std::collections::VecDeque::new(),
		};
		let mut ctx = EmvContext::new(valid_config(), TlvList::new(), valid_parameters(), Vec::new()).unwrap();
		let mut rng = FixedRng;
		ctx.run_risk_management(&mut ttl, &mut rng, 1024, &[], 1000, &[], None, None, None);
		assert!(ctx.tvr.txn_floor_limit_exceeded);
		assert!(ctx.tsi.terminal_risk_management_performed);
	}

	#[test]
	fn scenario_s7_application_expired_sets_tvr() {
		let mut parameters = valid_parameters();
		parameters.push(TlvField::new(0x9A, vec![0x24, 0x01, 0x15]));
		let mut ctx = EmvContext::new(valid_config(), TlvList::new(), parameters, Vec::new()).unwrap();
		ctx.icc.push(TlvField::new(0x5F24, vec![0x23, 0x12, 0x31]));
		ctx.check_restrictions();
		assert!(ctx.tvr.application_expired);
	}

	#[test]
	fn gpo_rejects_conditions_not_satisfied() {
		let mut ttl = ScriptedTtl {
			responses: std::collections::VecDeque::from(vec![Ok((Vec::new(), 0x6985))]),
		};
		let mut ctx = EmvContext::new(valid_config(), TlvList::new(), valid_parameters(), Vec::new()).unwrap();
		ctx.selected = Some(Application {
			aid:                   vec![0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10],
			display_name:          "test".to_string(),
			priority:              1,
			confirmation_required: false,
			tlv_list:              TlvList::new(),
		});
		let mut rng = FixedRng;
		let result = ctx.get_processing_options(&mut ttl, &mut rng, 0x00);
		assert_eq!(result, Err(Outcome::GpoNotAccepted));
	}
}
