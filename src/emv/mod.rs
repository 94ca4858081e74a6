//! The EMV kernel proper: the typed fixed-format tags, the application
//! object model, the field helpers, the ODA engine, the risk manager, and
//! the session orchestrator that threads them together (spec §2 components
//! C-H).

pub mod application;
pub mod bitflags;
pub mod cvm;
pub mod fields;
pub mod iac;
pub mod oda;
pub mod risk;
pub mod session;
pub mod ttl;

pub use application::{Application, ApplicationList, AsciiSubsetConverter, Iso8859Converter};
pub use fields::AflEntry;
pub use session::{EmvContext, Outcome};
pub use ttl::{Ttl, TransportFailure};
