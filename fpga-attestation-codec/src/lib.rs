//! Byte-exact codecs for FPGA secure device manager messages
//!
//! This crate parses and builds the messages exchanged with the device during
//! measurement collection and the SIGMA key exchange. Every multi-byte field
//! carries a byte order rule, so the same definitions serve both the
//! little-endian firmware layout and the big-endian service layout.

pub mod cursor;
pub mod endianness;
pub mod error;
pub mod messages;

pub use cursor::ByteCursor;
pub use endianness::{convert, Actor, Field, RuleTable, SwapRule};
pub use error::{CodecError, ErrorKind, Result};
pub use messages::{
    device_header::DeviceHeader,
    get_measurement::GetMeasurementResponse,
    psg_signature::{PsgCurve, PsgSignature},
    sigma_enc::{SigmaEncMessage, SigmaEncResponse},
    sigma_m1::SigmaM1Message,
    sigma_m2::SigmaM2Message,
    sigma_m3::SigmaM3Message,
    spdm_certificate::SpdmCertificateResponse,
    DeviceFamily, WireMessage,
};
