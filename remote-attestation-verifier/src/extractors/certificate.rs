use tracing::{debug, error, instrument};
use x509_parser::{
    asn1_rs::{Any, Class, Tag},
    prelude::{FromDer, X509Certificate},
};

use crate::{
    constants::{MULTI_TCB_INFO_OID, TCB_INFO_OID},
    errors::{AttestError, Result},
    measurement::{Fwid, MaskedVendorInfo, MeasurementKey, MeasurementRecord, MeasurementValue},
};

/// Implicit context tags of the DICE TcbInfo structure.
pub mod tcb_info_tag {
    pub const VENDOR: u32 = 0;
    pub const MODEL: u32 = 1;
    pub const VERSION: u32 = 2;
    pub const SVN: u32 = 3;
    pub const LAYER: u32 = 4;
    pub const INDEX: u32 = 5;
    pub const FWIDS: u32 = 6;
    pub const FLAGS: u32 = 7;
    pub const VENDOR_INFO: u32 = 8;
    pub const TYPE: u32 = 9;
    pub const FLAGS_MASK: u32 = 10;
}

/// Maps the DICE TCB info extensions of device certificates.
pub struct CertificateExtractor;

impl CertificateExtractor {
    /// Extracts the records held by the `tcg-dice-TcbInfo` and
    /// `tcg-dice-MultiTcbInfo` extensions of a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns `AttestError` if the certificate cannot be parsed or a TCB
    /// info extension is malformed.
    #[instrument(level = "debug", name = "map_certificate", skip_all)]
    pub fn map(der: &[u8]) -> Result<Vec<MeasurementRecord>> {
        let (_, cert) = X509Certificate::from_der(der)?;
        let mut records = Vec::new();
        for extension in cert.extensions() {
            let oid = extension.oid.to_id_string();
            records.extend(Self::map_extension(&oid, extension.value)?);
        }
        debug!(
            subject = %cert.subject(),
            records = records.len(),
            "Mapped certificate TCB info"
        );
        Ok(records)
    }

    /// Extracts records from a single extension value. Extensions other
    /// than the TCB info ones yield nothing.
    pub fn map_extension(oid: &str, value: &[u8]) -> Result<Vec<MeasurementRecord>> {
        match oid {
            TCB_INFO_OID => Ok(vec![parse_tcb_info(&read_whole(value)?)?]),
            MULTI_TCB_INFO_OID => {
                let sequence = read_whole(value)?;
                expect_tag(&sequence, Tag::Sequence)?;
                elements(sequence.data)?
                    .iter()
                    .map(parse_tcb_info)
                    .collect()
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Reads one DER value that must span all of `bytes`.
fn read_whole(bytes: &[u8]) -> Result<Any<'_>> {
    let (rest, value) = Any::from_der(bytes)?;
    if !rest.is_empty() {
        error!(trailing = rest.len(), "TCB info extension has trailing bytes");
        return Err(AttestError::InvalidTcbInfo(format!(
            "{} trailing bytes",
            rest.len()
        )));
    }
    Ok(value)
}

/// Reads the DER values packed in the content of a constructed value.
fn elements(mut content: &[u8]) -> Result<Vec<Any<'_>>> {
    let mut values = Vec::new();
    while !content.is_empty() {
        let (rest, value) = Any::from_der(content)?;
        values.push(value);
        content = rest;
    }
    Ok(values)
}

fn expect_tag(value: &Any<'_>, tag: Tag) -> Result<()> {
    if value.class() != Class::Universal || value.tag() != tag {
        error!(expected = ?tag, actual = ?value.tag(), "Unexpected tag in TCB info");
        return Err(AttestError::InvalidTcbInfo(format!(
            "expected {tag:?}, got {:?}",
            value.tag()
        )));
    }
    Ok(())
}

/// Reads an implicitly tagged primitive field as the universal type `tag`.
fn implicit<'a>(field: &Any<'a>, tag: Tag) -> Result<Any<'a>> {
    field.header.assert_primitive()?;
    Ok(Any::from_tag_and_data(tag, field.data))
}

fn parse_tcb_info(value: &Any<'_>) -> Result<MeasurementRecord> {
    expect_tag(value, Tag::Sequence)?;
    let mut key = MeasurementKey::default();
    let mut measurement = MeasurementValue::default();
    for field in elements(value.data)? {
        let context_tag = (field.class() == Class::ContextSpecific).then_some(field.tag().0);
        match context_tag {
            Some(tcb_info_tag::VENDOR) => {
                key.vendor = implicit(&field, Tag::Utf8String)?.string()?;
            }
            Some(tcb_info_tag::MODEL) => {
                key.model = Some(implicit(&field, Tag::Utf8String)?.string()?);
            }
            Some(tcb_info_tag::VERSION) => {
                measurement.version = Some(implicit(&field, Tag::Utf8String)?.string()?);
            }
            Some(tcb_info_tag::SVN) => {
                measurement.svn = Some(implicit(&field, Tag::Integer)?.i64()?);
            }
            Some(tcb_info_tag::LAYER) => key.layer = implicit(&field, Tag::Integer)?.i64()?,
            Some(tcb_info_tag::INDEX) => key.index = implicit(&field, Tag::Integer)?.i64()?,
            Some(tcb_info_tag::FWIDS) => measurement.fwid = parse_fwids(&field)?,
            Some(tcb_info_tag::FLAGS) => measurement.flags = Some(bit_string_hex(&field)?),
            Some(tcb_info_tag::VENDOR_INFO) => {
                measurement.masked_vendor_info =
                    Some(MaskedVendorInfo::new(&hex::encode_upper(field.data), None));
            }
            Some(tcb_info_tag::TYPE) => {
                key.measurement_type = Some(implicit(&field, Tag::Oid)?.oid()?.to_id_string());
            }
            _ => {
                debug!(
                    class = %field.class(),
                    tag = ?field.tag(),
                    "Skipping unsupported TCB info field"
                );
            }
        }
    }
    Ok(MeasurementRecord::new(key, measurement))
}

/// Reads the FWID list: at most one FWID of a hash algorithm and a digest.
fn parse_fwids(field: &Any<'_>) -> Result<Option<Fwid>> {
    if !field.header.is_constructed() {
        error!("FWID list is not a sequence");
        return Err(AttestError::InvalidTcbInfo(
            "FWID list is not a sequence".to_string(),
        ));
    }
    let fwids = elements(field.data)?;
    let fwid = match fwids.as_slice() {
        [] => return Ok(None),
        [fwid] => fwid,
        _ => {
            error!(fwids = fwids.len(), "TCB info holds more than one FWID");
            return Err(AttestError::InvalidTcbInfo("more than one FWID".to_string()));
        }
    };
    expect_tag(fwid, Tag::Sequence)?;
    let [hash_alg, digest] = elements(fwid.data)?.try_into().map_err(|fields: Vec<_>| {
        error!(fields = fields.len(), "FWID does not hold two elements");
        AttestError::InvalidTcbInfo(format!("FWID holds {} elements", fields.len()))
    })?;
    expect_tag(&hash_alg, Tag::Oid)?;
    expect_tag(&digest, Tag::OctetString)?;
    Ok(Some(Fwid::new(
        hash_alg.oid()?.to_id_string(),
        &hex::encode(digest.data),
    )))
}

/// Renders a BIT STRING without its unused-bits octet.
fn bit_string_hex(field: &Any<'_>) -> Result<String> {
    match field.data.split_first() {
        Some((_, bits)) => Ok(hex::encode_upper(bits)),
        None => {
            error!("Empty BIT STRING in TCB info");
            Err(AttestError::InvalidTcbInfo("empty flags".to_string()))
        }
    }
}
