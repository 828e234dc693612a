use crate::constants::FPGA_ALLOW_FILE_LOCATORS_KEY;
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Global state to control whether `file://` locators are followed.
/// This is initialized as `None` and can be set at runtime.
static FILE_LOCATORS_STATUS: Lazy<Mutex<Option<bool>>> = Lazy::new(|| Mutex::new(None));

/// Sets whether `file://` locators should be followed.
///
/// # Arguments
///
/// * `value` - A boolean indicating whether to allow file locators.
pub fn set_allow_file_locators(value: bool) {
    let mut status = FILE_LOCATORS_STATUS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *status = Some(value);
}

/// Determines whether `file://` locators should be followed.
///
/// This function first checks the global status. If not set, it falls back
/// to checking the `FPGA_ALLOW_FILE_LOCATORS` environment variable.
///
/// # Returns
///
/// * `true` if file locators should be followed
/// * `false` otherwise
pub fn get_allow_file_locators() -> bool {
    let status = *FILE_LOCATORS_STATUS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(value) = status {
        value
    } else {
        std::env::var(FPGA_ALLOW_FILE_LOCATORS_KEY).unwrap_or_default() == "true"
    }
}

/// Upper-cases a hex string.
pub fn normalize_hex(value: &str) -> String {
    value.to_ascii_uppercase()
}

/// Renders the measurement type OID of a section.
pub fn measurement_type_oid(section: u8) -> String {
    format!("{}.{section}", crate::constants::MEASUREMENT_TYPE_OID_PREFIX)
}
