use std::time::Duration;

/// Vendor reported for every measurement taken by the device itself.
pub const INTEL_VENDOR: &str = "intel.com";

/// DICE layer of the measurements taken by the device itself.
///
/// Layer 2 is the user design, above the ROM extension (0) and the
/// configuration management firmware (1).
pub const DEVICE_MEASUREMENT_LAYER: i64 = 2;

/// Prefix of the measurement type OID. The section number is appended.
pub const MEASUREMENT_TYPE_OID_PREFIX: &str = "2.16.840.1.113741.1.15.4";

/// Object identifier of SHA-384.
pub const SHA384_OID: &str = "2.16.840.1.101.3.4.2.2";

/// Object identifier of SHA-512.
pub const SHA512_OID: &str = "2.16.840.1.101.3.4.2.3";

/// Object identifier of the `tcg-dice-TcbInfo` certificate extension.
pub const TCB_INFO_OID: &str = "2.23.133.5.4.1";

/// Object identifier of the `tcg-dice-MultiTcbInfo` certificate extension.
pub const MULTI_TCB_INFO_OID: &str = "2.23.133.5.4.5";

/// Maximum number of nested locator levels followed while resolving a
/// reference manifest.
pub const MAX_NESTED_LOCATORS_DEPTH: usize = 16;

/// Largest reference manifest, revocation list or nested manifest body
/// accepted from a locator, in bytes.
pub const MAX_MANIFEST_SIZE: u64 = 4 * 1024 * 1024;

/// Most locators fetched while resolving one reference manifest.
pub const MAX_LOCATOR_FETCHES: usize = 64;

/// COSE header label of the X.509 certificate chain (`x5chain`).
pub const X5CHAIN_HEADER_LABEL: i64 = 33;

/// Default timeout for fetching nested reference manifests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable key for allowing `file://` locators.
///
/// When no override has been set at runtime, `file://` locators are only
/// followed if this variable is set to `true`.
pub const FPGA_ALLOW_FILE_LOCATORS_KEY: &str = "FPGA_ALLOW_FILE_LOCATORS";
