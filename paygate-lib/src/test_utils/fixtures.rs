//! Key material and merchant options shared by tests.
//!
//! All certificates are self-signed RSA-2048 with a century-long validity
//! window, generated for tests only.

use crate::certificates::CertificateRecord;
use crate::GatewayOptions;

/// First platform certificate.
pub const PLATFORM_A_CERT_PEM: &str = include_str!("pem/platform_a_cert.pem");
/// Private key of [`PLATFORM_A_CERT_PEM`].
pub const PLATFORM_A_KEY_PEM: &str = include_str!("pem/platform_a_key.pem");
/// Serial of [`PLATFORM_A_CERT_PEM`].
pub const PLATFORM_A_SERIAL_NO: &str = "5157F09EFDC096DE15EBE81A47057A7232F1B8E1";

/// Second platform certificate, used for rotation scenarios.
pub const PLATFORM_B_CERT_PEM: &str = include_str!("pem/platform_b_cert.pem");
/// Private key of [`PLATFORM_B_CERT_PEM`].
pub const PLATFORM_B_KEY_PEM: &str = include_str!("pem/platform_b_key.pem");
/// Serial of [`PLATFORM_B_CERT_PEM`].
pub const PLATFORM_B_SERIAL_NO: &str = "3775B6A45ACD588826D15E583A95F5DD26F8E5DC";

/// Merchant client certificate (`CN=1900000109`).
pub const CLIENT_CERT_PEM: &str = include_str!("pem/client_cert.pem");
/// Private key of [`CLIENT_CERT_PEM`].
pub const CLIENT_KEY_PEM: &str = include_str!("pem/client_key.pem");
/// Serial of [`CLIENT_CERT_PEM`].
pub const CLIENT_SERIAL_NO: &str = "444F4EBEBE8C5E4A14BF7E2C6E8F0D0A3C1B2E11";

pub const TEST_APP_ID: &str = "wxd930ea5d5a258f4f";
pub const TEST_MCH_ID: &str = "1900000109";
/// Older protocol secret from the gateway's published signing example.
pub const TEST_KEY: &str = "192006250b4c09247ec02edce69f6a2d";
/// 32 byte AEAD key.
pub const TEST_V3_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Options with every credential populated.
pub fn test_options() -> GatewayOptions {
    GatewayOptions::new(TEST_APP_ID, TEST_MCH_ID)
        .with_key(TEST_KEY)
        .with_v3_key(TEST_V3_KEY)
        .with_client_certificate(CLIENT_CERT_PEM, CLIENT_KEY_PEM)
}

pub fn platform_a_record() -> CertificateRecord {
    CertificateRecord::from_pem(PLATFORM_A_CERT_PEM.as_bytes()).unwrap()
}

pub fn platform_b_record() -> CertificateRecord {
    CertificateRecord::from_pem(PLATFORM_B_CERT_PEM.as_bytes()).unwrap()
}
