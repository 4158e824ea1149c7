//! Shapes of the platform certificate list reply.

use serde::{Deserialize, Serialize};

use super::CertificateRecord;
use crate::signing::aead;
use crate::Result;

/// An AEAD-wrapped certificate as delivered by the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCertificatePayload {
    /// Algorithm identifier, only `AEAD_AES_256_GCM` is accepted.
    pub algorithm: String,
    /// 12 character nonce.
    pub nonce: String,
    /// Associated data bound into the authentication tag.
    #[serde(default)]
    pub associated_data: String,
    /// Base64 ciphertext with the tag appended.
    pub ciphertext: String,
}

impl EncryptedCertificatePayload {
    /// Decrypt into PEM text.
    pub fn decrypt(&self, v3_key: &str) -> Result<String> {
        aead::decrypt_to_string(
            &self.algorithm,
            v3_key,
            &self.nonce,
            &self.associated_data,
            &self.ciphertext,
        )
    }

    /// Decrypt and parse into a record.
    pub fn decrypt_record(&self, v3_key: &str) -> Result<CertificateRecord> {
        let pem = self.decrypt(v3_key)?;
        CertificateRecord::from_pem(pem.as_bytes())
    }
}

/// One entry of the certificate list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCertificateEntry {
    pub serial_no: String,
    #[serde(default)]
    pub effective_time: Option<String>,
    #[serde(default)]
    pub expire_time: Option<String>,
    pub encrypt_certificate: EncryptedCertificatePayload,
}

/// Body of the certificate list reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCertificateList {
    #[serde(default)]
    pub data: Vec<PlatformCertificateEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{PLATFORM_A_CERT_PEM, PLATFORM_A_SERIAL_NO, TEST_V3_KEY};
    use crate::PaygateError;

    fn encrypted(algorithm: &str) -> EncryptedCertificatePayload {
        EncryptedCertificatePayload {
            algorithm: algorithm.to_string(),
            nonce: "61f9c719728a".to_string(),
            associated_data: "certificate".to_string(),
            ciphertext: aead::encrypt(TEST_V3_KEY, "61f9c719728a", "certificate", PLATFORM_A_CERT_PEM.as_bytes())
                .unwrap(),
        }
    }

    #[test]
    fn test_decrypt_record() {
        let record = encrypted(aead::AEAD_AES_256_GCM).decrypt_record(TEST_V3_KEY).unwrap();
        assert_eq!(record.serial_no(), PLATFORM_A_SERIAL_NO);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let err = encrypted("AEAD_SM4_GCM").decrypt_record(TEST_V3_KEY).unwrap_err();
        assert!(matches!(err, PaygateError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_list_shape() {
        let body = r#"{"data":[{"serial_no":"5157F09EFDC096DE15EBE81A47057A7232F1B8E1",
            "effective_time":"2018-06-08T10:34:56+08:00","expire_time":"2023-06-08T10:34:56+08:00",
            "encrypt_certificate":{"algorithm":"AEAD_AES_256_GCM","nonce":"61f9c719728a",
            "associated_data":"certificate","ciphertext":"sRvt..."}}]}"#;
        let list: PlatformCertificateList = serde_json::from_str(body).unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].encrypt_certificate.nonce, "61f9c719728a");
    }
}
