/// Tests for the session credential wire format
///
/// Note: These verify the header framing rules independently of the
/// server. Integration tests against a live agent require a running
/// KERIA instance.

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    const BRAN_LENGTH: usize = 21;

    fn sign(passcode: &str, bran: &str, salt: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(passcode.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(bran.as_bytes());
        mac.update(salt.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_generated_bran_shape() {
        use rand::distributions::Alphanumeric;
        use rand::Rng;

        let bran: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(BRAN_LENGTH)
            .map(char::from)
            .collect();

        assert_eq!(bran.len(), BRAN_LENGTH);
        assert!(bran.chars().all(|c| c.is_ascii_alphanumeric()));
        // The dot is reserved as the signature delimiter
        assert!(!bran.contains('.'));
    }

    #[test]
    fn test_signature_is_url_safe_without_padding() {
        let sig = sign("passcode", "ABCDEFGHIJKLMNOPQRSTU", "salt");
        assert!(!sig.contains('='));
        assert!(!sig.contains('+'));
        assert!(!sig.contains('/'));
        // SHA-256 output is 32 bytes, 43 chars unpadded
        assert_eq!(sig.len(), 43);
    }

    #[test]
    fn test_signature_binds_bran_salt_and_passcode() {
        let baseline = sign("passcode", "ABCDEFGHIJKLMNOPQRSTU", "salt");

        assert_ne!(baseline, sign("passcode", "XBCDEFGHIJKLMNOPQRSTU", "salt"));
        assert_ne!(baseline, sign("passcode", "ABCDEFGHIJKLMNOPQRSTU", "other"));
        assert_ne!(baseline, sign("other", "ABCDEFGHIJKLMNOPQRSTU", "salt"));
        assert_eq!(baseline, sign("passcode", "ABCDEFGHIJKLMNOPQRSTU", "salt"));
    }

    #[test]
    fn test_signed_header_splits_on_last_dot() {
        let bran = "ABCDEFGHIJKLMNOPQRSTU";
        let sig = sign("passcode", bran, "salt");
        let header = format!("{}.{}", bran, sig);

        let (got_bran, got_sig) = header.rsplit_once('.').unwrap();
        assert_eq!(got_bran, bran);
        assert_eq!(got_sig, sig);
        assert_eq!(got_bran.len(), BRAN_LENGTH);
    }
}
