use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn payment_mac(secret: &str, order_id: &str, payment_id: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Some(mac)
}

/// Hex HMAC-SHA256 of `"{order_id}|{payment_id}"`, the signature the gateway
/// hands the client after a successful checkout.
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> String {
    payment_mac(secret, order_id, payment_id)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of a hex payment signature.
pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    match payment_mac(secret, order_id, payment_id) {
        Some(mac) => mac.verify_slice(&expected).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn valid_signature_verifies() {
        let sig = sign_payment(SECRET, "order_1", "pay_1");
        assert_eq!(sig.len(), 64);
        assert!(verify_payment_signature(SECRET, "order_1", "pay_1", &sig));
    }

    #[test]
    fn tampered_inputs_fail() {
        let sig = sign_payment(SECRET, "order_1", "pay_1");

        assert!(!verify_payment_signature(SECRET, "order_2", "pay_1", &sig));
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_2", &sig));
        assert!(!verify_payment_signature("other_secret", "order_1", "pay_1", &sig));

        let mut flipped = sig.clone().into_bytes();
        flipped[0] = if flipped[0] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_1", &flipped));
    }

    #[test]
    fn garbage_signature_fails() {
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_1", "not-hex"));
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_1", ""));
    }

    #[test]
    fn separator_is_part_of_the_message() {
        // "a|bc" and "ab|c" must not collide
        let sig = sign_payment(SECRET, "a", "bc");
        assert!(!verify_payment_signature(SECRET, "ab", "c", &sig));
    }
}
