use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the webhook body signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-line-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the expected signature header value for a raw webhook body:
/// `sha256=` + base64(HMAC-SHA256(secret, body)).
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize webhook HMAC signer")?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        BASE64_STANDARD.encode(digest)
    ))
}

/// Verifies a webhook body against its signature header in constant time.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> Result<()> {
    let Some(digest_b64) = signature.trim().strip_prefix(SIGNATURE_PREFIX) else {
        bail!("webhook signature must use sha256=<base64> format");
    };
    let signature_bytes = BASE64_STANDARD
        .decode(digest_b64)
        .context("webhook signature digest is not valid base64")?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .context("failed to initialize webhook HMAC verifier")?;
    mac.update(body);
    mac.verify_slice(&signature_bytes)
        .map_err(|_| anyhow!("webhook signature verification failed"))
}
