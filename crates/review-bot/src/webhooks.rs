//! GitHub webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 signature of the payload.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Header naming the event type.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the unique delivery ID.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `payload` - Raw webhook body bytes
/// * `signature_header` - Value of `X-Hub-Signature-256`, e.g. `sha256=<hex>`
/// * `secret` - Webhook shared secret
///
/// # Returns
/// `true` only if the header is well formed and the digest matches; every
/// malformed header yields `false`.
#[must_use]
pub fn verify_webhook_signature(payload: &[u8], signature_header: &str, secret: &str) -> bool {
    if signature_header.is_empty() {
        return false;
    }

    let Some((algorithm, digest)) = signature_header.split_once('=') else {
        return false;
    };
    if algorithm != "sha256" {
        return false;
    }

    let Ok(signature_bytes) = hex::decode(digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed[..].ct_eq(signature_bytes.as_slice()).into()
}

/// Parsed webhook headers
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    /// Unique delivery ID
    pub delivery_id: Option<String>,
    /// Event type
    pub event_type: Option<String>,
    /// HMAC signature
    pub signature: Option<String>,
}

impl WebhookHeaders {
    /// Parse headers from a request
    #[must_use]
    pub fn from_header_map(get_header: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            delivery_id: get_header(DELIVERY_HEADER),
            event_type: get_header(EVENT_HEADER),
            signature: get_header(SIGNATURE_HEADER),
        }
    }
}
