use uuid::Uuid;

/// Issues single-use decision tokens for emailed approve/reject links.
///
/// Tokens are v4 UUIDs drawn from the OS RNG (122 random bits) rendered as
/// 32 hex characters. They carry no expiry or signature: a token is valid
/// exactly while the request holding it is still pending, and the store
/// clears it on decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionTokenIssuer;

impl DecisionTokenIssuer {
    pub fn issue(&self) -> String {
        Uuid::new_v4().to_simple().to_string()
    }
}
