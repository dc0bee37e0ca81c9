use rand::{distr::Alphanumeric, Rng};

pub const INVITE_TOKEN_LENGTH: usize = 48;

/// Single-use invitation token drawn from the thread-local CSPRNG.
pub fn generate_invite_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
