use argon2::Argon2;
use uuid::Uuid;

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the account's id as a salt.
pub fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// The message shown for any failed credential check, so callers cannot
/// tell an unknown email from a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials. Please check the email and password.";

pub const EMAIL_TAKEN: &str = "A user with the same email already exists.";
