use argon2::{
    Argon2,
    password_hash::{
        PasswordHasher, SaltString,
        rand_core::{OsRng, RngCore},
    },
};

const TEMP_PASSWORD_LEN: usize = 12;

const LOWER: &[u8] = b"abcdefghijkmnpqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Uniform index in `0..len` (rejection sampling, no modulo bias).
fn random_index(len: usize) -> usize {
    let len = len as u32;
    let zone = u32::MAX - (u32::MAX % len);
    loop {
        let v = OsRng.next_u32();
        if v < zone {
            return (v % len) as usize;
        }
    }
}

fn pick(set: &[u8]) -> u8 {
    set[random_index(set.len())]
}

/// 12 characters with at least one lowercase, uppercase, digit and symbol.
/// Look-alike characters (`0 O 1 l I`) are left out.
pub fn generate_temp_password() -> String {
    let all: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS].concat();

    let mut chars = vec![pick(LOWER), pick(UPPER), pick(DIGITS), pick(SYMBOLS)];
    while chars.len() < TEMP_PASSWORD_LEN {
        chars.push(pick(&all));
    }

    // Fisher-Yates so the guaranteed classes are not always in front
    for i in (1..chars.len()).rev() {
        let j = random_index(i + 1);
        chars.swap(i, j);
    }

    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    #[test]
    fn temp_passwords_cover_every_class() {
        for _ in 0..50 {
            let pw = generate_temp_password();
            assert_eq!(pw.len(), TEMP_PASSWORD_LEN);
            assert!(pw.bytes().any(|b| LOWER.contains(&b)));
            assert!(pw.bytes().any(|b| UPPER.contains(&b)));
            assert!(pw.bytes().any(|b| DIGITS.contains(&b)));
            assert!(pw.bytes().any(|b| SYMBOLS.contains(&b)));
        }
        assert_ne!(generate_temp_password(), generate_temp_password());
    }

    #[test]
    fn hashes_verify() {
        let hash = hash_password("s3cret!Pass").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"s3cret!Pass", &parsed)
                .is_ok()
        );
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
