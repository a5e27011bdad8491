//! Hash and password-scheme functions available in templates.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Alphabet of the crypt(3) base64 variant.
const CRYPT64: &[u8] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const MD5CRYPT_SALT: usize = 4;
const SSHA_SALT: usize = 32;

pub(super) fn md5sum(s: &str) -> String {
    format!("{:x}", md5::compute(s.as_bytes()))
}

pub(super) fn sha1sum(s: &str) -> String {
    Sha1::digest(s.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Salt length from an optional leading argument. Out-of-range values fall
/// back to `default`.
pub(super) fn salt_len(arg: Option<&str>, max: usize, default: usize) -> usize {
    arg.and_then(|a| a.parse::<usize>().ok())
        .filter(|n| (1..=max).contains(n))
        .unwrap_or(default)
}

pub(super) fn md5crypt(password: &str, salt_arg: Option<&str>) -> String {
    let len = salt_len(salt_arg, 8, MD5CRYPT_SALT);
    let mut rng = rand::thread_rng();
    let salt: String = (0..len)
        .map(|_| CRYPT64[rng.gen_range(0..CRYPT64.len())] as char)
        .collect();
    md5crypt_with_salt(password.as_bytes(), salt.as_bytes())
}

/// FreeBSD MD5-crypt (`$1$`).
pub(super) fn md5crypt_with_salt(pw: &[u8], salt: &[u8]) -> String {
    let mut alt = md5::Context::new();
    alt.consume(pw);
    alt.consume(salt);
    alt.consume(pw);
    let alt = alt.compute();

    let mut ctx = md5::Context::new();
    ctx.consume(pw);
    ctx.consume(b"$1$");
    ctx.consume(salt);
    let mut left = pw.len();
    while left > 0 {
        let n = left.min(16);
        ctx.consume(&alt.0[..n]);
        left -= n;
    }
    let mut bits = pw.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.consume([0u8]);
        } else {
            ctx.consume(&pw[..1]);
        }
        bits >>= 1;
    }
    let mut digest = ctx.compute().0;

    for round in 0..1000 {
        let mut c = md5::Context::new();
        if round & 1 == 1 {
            c.consume(pw);
        } else {
            c.consume(digest);
        }
        if round % 3 != 0 {
            c.consume(salt);
        }
        if round % 7 != 0 {
            c.consume(pw);
        }
        if round & 1 == 1 {
            c.consume(digest);
        } else {
            c.consume(pw);
        }
        digest = c.compute().0;
    }

    let d = digest;
    let mut out = String::with_capacity(22);
    for (a, b, c) in [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)] {
        let v = (u32::from(d[a]) << 16) | (u32::from(d[b]) << 8) | u32::from(d[c]);
        crypt64(&mut out, v, 4);
    }
    crypt64(&mut out, u32::from(d[11]), 2);

    format!("$1${}${}", String::from_utf8_lossy(salt), out)
}

fn crypt64(out: &mut String, mut v: u32, n: usize) {
    for _ in 0..n {
        out.push(CRYPT64[(v & 0x3f) as usize] as char);
        v >>= 6;
    }
}

/// Salted SHA scheme as used by LDAP: `{PREFIX}base64(digest || salt)`.
pub(super) fn ssha<D: Digest>(prefix: &str, password: &str, salt_arg: Option<&str>) -> String {
    let len = salt_len(salt_arg, 64, SSHA_SALT);
    let mut salt = vec![0u8; len];
    rand::thread_rng().fill(salt.as_mut_slice());
    ssha_with_salt::<D>(prefix, password.as_bytes(), &salt)
}

pub(super) fn ssha_with_salt<D: Digest>(prefix: &str, pw: &[u8], salt: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(pw);
    hasher.update(salt);
    let mut raw = hasher.finalize().to_vec();
    raw.extend_from_slice(salt);
    format!("{{{}}}{}", prefix, STANDARD.encode(raw))
}

pub(super) fn ssha1(password: &str, salt: Option<&str>) -> String {
    ssha::<Sha1>("SSHA", password, salt)
}

pub(super) fn ssha256(password: &str, salt: Option<&str>) -> String {
    ssha::<Sha256>("SSHA256", password, salt)
}

pub(super) fn ssha512(password: &str, salt: Option<&str>) -> String {
    ssha::<Sha512>("SSHA512", password, salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digests() {
        assert_eq!(md5sum("bar"), "37b51d194a7513e45b56f6524f2d51f2");
        assert_eq!(sha1sum("bar"), "62cdb7020ff920e5aa642c3d4066950dd1f01f4d");
    }

    #[test]
    fn test_md5crypt_shape() {
        let a = md5crypt_with_salt(b"password", b"saltsalt");
        let b = md5crypt_with_salt(b"password", b"saltsalt");
        assert_eq!(a, b);
        assert!(a.starts_with("$1$saltsalt$"));
        assert_eq!(a.len(), "$1$saltsalt$".len() + 22);
        assert!(a[12..].bytes().all(|c| CRYPT64.contains(&c)));
        assert_ne!(a, md5crypt_with_salt(b"passwort", b"saltsalt"));

        let random = md5crypt("pw", None);
        assert_eq!(random.split('$').nth(2).unwrap().len(), 4);
    }

    #[test]
    fn test_ssha_verifies() {
        let out = ssha256("secret", Some("8"));
        let encoded = out.strip_prefix("{SSHA256}").unwrap();
        let raw = STANDARD.decode(encoded).unwrap();
        assert_eq!(raw.len(), 32 + 8);
        let (digest, salt) = raw.split_at(32);
        let mut h = Sha256::new();
        h.update(b"secret");
        h.update(salt);
        assert_eq!(h.finalize().as_slice(), digest);

        assert!(ssha1("x", None).starts_with("{SSHA}"));
        assert!(ssha512("x", None).starts_with("{SSHA512}"));
    }

    #[test]
    fn test_salt_len() {
        assert_eq!(salt_len(Some("6"), 8, 4), 6);
        assert_eq!(salt_len(Some("12"), 8, 4), 4);
        assert_eq!(salt_len(Some("abc"), 8, 4), 4);
        assert_eq!(salt_len(None, 64, 32), 32);
    }
}
