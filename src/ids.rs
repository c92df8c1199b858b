use chrono::Utc;
use rand::Rng;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36_DIGITS[rng.random_range(0..36)] as char)
        .collect()
}

fn epoch_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// `code_<epoch millis>_<7 random base36 chars>`; best-effort unique only.
pub fn generate_code_id() -> String {
    format!("code_{}_{}", epoch_millis(), random_base36(7))
}

/// `<epoch millis in base36>-<random base36>`
pub fn generate_invite_code() -> String {
    format!("{}-{}", to_base36(epoch_millis()), random_base36(11))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_296), "100");
    }

    #[test]
    fn test_code_id_format() {
        let id = generate_code_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "code");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 7);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_invite_code_format() {
        let code = generate_invite_code();
        let (stamp, random) = code.split_once('-').expect("invite code has a dash");
        assert!(u64::from_str_radix(stamp, 36).is_ok());
        assert_eq!(random.len(), 11);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_code_id(), generate_code_id());
        assert_ne!(generate_invite_code(), generate_invite_code());
    }
}
