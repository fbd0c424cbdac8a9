use rand::RngCore;
use rand::rngs::OsRng;

const CROCKFORD: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Generates a root task ID: `tsq-` followed by 8 Crockford base32 characters
/// decoded from 40 random bits (`spec.md` §9, "ID generation"). Collision
/// retry is handled by the caller, which knows the existing task set.
pub fn make_root_id() -> String {
    let mut bytes = [0u8; 5];
    OsRng.fill_bytes(&mut bytes);
    let mut value: u64 = 0;
    for byte in bytes {
        value = (value << 8) | byte as u64;
    }
    let mut chars = [0u8; 8];
    for (i, slot) in chars.iter_mut().enumerate() {
        let shift = 35 - (i as u64) * 5;
        let index = ((value >> shift) & 0b11111) as usize;
        *slot = CROCKFORD[index];
    }
    format!("tsq-{}", std::str::from_utf8(&chars).expect("ascii"))
}

/// Generates the next child ID under `parent`, given the parent's current
/// counter. The counter is monotone so no collision retry is needed.
pub fn next_child_id(parent: &str, counter: u64) -> String {
    format!("{}.{}", parent, counter + 1)
}
