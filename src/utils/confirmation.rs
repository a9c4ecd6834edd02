use rand::Rng;

// Ambiguous characters (0/O, 1/I) are excluded so the code survives being
// read over the phone or scribbled on paper.
pub const CONFIRMATION_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CONFIRMATION_LENGTH: usize = 10;

// Collision handling (bounded retries against the unique column) lives in
// the ticket service; this only draws a candidate.
pub fn generate_confirmation_id() -> String {
    let mut rng = rand::thread_rng();
    (0..CONFIRMATION_LENGTH)
        .map(|_| CONFIRMATION_ALPHABET[rng.gen_range(0..CONFIRMATION_ALPHABET.len())] as char)
        .collect()
}
