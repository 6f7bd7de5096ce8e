use rand::{thread_rng, Rng};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random room code of the given length, drawn from `[A-Z0-9]`
pub fn random_code(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod test {
    use super::{random_code, CODE_ALPHABET};

    #[test]
    fn codes_are_drawn_from_the_alphabet() {
        for _ in 0..100 {
            let code = random_code(4);

            assert_eq!(code.len(), 4);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }
}
