use std::time::{SystemTime, UNIX_EPOCH};

pub(super) fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

/// Uniformly picks one index out of `len`, or `None` when empty.
pub(super) fn pick_index<R: rand::Rng>(rng: &mut R, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(rng.random_range(0..len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(pick_index(&mut rng, 0), None);
        for _ in 0..100 {
            let idx = pick_index(&mut rng, 3).expect("non-empty");
            assert!(idx < 3);
        }
    }
}
