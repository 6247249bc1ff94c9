//! Closed-form odds used by the power-up heuristics.

/// Chance that one uniformly random unseen card is the partner of a known
/// card, with `pairs_remaining` pairs left and no memory at all.
pub fn random_match_prob(pairs_remaining: usize) -> f64 {
    if pairs_remaining == 0 {
        return 0.0;
    }
    1.0 / (2 * pairs_remaining - 1) as f64
}

/// `C(n, k)` as a float; zero when `k > n`.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Expected number of complete pairs inside `revealed` cards drawn uniformly
/// from the `2 * pairs_remaining` cards left: `P * C(2P-2, k-2) / C(2P, k)`.
pub fn expected_pairs_from_reveal(pairs_remaining: usize, revealed: usize) -> f64 {
    let cards = 2 * pairs_remaining;
    if pairs_remaining < 2 || revealed < 2 || revealed > cards {
        return 0.0;
    }
    pairs_remaining as f64 * binomial(cards - 2, revealed - 2) / binomial(cards, revealed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_random_match_prob() {
        assert_eq!(random_match_prob(0), 0.0);
        assert_eq!(random_match_prob(1), 1.0);
        for p in 1..50 {
            assert!((random_match_prob(p) - 1.0 / (2 * p - 1) as f64).abs() < EPS);
        }
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 0), 1.0);
        assert!((binomial(5, 2) - 10.0).abs() < EPS);
        assert!((binomial(20, 9) - 167_960.0).abs() < 1e-6);
        assert_eq!(binomial(3, 4), 0.0);
    }

    #[test]
    fn test_reveal_of_nine_matches_reference_table() {
        // k(k-1) / (2(2P-1)) once the nine cards fit on the board.
        let table = [
            (1, 0.0),
            (2, 0.0),
            (3, 0.0),
            (4, 0.0),
            (5, 72.0 / 18.0),
            (6, 72.0 / 22.0),
            (7, 72.0 / 26.0),
            (8, 72.0 / 30.0),
            (9, 72.0 / 34.0),
            (10, 72.0 / 38.0),
        ];
        for (p, expected) in table {
            let ev = expected_pairs_from_reveal(p, 9);
            assert!((ev - expected).abs() < 1e-9, "P={} gave {} expected {}", p, ev, expected);
        }
        assert!((expected_pairs_from_reveal(6, 9) - 3.272_727_272_7).abs() < 1e-9);
    }

    #[test]
    fn test_reveal_degenerate_inputs() {
        assert_eq!(expected_pairs_from_reveal(0, 9), 0.0);
        assert_eq!(expected_pairs_from_reveal(1, 2), 0.0);
        assert_eq!(expected_pairs_from_reveal(5, 1), 0.0);
        assert_eq!(expected_pairs_from_reveal(3, 7), 0.0);
        // Revealing everything shows every pair.
        assert!((expected_pairs_from_reveal(4, 8) - 4.0).abs() < EPS);
        assert!((expected_pairs_from_reveal(2, 2) - 1.0 / 3.0).abs() < EPS);
    }
}
