use super::*;

#[test]
fn levenshtein_distance_basics() {
    assert_eq!(levenshtein_distance("queen", "queen"), 0);
    assert_eq!(levenshtein_distance("queen", "qeen"), 1);
    assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    assert_eq!(levenshtein_distance("", "abc"), 3);
    assert_eq!(levenshtein_distance("abc", ""), 3);
    assert_eq!(levenshtein_distance("", ""), 0);
    // transposition costs two edits
    assert_eq!(levenshtein_distance("beatles", "beatels"), 2);
}

#[test]
fn levenshtein_counts_chars_not_bytes() {
    assert_eq!(levenshtein_distance("björk", "bjork"), 1);
}

#[test]
fn identical_strings_score_one() {
    let sim = NormalizedLevenshtein;
    for name in ["queen", "the beatles", "sigur rós", "a", ""] {
        assert_eq!(sim.score(name, name), 1.0, "self-similarity of {name:?}");
    }
}

#[test]
fn dissimilar_strings_score_low() {
    let sim = NormalizedLevenshtein;
    assert_eq!(sim.score("abc", "xyz"), 0.0);
    assert!(sim.score("queen", "metallica") < 0.3);
}

#[test]
fn score_is_symmetric_and_bounded() {
    let sim = NormalizedLevenshtein;
    let pairs = [
        ("bohemian rhapsody", "bohemian rapsody"),
        ("radiohead", "radio head"),
        ("a", "abcdefgh"),
    ];
    for (a, b) in pairs {
        let ab = sim.score(a, b);
        assert_eq!(ab, sim.score(b, a));
        assert!((0.0..=1.0).contains(&ab));
    }
}

#[test]
fn score_hits_exact_fractions() {
    let sim = NormalizedLevenshtein;
    // 3 edits over 10 chars is exactly 0.7
    assert_eq!(sim.score("abcdefghij", "abcdefgxyz"), 0.7);
    assert_eq!(sim.score("queen", "qeen"), 0.8);
}

#[test]
fn closures_are_similarities() {
    let exact = |a: &str, b: &str| -> f64 { if a == b { 1.0 } else { 0.0 } };
    assert_eq!(exact.score("x", "x"), 1.0);
    assert_eq!(exact.score("x", "y"), 0.0);
}
