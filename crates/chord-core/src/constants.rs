/// Minimum absolute embedding component that contributes a prime factor.
pub const ENCODE_THRESHOLD: f64 = 0.02;

/// Scale applied to |component| before flooring into an integer weight.
pub const WEIGHT_SCALE: f64 = 1000.0;

/// Harmonic overlap contributes at this fraction of direct overlap.
pub const HARMONIC_FACTOR: f64 = 0.3;

/// Resonance multiplier for words that also appear in recent context.
pub const CONTEXT_BOOST: f64 = 1.5;

/// Long-run identity blend: weight kept from the previous identity value.
pub const IDENTITY_RETENTION: f64 = 0.9;

/// Bounded text context kept on each user model.
pub const USER_CONTEXT_CAP: usize = 10;

/// Default conversation history cap.
pub const HISTORY_CAP: usize = 20;

/// Turns exposed to response generation.
pub const RECENT_WINDOW: usize = 5;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Relation nouns recognised in "my X's name is Y".
pub const RELATION_NOUNS: &[&str] = &[
    "wife", "husband", "dog", "cat", "car", "mother", "father", "sister", "brother",
];

/// Relations a "her" refers back to.
pub const FEMALE_RELATIONS: &[&str] = &[
    "wife",
    "mother",
    "sister",
    "daughter",
    "girlfriend",
    "aunt",
    "grandmother",
];

/// Relations a "his" refers back to.
pub const MALE_RELATIONS: &[&str] = &[
    "husband",
    "father",
    "brother",
    "son",
    "boyfriend",
    "uncle",
    "grandfather",
];

/// Pronouns that open a "{pronoun} name is X" statement.
pub const NAME_PRONOUNS: &[&str] = &["her", "his", "its", "their"];
