pub mod short_id;

pub use short_id::{
    MAX_DERIVE_ATTEMPTS, MAX_SHORT_ID_LENGTH, SHORT_ID_ALPHABET, candidates, derive,
    derive_with_counter, is_valid_short_id,
};
