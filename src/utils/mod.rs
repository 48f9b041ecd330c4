pub mod encoding;
pub mod fuzzy;

pub use encoding::{decode, encode};
pub use fuzzy::{find_near_matches, levenshtein_distance};
