//! Demo roster and per-stage quantity vectors
//!
//! Configuration constants for the synthetic interaction generator: a fixed
//! roster of demo users and, for each interaction family, how many random
//! interactions to create per user (index-aligned with the roster).

use ludobot_common::models::User;

/// How many games each demo user has added
pub const ADDED_GAMES: [usize; 5] = [400, 87, 0, 34, 58];

/// How many games each demo user has liked
pub const LIKED_GAMES: [usize; 5] = [280, 34, 98, 254, 0];

/// How many platforms each demo user has liked
pub const LIKED_PLATFORMS: [usize; 5] = [300, 674, 0, 45, 36];

/// How many genres each demo user has liked
pub const LIKED_GENRES: [usize; 5] = [22, 3, 0, 4, 7];

/// How many games each demo user has requested
pub const REQUESTED_GAMES: [usize; 5] = [560, 12, 456, 25, 387];

/// How many platforms each demo user owns
pub const OWNED_PLATFORMS: [usize; 5] = [2, 1, 0, 3, 1];

fn build_user(
    id: i64,
    username: &str,
    first_name: &str,
    last_name: &str,
    language_code: &str,
    is_bot: bool,
) -> User {
    User {
        id,
        username: username.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        language_code: language_code.to_string(),
        is_bot,
    }
}

/// The fixed demo roster; ids come from the chat platform
pub fn demo_users() -> Vec<User> {
    vec![
        build_user(220987852, "ovesco", "guillaume", "", "fr", false),
        build_user(136451861, "thrudhvangr", "christopher", "", "fr", false),
        build_user(136451862, "NukedFace", "marcus", "", "fr", false),
        build_user(136451863, "lauralol", "laura", "", "fr", false),
        build_user(136451864, "Saumonlecitron", "jean-michel", "", "fr", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_aligns_with_quantity_vectors() {
        let users = demo_users();
        assert_eq!(users.len(), ADDED_GAMES.len());
        assert_eq!(users.len(), LIKED_GAMES.len());
        assert_eq!(users.len(), LIKED_PLATFORMS.len());
        assert_eq!(users.len(), LIKED_GENRES.len());
        assert_eq!(users.len(), REQUESTED_GAMES.len());
        assert_eq!(users.len(), OWNED_PLATFORMS.len());
    }

    #[test]
    fn test_roster_ids_are_distinct() {
        let users = demo_users();
        let mut ids: Vec<_> = users.iter().map(|u| u.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), users.len());
    }
}
