//! Synthetic interaction generator
//!
//! Seeds the graph with randomized demo interactions so the recommendation
//! queries return non-trivial results. For each demo user a random subset of
//! the corpus is drawn via an unbiased Fisher-Yates shuffle and upserted
//! with a random rank and a timestamp inside a fixed demo window. Re-running
//! lands on the same edges with fresh values: idempotent in existence, not
//! in value.
//!
//! Randomness happens while planning, before any store round trip; the
//! writes then fan out concurrently up to the configured limit.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use ludobot_common::errors::AppError;
use ludobot_common::models::{Added, Game, Liked, Requested, User, RANK_MAX, RANK_MIN};
use ludobot_common::GraphStore;
use rand::Rng;
use tracing::warn;

use crate::categories::CategoryIndex;
use crate::demo;

/// Start of the demo time window, seconds since the epoch
pub const DEMO_EPOCH_SECS: i64 = 160_613_000;

/// Width of the demo time window in seconds (~52 minutes)
pub const DEMO_JITTER_SECS: i64 = 3_124;

/// Unbiased Fisher-Yates shuffle; the swap target is drawn from the
/// inclusive range 0..=i so the last element can stay in place
pub fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Draw `n` distinct random items from the corpus; clamps to the corpus
/// size instead of erroring when `n` exceeds it
pub fn pick<'a, T>(corpus: &'a [T], n: usize, rng: &mut impl Rng) -> Vec<&'a T> {
    let mut indexes: Vec<usize> = (0..corpus.len()).collect();
    shuffle(&mut indexes, rng);
    indexes.truncate(n.min(corpus.len()));
    indexes.into_iter().map(|i| &corpus[i]).collect()
}

/// Uniform rank in RANK_MIN..=RANK_MAX
pub fn random_rank(rng: &mut impl Rng) -> i64 {
    rng.gen_range(RANK_MIN..=RANK_MAX)
}

/// Second-granularity timestamp inside the fixed demo window
pub fn demo_timestamp(rng: &mut impl Rng) -> DateTime<Utc> {
    let secs = DEMO_EPOCH_SECS + rng.gen_range(0..DEMO_JITTER_SECS);
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// One planned edge write
#[derive(Debug, Clone)]
pub enum InteractionWrite {
    AddedGame {
        user_id: i64,
        game_id: String,
        at: DateTime<Utc>,
    },
    LikedGame {
        user_id: i64,
        game_id: String,
        rank: i64,
        at: DateTime<Utc>,
    },
    LikedGenre {
        user_id: i64,
        genre_id: i64,
        rank: i64,
        at: DateTime<Utc>,
    },
    LikedPlatform {
        user_id: i64,
        platform_id: i64,
        rank: i64,
        at: DateTime<Utc>,
    },
    RequestedGame {
        user_id: i64,
        game_id: String,
        at: DateTime<Utc>,
    },
    OwnsPlatform {
        user_id: i64,
        platform_id: i64,
        at: DateTime<Utc>,
    },
}

impl InteractionWrite {
    async fn apply(&self, graph: &GraphStore) -> Result<(), AppError> {
        match self {
            InteractionWrite::AddedGame { user_id, game_id, at } => {
                graph.upsert_added(*user_id, game_id, &Added { at: *at }).await
            }
            InteractionWrite::LikedGame { user_id, game_id, rank, at } => {
                graph
                    .upsert_game_liked(*user_id, game_id, &Liked { rank: *rank, at: *at })
                    .await
            }
            InteractionWrite::LikedGenre { user_id, genre_id, rank, at } => {
                graph
                    .upsert_genre_liked(*user_id, *genre_id, &Liked { rank: *rank, at: *at })
                    .await
            }
            InteractionWrite::LikedPlatform { user_id, platform_id, rank, at } => {
                graph
                    .upsert_platform_liked(*user_id, *platform_id, &Liked { rank: *rank, at: *at })
                    .await
            }
            InteractionWrite::RequestedGame { user_id, game_id, at } => {
                graph
                    .upsert_requested(*user_id, game_id, &Requested { at: *at })
                    .await
            }
            InteractionWrite::OwnsPlatform { user_id, platform_id, at } => {
                graph.upsert_platform_owned(*user_id, *platform_id, *at).await
            }
        }
    }
}

/// Aggregate outcome of the seeding stage
#[derive(Debug, Clone, Copy)]
pub struct SeedReport {
    pub written: usize,
    pub failed: usize,
}

/// Draw every planned interaction for the demo roster
pub fn plan(
    users: &[User],
    games: &[Game],
    genres: &CategoryIndex,
    platforms: &CategoryIndex,
    rng: &mut impl Rng,
) -> Vec<InteractionWrite> {
    let mut writes = Vec::new();

    for (user, &qty) in users.iter().zip(demo::ADDED_GAMES.iter()) {
        for game in pick(games, qty, rng) {
            writes.push(InteractionWrite::AddedGame {
                user_id: user.id,
                game_id: game.id.clone(),
                at: demo_timestamp(rng),
            });
        }
    }

    for (user, &qty) in users.iter().zip(demo::LIKED_GAMES.iter()) {
        for game in pick(games, qty, rng) {
            writes.push(InteractionWrite::LikedGame {
                user_id: user.id,
                game_id: game.id.clone(),
                rank: random_rank(rng),
                at: demo_timestamp(rng),
            });
        }
    }

    for (user, &qty) in users.iter().zip(demo::LIKED_PLATFORMS.iter()) {
        for platform in pick(platforms.entries(), qty, rng) {
            writes.push(InteractionWrite::LikedPlatform {
                user_id: user.id,
                platform_id: platform.id,
                rank: random_rank(rng),
                at: demo_timestamp(rng),
            });
        }
    }

    for (user, &qty) in users.iter().zip(demo::LIKED_GENRES.iter()) {
        for genre in pick(genres.entries(), qty, rng) {
            writes.push(InteractionWrite::LikedGenre {
                user_id: user.id,
                genre_id: genre.id,
                rank: random_rank(rng),
                at: demo_timestamp(rng),
            });
        }
    }

    for (user, &qty) in users.iter().zip(demo::REQUESTED_GAMES.iter()) {
        for game in pick(games, qty, rng) {
            writes.push(InteractionWrite::RequestedGame {
                user_id: user.id,
                game_id: game.id.clone(),
                at: demo_timestamp(rng),
            });
        }
    }

    for (user, &qty) in users.iter().zip(demo::OWNED_PLATFORMS.iter()) {
        for platform in pick(platforms.entries(), qty, rng) {
            writes.push(InteractionWrite::OwnsPlatform {
                user_id: user.id,
                platform_id: platform.id,
                at: demo_timestamp(rng),
            });
        }
    }

    writes
}

/// Plan and upsert the whole synthetic interaction set. Individual write
/// failures are collected and reported in the aggregate, not aborted on.
pub async fn seed_interactions(
    graph: &GraphStore,
    users: &[User],
    games: &[Game],
    genres: &CategoryIndex,
    platforms: &CategoryIndex,
    concurrency: usize,
    progress: &ProgressBar,
) -> SeedReport {
    let writes = {
        let mut rng = rand::thread_rng();
        plan(users, games, genres, platforms, &mut rng)
    };
    progress.set_length(writes.len() as u64);

    let failed = stream::iter(&writes)
        .map(|write| async move {
            let outcome = write.apply(graph).await;
            progress.inc(1);
            outcome.err()
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|failure| async move { failure })
        .fold(0usize, |count, error| async move {
            warn!(error = %error, "Synthetic interaction write failed");
            count + 1
        })
        .await;

    SeedReport {
        written: writes.len() - failed,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludobot_common::models::GameRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game(id: &str) -> Game {
        Game {
            id: id.to_string(),
            record: GameRecord {
                basename: id.to_string(),
                name: id.to_string(),
                genre: "Action".to_string(),
                platform: "PC".to_string(),
                publisher: String::new(),
                developer: String::new(),
                critic_score: String::new(),
                user_score: String::new(),
                year: String::new(),
            },
        }
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut items: Vec<u32> = (0..100).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_can_leave_last_element_in_place() {
        // The inclusive upper bound allows the identity permutation; the
        // biased variant could never produce it for two elements.
        let mut seen_identity = false;
        let mut seen_swapped = false;
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut items = vec![0, 1];
            shuffle(&mut items, &mut rng);
            match items.as_slice() {
                [0, 1] => seen_identity = true,
                [1, 0] => seen_swapped = true,
                _ => unreachable!(),
            }
        }
        assert!(seen_identity && seen_swapped);
    }

    #[test]
    fn test_pick_clamps_to_corpus_size() {
        let mut rng = StdRng::seed_from_u64(3);
        let corpus = vec![game("a"), game("b")];
        let picked = pick(&corpus, 3, &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_pick_draws_distinct_items() {
        let mut rng = StdRng::seed_from_u64(11);
        let corpus: Vec<u32> = (0..10).collect();
        let picked = pick(&corpus, 5, &mut rng);
        let mut values: Vec<u32> = picked.into_iter().copied().collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn test_random_rank_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            let rank = random_rank(&mut rng);
            assert!((RANK_MIN..=RANK_MAX).contains(&rank));
        }
    }

    #[test]
    fn test_demo_timestamp_stays_in_window() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let at = demo_timestamp(&mut rng).timestamp();
            assert!(at >= DEMO_EPOCH_SECS);
            assert!(at < DEMO_EPOCH_SECS + DEMO_JITTER_SECS);
        }
    }

    #[test]
    fn test_plan_clamps_each_family_to_corpus() {
        let mut rng = StdRng::seed_from_u64(21);
        let users = crate::demo::demo_users();
        let games = vec![game("a"), game("b")];
        let genres = CategoryIndex::build("genre", ["Action, Drama"]);
        let platforms = CategoryIndex::build("platform", ["PC"]);

        let writes = plan(&users, &games, &genres, &platforms, &mut rng);

        let added = writes
            .iter()
            .filter(|w| matches!(w, InteractionWrite::AddedGame { .. }))
            .count();
        // quantities [400, 87, 0, 34, 58] all clamp to the 2-game corpus,
        // except the explicit zero
        assert_eq!(added, 2 + 2 + 0 + 2 + 2);

        let owned = writes
            .iter()
            .filter(|w| matches!(w, InteractionWrite::OwnsPlatform { .. }))
            .count();
        // single platform: [2, 1, 0, 3, 1] clamps to [1, 1, 0, 1, 1]
        assert_eq!(owned, 4);
    }
}
