//! Graph population stage
//!
//! Links the reloaded catalog into the graph: one node per game, one typed
//! edge per trimmed categorical token. Games are processed concurrently up
//! to the configured limit; within one game the node upsert completes
//! before any of its edges is attempted. Store failures are collected per
//! game and reported in aggregate; a token missing from its enumeration is
//! fatal and detected before any write.

use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use ludobot_common::errors::{AppError, Result};
use ludobot_common::models::{Category, Game};
use ludobot_common::GraphStore;
use tracing::instrument;

use crate::categories::{split_tokens, CategoryIndex};

/// Which step of a game's upsert sequence failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    Node,
    GenreEdge,
    PlatformEdge,
}

impl std::fmt::Display for LinkStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStage::Node => write!(f, "node upsert"),
            LinkStage::GenreEdge => write!(f, "genre edge upsert"),
            LinkStage::PlatformEdge => write!(f, "platform edge upsert"),
        }
    }
}

/// One game whose upsert sequence failed mid-way
#[derive(Debug)]
pub struct EntityFailure {
    pub game_id: String,
    pub basename: String,
    pub stage: LinkStage,
    pub error: AppError,
}

/// Aggregate outcome of the population stage
#[derive(Debug)]
pub struct PopulationReport {
    pub attempted: usize,
    pub failures: Vec<EntityFailure>,
}

impl PopulationReport {
    pub fn completed(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Check every categorical token of every game against its enumeration
/// before any write happens. An unknown token signals the enumeration was
/// built from a different corpus; aborting here keeps the graph untouched.
pub fn validate_links(
    games: &[Game],
    genres: &CategoryIndex,
    platforms: &CategoryIndex,
) -> Result<()> {
    for game in games {
        for token in split_tokens(&game.record.genre) {
            genres.id_of(token)?;
        }
        for token in split_tokens(&game.record.platform) {
            platforms.id_of(token)?;
        }
    }
    Ok(())
}

/// Upsert every game node and its category edges
pub async fn link_catalog(
    graph: &GraphStore,
    games: &[Game],
    genres: &CategoryIndex,
    platforms: &CategoryIndex,
    concurrency: usize,
    progress: &ProgressBar,
) -> Result<PopulationReport> {
    validate_links(games, genres, platforms)?;

    let failures: Vec<EntityFailure> = stream::iter(games)
        .map(|game| async move {
            let outcome = link_game(graph, game, genres, platforms).await;
            progress.inc(1);
            outcome.err()
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|failure| async move { failure })
        .collect()
        .await;

    Ok(PopulationReport {
        attempted: games.len(),
        failures,
    })
}

#[instrument(skip_all, fields(game_id = %game.id))]
async fn link_game(
    graph: &GraphStore,
    game: &Game,
    genres: &CategoryIndex,
    platforms: &CategoryIndex,
) -> std::result::Result<(), EntityFailure> {
    let fail = |stage: LinkStage, error: AppError| EntityFailure {
        game_id: game.id.clone(),
        basename: game.record.basename.clone(),
        stage,
        error,
    };

    // The node must be visible before its edges are attempted
    graph
        .upsert_game(&game.id, &game.record.basename)
        .await
        .map_err(|e| fail(LinkStage::Node, e))?;

    let genre_edges = split_tokens(&game.record.genre).map(|token| async move {
        let category = Category {
            id: genres.id_of(token)?,
            name: token.to_string(),
        };
        graph.upsert_genre(&game.id, &category).await
    });
    try_join_all(genre_edges)
        .await
        .map_err(|e| fail(LinkStage::GenreEdge, e))?;

    let platform_edges = split_tokens(&game.record.platform).map(|token| async move {
        let category = Category {
            id: platforms.id_of(token)?,
            name: token.to_string(),
        };
        graph.upsert_platform(&game.id, &category).await
    });
    try_join_all(platform_edges)
        .await
        .map_err(|e| fail(LinkStage::PlatformEdge, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludobot_common::models::GameRecord;

    fn game(id: &str, genre: &str, platform: &str) -> Game {
        Game {
            id: id.to_string(),
            record: GameRecord {
                basename: id.to_string(),
                name: id.to_string(),
                genre: genre.to_string(),
                platform: platform.to_string(),
                publisher: String::new(),
                developer: String::new(),
                critic_score: String::new(),
                user_score: String::new(),
                year: String::new(),
            },
        }
    }

    #[test]
    fn test_validate_links_accepts_matching_enumeration() {
        let games = vec![game("a", "Action, Drama", "PC"), game("b", "Drama", "PC, Xbox")];
        let genres =
            CategoryIndex::build("genre", games.iter().map(|g| g.record.genre.as_str()));
        let platforms =
            CategoryIndex::build("platform", games.iter().map(|g| g.record.platform.as_str()));
        assert!(validate_links(&games, &genres, &platforms).is_ok());
    }

    #[test]
    fn test_validate_links_rejects_stale_enumeration() {
        let games = vec![game("a", "Action", "PC")];
        // Enumerations computed from a different corpus
        let genres = CategoryIndex::build("genre", ["Sports"]);
        let platforms = CategoryIndex::build("platform", ["PC"]);
        let err = validate_links(&games, &genres, &platforms).unwrap_err();
        assert!(matches!(err, AppError::LookupInconsistency { .. }));
    }

    #[test]
    fn test_report_distinguishes_partial_failure() {
        let complete = PopulationReport {
            attempted: 3,
            failures: Vec::new(),
        };
        assert!(complete.is_complete());
        assert_eq!(complete.completed(), 3);

        let partial = PopulationReport {
            attempted: 3,
            failures: vec![EntityFailure {
                game_id: "a".to_string(),
                basename: "a".to_string(),
                stage: LinkStage::GenreEdge,
                error: AppError::MalformedRecord("boom".to_string()),
            }],
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.completed(), 2);
    }
}
