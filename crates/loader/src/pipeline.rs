//! Pipeline orchestrator
//!
//! Runs the batch load as a strictly sequential list of stages; no stage
//! begins before the previous one has fully settled, and any stage failure
//! aborts the run with the stage name attached. Clearing is unconditional:
//! re-running the pipeline on populated stores is destroy-then-rebuild,
//! never merge. Store connections are opened once before the fallible
//! section and closed afterwards regardless of the outcome.

use std::path::Path;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use ludobot_common::errors::AppError;
use ludobot_common::models::Streamer;
use ludobot_common::{AppConfig, DocumentStore, GraphStore};
use tracing::{info, warn};
use validator::Validate;

use crate::categories::CategoryIndex;
use crate::demo;
use crate::errors::LoaderError;
use crate::populate;
use crate::source::{self, StreamerRow};
use crate::synthetic;

/// The sequential stages of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    ClearStores,
    LoadUsers,
    ParseSource,
    InsertDocuments,
    ReloadDocuments,
    BuildCategories,
    PopulateGraph,
    LinkStreamers,
    SyntheticInteractions,
    Close,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::ClearStores => "clear stores",
            Stage::LoadUsers => "load users",
            Stage::ParseSource => "parse source",
            Stage::InsertDocuments => "insert documents",
            Stage::ReloadDocuments => "reload documents",
            Stage::BuildCategories => "build categories",
            Stage::PopulateGraph => "populate graph",
            Stage::LinkStreamers => "link streamers",
            Stage::SyntheticInteractions => "synthetic interactions",
            Stage::Close => "close",
        };
        write!(f, "{name}")
    }
}

/// Aggregate outcome of a completed run
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub games: usize,
    pub genres: usize,
    pub platforms: usize,
    pub population_failures: usize,
    pub streamer_misses: usize,
    pub interactions_written: usize,
    pub interactions_failed: usize,
}

impl RunReport {
    /// Whether every per-item write succeeded as well
    pub fn is_clean(&self) -> bool {
        self.population_failures == 0 && self.streamer_misses == 0 && self.interactions_failed == 0
    }
}

/// The batch-load orchestrator
pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline once
    pub async fn run(&self) -> Result<RunReport, LoaderError> {
        info!(stage = %Stage::Connect, "Connecting stores");
        let document = DocumentStore::connect(&self.config.document)
            .await
            .map_err(|e| LoaderError::in_stage(Stage::Connect, e))?;
        let graph = match GraphStore::connect(&self.config.graph).await {
            Ok(graph) => graph,
            Err(e) => {
                document.close().await;
                return Err(LoaderError::in_stage(Stage::Connect, e));
            }
        };

        let result = match graph.prepare().await {
            Ok(()) => self.run_stages(&document, &graph).await,
            Err(e) => Err(LoaderError::in_stage(Stage::Connect, e)),
        };

        // The close stage runs even when an earlier stage failed
        info!(stage = %Stage::Close, "Closing store connections");
        document.close().await;
        drop(graph);

        result
    }

    async fn run_stages(
        &self,
        document: &DocumentStore,
        graph: &GraphStore,
    ) -> Result<RunReport, LoaderError> {
        let concurrency = self.config.loader.concurrency;

        info!(stage = %Stage::ClearStores, "Emptying both stores");
        document
            .clear()
            .await
            .map_err(|e| LoaderError::in_stage(Stage::ClearStores, e))?;
        graph
            .clear()
            .await
            .map_err(|e| LoaderError::in_stage(Stage::ClearStores, e))?;

        let users = demo::demo_users();
        info!(stage = %Stage::LoadUsers, users = users.len(), "Writing demo users to the graph");
        try_join_all(users.iter().map(|user| graph.upsert_user(user)))
            .await
            .map_err(|e| LoaderError::in_stage(Stage::LoadUsers, e))?;

        let games_csv = Path::new(&self.config.loader.games_csv);
        info!(stage = %Stage::ParseSource, path = %games_csv.display(), "Parsing catalog CSV");
        let rows = source::read_rows(games_csv)
            .map_err(|e| LoaderError::in_stage(Stage::ParseSource, e))?;

        // Row 0 is the header; remaining rows map positionally
        let mut records = Vec::with_capacity(rows.len().saturating_sub(1));
        for row in rows.iter().skip(1) {
            let record = source::game_from_row(row)
                .map_err(|e| LoaderError::in_stage(Stage::ParseSource, e))?;
            record.validate().map_err(|e| {
                LoaderError::in_stage(
                    Stage::ParseSource,
                    LoaderError::Row {
                        line: row.position().map(|p| p.line()).unwrap_or(0),
                        message: e.to_string(),
                    },
                )
            })?;
            records.push(record);
        }

        info!(stage = %Stage::InsertDocuments, records = records.len(), "Writing catalog to the document store");
        let bar = progress_bar(records.len() as u64, "insert");
        stream::iter(records.iter())
            .map(Ok::<_, AppError>)
            .try_for_each_concurrent(Some(concurrency.max(1)), |record| {
                let bar = &bar;
                async move {
                    document.insert_game(record).await?;
                    bar.inc(1);
                    Ok(())
                }
            })
            .await
            .map_err(|e| LoaderError::in_stage(Stage::InsertDocuments, e))?;
        bar.finish();

        // Load them back to get their store-assigned ids along
        info!(stage = %Stage::ReloadDocuments, "Reloading catalog with assigned ids");
        let games = document
            .get_all_games()
            .await
            .map_err(|e| LoaderError::in_stage(Stage::ReloadDocuments, e))?;

        info!(stage = %Stage::BuildCategories, "Deduplicating genres and platforms");
        let genres = CategoryIndex::build("genre", games.iter().map(|g| g.record.genre.as_str()));
        let platforms =
            CategoryIndex::build("platform", games.iter().map(|g| g.record.platform.as_str()));
        info!(
            genres = genres.len(),
            platforms = platforms.len(),
            "Category enumerations built"
        );

        info!(stage = %Stage::PopulateGraph, games = games.len(), "Linking catalog into the graph");
        let bar = progress_bar(games.len() as u64, "populate");
        let report = populate::link_catalog(graph, &games, &genres, &platforms, concurrency, &bar)
            .await
            .map_err(|e| LoaderError::in_stage(Stage::PopulateGraph, e))?;
        bar.finish();
        for failure in &report.failures {
            warn!(
                game_id = %failure.game_id,
                basename = %failure.basename,
                link_stage = %failure.stage,
                error = %failure.error,
                "Game upsert sequence failed"
            );
        }

        let streamer_misses = match &self.config.loader.streamers_csv {
            Some(path) => self.link_streamers(graph, Path::new(path)).await?,
            None => {
                info!(stage = %Stage::LinkStreamers, "No streamers CSV configured, skipping");
                0
            }
        };

        info!(stage = %Stage::SyntheticInteractions, "Seeding demo interactions");
        let bar = progress_bar(0, "interactions");
        let seeded = synthetic::seed_interactions(
            graph,
            &users,
            &games,
            &genres,
            &platforms,
            concurrency,
            &bar,
        )
        .await;
        bar.finish();

        Ok(RunReport {
            games: games.len(),
            genres: genres.len(),
            platforms: platforms.len(),
            population_failures: report.failures.len(),
            streamer_misses,
            interactions_written: seeded.written,
            interactions_failed: seeded.failed,
        })
    }

    /// Link streamer nodes to the games they play. Rows whose game has no
    /// catalog node are collected as misses, not fatal.
    async fn link_streamers(&self, graph: &GraphStore, path: &Path) -> Result<usize, LoaderError> {
        info!(stage = %Stage::LinkStreamers, path = %path.display(), "Linking streamers");
        let rows = source::read_rows(path)
            .map_err(|e| LoaderError::in_stage(Stage::LinkStreamers, e))?;

        let mut misses = 0;
        for row in rows.iter().skip(1) {
            let parsed = StreamerRow::from_row(row)
                .map_err(|e| LoaderError::in_stage(Stage::LinkStreamers, e))?;
            let streamer = Streamer {
                id: parsed.id.clone(),
                name: parsed.name.clone(),
            };
            for (game_name, count) in parsed.games_played() {
                match graph.upsert_streamer(&streamer, game_name, count).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(
                            streamer = %streamer.name,
                            game = %game_name,
                            "No catalog node for streamed game"
                        );
                        misses += 1;
                    }
                    Err(e) => {
                        warn!(
                            streamer = %streamer.name,
                            game = %game_name,
                            error = %e,
                            "Streamer link write failed"
                        );
                        misses += 1;
                    }
                }
            }
        }
        Ok(misses)
    }
}

fn progress_bar(len: u64, prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{prefix:>14} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(prefix.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::ClearStores.to_string(), "clear stores");
        assert_eq!(Stage::PopulateGraph.to_string(), "populate graph");
        assert_eq!(Stage::Close.to_string(), "close");
    }

    #[test]
    fn test_clean_report() {
        let report = RunReport {
            games: 10,
            genres: 3,
            platforms: 2,
            population_failures: 0,
            streamer_misses: 0,
            interactions_written: 40,
            interactions_failed: 0,
        };
        assert!(report.is_clean());

        let partial = RunReport {
            population_failures: 1,
            ..report
        };
        assert!(!partial.is_clean());
    }

    #[test]
    fn test_stage_failure_carries_stage_name() {
        let err = LoaderError::in_stage(
            Stage::ParseSource,
            LoaderError::Row {
                line: 4,
                message: "missing column".to_string(),
            },
        );
        let text = err.to_string();
        assert!(text.contains("parse source"));
    }
}
