//! Graph store adapter (Neo4j)
//!
//! Entities are labeled nodes, relations are directed typed edges. All
//! writes are Cypher MERGE upserts keyed by the uniqueness constraints
//! installed in `prepare()`. Two property-write policies are used:
//! - create-only (`ON CREATE SET`) for display names, which must not be
//!   clobbered by a later upsert of the same node
//! - overwrite-always (`ON CREATE SET` + `ON MATCH SET`) for user fields
//!   and edge rank/timestamp payloads
//!
//! Canonical edge schema:
//! `(Game)-[:BELONGS_TO]->(Genre)`, `(Game)-[:PLAYED_ON]->(Platform)`,
//! `(User)-[:LIKED|ADDED|REQUESTED]->(Game)`, `(User)-[:LIKED]->(Genre)`,
//! `(User)-[:LIKED|OWNS]->(Platform)`, `(Streamer)-[:PLAYS_TO]->(Game)`.

use chrono::{DateTime, Utc};
use neo4rs::{query, Graph};
use tracing::{debug, info};

use crate::config::GraphStoreConfig;
use crate::errors::{AppError, Result, StoreKind};
use crate::models::{Added, Category, Liked, Requested, Streamer, User};

/// Graph store handle, opened once and shared by all pipeline tasks
#[derive(Clone)]
pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    /// Connect to the graph server
    pub async fn connect(config: &GraphStoreConfig) -> Result<Self> {
        info!("Connecting to graph store...");

        let graph = Graph::new(config.uri.as_str(), config.user.as_str(), config.password.as_str())
            .await
            .map_err(|e| AppError::Connection {
                store: StoreKind::Graph,
                message: e.to_string(),
            })?;

        info!(uri = %config.uri, "Graph store connected");

        Ok(Self { graph })
    }

    /// Enforce the uniqueness constraints every upsert relies on
    pub async fn prepare(&self) -> Result<()> {
        let constraints = [
            "CREATE CONSTRAINT game_id IF NOT EXISTS FOR (g:Game) REQUIRE g.id IS UNIQUE",
            "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
        ];
        for constraint in constraints {
            self.graph.run(query(constraint)).await?;
        }
        Ok(())
    }

    /// Delete every node and edge
    pub async fn clear(&self) -> Result<()> {
        self.graph.run(query("MATCH (n) DETACH DELETE n")).await?;
        Ok(())
    }

    /// Upsert a catalog node; the display name is set on first creation only
    pub async fn upsert_game(&self, game_id: &str, basename: &str) -> Result<()> {
        let q = query(
            "MERGE (g:Game {id: $game_id})
               ON CREATE SET g.basename = $basename",
        )
        .param("game_id", game_id)
        .param("basename", basename);

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a genre node and link the game to it
    pub async fn upsert_genre(&self, game_id: &str, genre: &Category) -> Result<()> {
        let q = query(
            "MATCH (m:Game {id: $game_id})
             MERGE (g:Genre {id: $genre_id})
               ON CREATE SET g.name = $genre_name
             MERGE (m)-[r:BELONGS_TO]->(g)",
        )
        .param("game_id", game_id)
        .param("genre_id", genre.id)
        .param("genre_name", genre.name.as_str());

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a platform node and link the game to it
    pub async fn upsert_platform(&self, game_id: &str, platform: &Category) -> Result<()> {
        let q = query(
            "MATCH (m:Game {id: $game_id})
             MERGE (p:Platform {id: $platform_id})
               ON CREATE SET p.name = $platform_name
             MERGE (m)-[r:PLAYED_ON]->(p)",
        )
        .param("game_id", game_id)
        .param("platform_id", platform.id)
        .param("platform_name", platform.name.as_str());

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a user node; all fields are overwritten on every write
    pub async fn upsert_user(&self, user: &User) -> Result<()> {
        let q = query(
            "MERGE (u:User {id: $user_id})
               ON CREATE SET u.isBot = $is_bot,
                             u.firstName = $first_name,
                             u.lastName = $last_name,
                             u.username = $username,
                             u.languageCode = $language_code
               ON MATCH SET  u.isBot = $is_bot,
                             u.firstName = $first_name,
                             u.lastName = $last_name,
                             u.username = $username,
                             u.languageCode = $language_code",
        )
        .param("user_id", user.id)
        .param("is_bot", user.is_bot)
        .param("first_name", user.first_name.as_str())
        .param("last_name", user.last_name.as_str())
        .param("username", user.username.as_str())
        .param("language_code", user.language_code.as_str());

        self.graph.run(q).await?;
        debug!(user_id = user.id, "Upserted user");
        Ok(())
    }

    /// Upsert a LIKED edge from a user to a game; rank and timestamp are
    /// overwritten on re-upsert, the edge itself is never duplicated
    pub async fn upsert_game_liked(&self, user_id: i64, game_id: &str, liked: &Liked) -> Result<()> {
        let q = query(
            "MATCH (m:Game {id: $game_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:LIKED]->(m)
               ON CREATE SET r.rank = $rank, r.at = datetime($at)
               ON MATCH SET  r.rank = $rank, r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("game_id", game_id)
        .param("rank", liked.rank)
        .param("at", to_rfc3339(liked.at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a LIKED edge from a user to a genre
    pub async fn upsert_genre_liked(&self, user_id: i64, genre_id: i64, liked: &Liked) -> Result<()> {
        let q = query(
            "MATCH (g:Genre {id: $genre_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:LIKED]->(g)
               ON CREATE SET r.rank = $rank, r.at = datetime($at)
               ON MATCH SET  r.rank = $rank, r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("genre_id", genre_id)
        .param("rank", liked.rank)
        .param("at", to_rfc3339(liked.at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a LIKED edge from a user to a platform
    pub async fn upsert_platform_liked(
        &self,
        user_id: i64,
        platform_id: i64,
        liked: &Liked,
    ) -> Result<()> {
        let q = query(
            "MATCH (p:Platform {id: $platform_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:LIKED]->(p)
               ON CREATE SET r.rank = $rank, r.at = datetime($at)
               ON MATCH SET  r.rank = $rank, r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("platform_id", platform_id)
        .param("rank", liked.rank)
        .param("at", to_rfc3339(liked.at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert an OWNS edge from a user to a platform
    pub async fn upsert_platform_owned(
        &self,
        user_id: i64,
        platform_id: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let q = query(
            "MATCH (p:Platform {id: $platform_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:OWNS]->(p)
               ON CREATE SET r.at = datetime($at)
               ON MATCH SET  r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("platform_id", platform_id)
        .param("at", to_rfc3339(at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert an ADDED edge from a user to a game
    pub async fn upsert_added(&self, user_id: i64, game_id: &str, added: &Added) -> Result<()> {
        let q = query(
            "MATCH (m:Game {id: $game_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:ADDED]->(m)
               ON CREATE SET r.at = datetime($at)
               ON MATCH SET  r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("game_id", game_id)
        .param("at", to_rfc3339(added.at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a REQUESTED edge from a user to a game
    pub async fn upsert_requested(
        &self,
        user_id: i64,
        game_id: &str,
        requested: &Requested,
    ) -> Result<()> {
        let q = query(
            "MATCH (m:Game {id: $game_id})
             MATCH (u:User {id: $user_id})
             MERGE (u)-[r:REQUESTED]->(m)
               ON CREATE SET r.at = datetime($at)
               ON MATCH SET  r.at = datetime($at)",
        )
        .param("user_id", user_id)
        .param("game_id", game_id)
        .param("at", to_rfc3339(requested.at));

        self.graph.run(q).await?;
        Ok(())
    }

    /// Upsert a streamer node and its PLAYS_TO edge to a game, matched by
    /// basename. Returns false when no game with that basename exists, so
    /// the caller can collect the miss instead of writing nothing silently.
    pub async fn upsert_streamer(
        &self,
        streamer: &Streamer,
        game_basename: &str,
        count: i64,
    ) -> Result<bool> {
        let q = query(
            "MATCH (g:Game {basename: $basename})
             MERGE (s:Streamer {id: $streamer_id})
               ON CREATE SET s.name = $streamer_name
             MERGE (s)-[r:PLAYS_TO]->(g)
               ON CREATE SET r.count = $count
             RETURN count(g) AS matched",
        )
        .param("basename", game_basename)
        .param("streamer_id", streamer.id.as_str())
        .param("streamer_name", streamer.name.as_str())
        .param("count", count);

        let mut rows = self.graph.execute(q).await?;
        let matched = match rows.next().await? {
            Some(row) => row.get::<i64>("matched").unwrap_or(0),
            None => 0,
        };
        Ok(matched > 0)
    }

    /// Read back the LIKED edge between a user and a game, if any
    pub async fn get_game_liked(&self, user_id: i64, game_id: &str) -> Result<Option<Liked>> {
        let q = query(
            "MATCH (:User {id: $user_id})-[l:LIKED]-(:Game {id: $game_id})
             RETURN l.rank AS rank, toString(l.at) AS at",
        )
        .param("user_id", user_id)
        .param("game_id", game_id);

        let mut rows = self.graph.execute(q).await?;
        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let rank: i64 = row
            .get("rank")
            .map_err(|e| AppError::MalformedRecord(format!("liked edge without rank: {e}")))?;
        let at: String = row
            .get("at")
            .map_err(|e| AppError::MalformedRecord(format!("liked edge without timestamp: {e}")))?;
        let at = DateTime::parse_from_rfc3339(&at)
            .map_err(|e| AppError::MalformedRecord(format!("bad edge timestamp {at:?}: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(Liked { rank, at }))
    }

    /// Platforms reachable through the user's liked games, most frequent
    /// first. This is the representative recommendation read; the query runs
    /// verbatim in the store, no scoring happens here.
    pub async fn recommend_platforms(&self, user_id: i64) -> Result<Vec<(String, i64)>> {
        let q = query(
            "MATCH (u:User {id: $user_id})-[l:LIKED]->(m:Game)-[:PLAYED_ON]->(p:Platform)
             RETURN p.name AS name, count(*) AS freq
             ORDER BY freq DESC
             LIMIT 5",
        )
        .param("user_id", user_id);

        let mut rows = self.graph.execute(q).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let name: String = row.get("name").unwrap_or_default();
            let freq: i64 = row.get("freq").unwrap_or(0);
            out.push((name, freq));
        }
        Ok(out)
    }
}

fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
