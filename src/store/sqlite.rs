//! SQLite 存储
//!
//! 表：panelists / proposals / reviews；列表型与嵌套字段存 JSON 文本。
//! WAL + 外键开启，评审通过外键级联随评审人/提案一起删除。

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::core::PanelError;
use crate::model::{
    CategoryScores, Feedback, Panelist, PersonalityScores, Proposal, ProposalStatus,
    Recommendation, Review, TraceStep, UserFeedback,
};
use crate::store::ReviewStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn store_err(context: &str, err: impl std::fmt::Display) -> PanelError {
    PanelError::Store(format!("{}: {}", context, err))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, PanelError> {
    serde_json::to_string(value).map_err(|e| store_err("serialize column", e))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, PanelError> {
    serde_json::from_str(raw).map_err(|e| store_err("deserialize column", e))
}

fn parse_uuid(raw: &str) -> Result<Uuid, PanelError> {
    Uuid::parse_str(raw).map_err(|e| store_err("parse uuid column", e))
}

/// panelists 行的原始列值，转换成领域类型前的中转
struct RawPanelist {
    id: String,
    name: String,
    email: Option<String>,
    bio: Option<String>,
    profile_url: Option<String>,
    expertise: String,
    publications: String,
    affiliations: String,
    critical: f64,
    openness: f64,
    seriousness: f64,
}

impl RawPanelist {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            bio: row.get(3)?,
            profile_url: row.get(4)?,
            expertise: row.get(5)?,
            publications: row.get(6)?,
            affiliations: row.get(7)?,
            critical: row.get(8)?,
            openness: row.get(9)?,
            seriousness: row.get(10)?,
        })
    }

    fn into_panelist(self) -> Result<Panelist, PanelError> {
        Ok(Panelist {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            bio: self.bio,
            profile_url: self.profile_url,
            expertise: from_json(&self.expertise)?,
            publications: from_json(&self.publications)?,
            affiliations: from_json(&self.affiliations)?,
            personality: PersonalityScores {
                critical: self.critical,
                openness: self.openness,
                seriousness: self.seriousness,
            },
        })
    }
}

struct RawReview {
    id: String,
    proposal_id: String,
    panelist_id: String,
    overall_score: f64,
    recommendation: String,
    category_scores: String,
    feedback: String,
    trace: String,
    repair_notes: String,
    created_at: DateTime<Utc>,
    user_feedback: Option<String>,
}

impl RawReview {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            proposal_id: row.get(1)?,
            panelist_id: row.get(2)?,
            overall_score: row.get(3)?,
            recommendation: row.get(4)?,
            category_scores: row.get(5)?,
            feedback: row.get(6)?,
            trace: row.get(7)?,
            repair_notes: row.get(8)?,
            created_at: row.get(9)?,
            user_feedback: row.get(10)?,
        })
    }

    fn into_review(self) -> Result<Review, PanelError> {
        let recommendation = Recommendation::parse(&self.recommendation).ok_or_else(|| {
            PanelError::Store(format!("unknown recommendation '{}'", self.recommendation))
        })?;
        let user_feedback = match self.user_feedback {
            Some(raw) => Some(from_json::<UserFeedback>(&raw)?),
            None => None,
        };
        Ok(Review {
            id: parse_uuid(&self.id)?,
            proposal_id: parse_uuid(&self.proposal_id)?,
            panelist_id: parse_uuid(&self.panelist_id)?,
            overall_score: self.overall_score,
            recommendation,
            category_scores: from_json::<CategoryScores>(&self.category_scores)?,
            feedback: from_json::<Feedback>(&self.feedback)?,
            trace: from_json::<Vec<TraceStep>>(&self.trace)?,
            repair_notes: from_json::<Vec<String>>(&self.repair_notes)?,
            created_at: self.created_at,
            user_feedback,
        })
    }
}

const PANELIST_COLUMNS: &str = "id, name, email, bio, profile_url, expertise, publications, \
     affiliations, critical, openness, seriousness";
const REVIEW_COLUMNS: &str = "id, proposal_id, panelist_id, overall_score, recommendation, \
     category_scores, feedback, trace, repair_notes, created_at, user_feedback";

impl SqliteStore {
    /// 打开（或创建）数据库并建表
    pub fn open(db_path: &Path) -> Result<Self, PanelError> {
        let conn = Connection::open(db_path).map_err(|e| store_err("open database", e))?;
        Self::init(conn)
    }

    /// 仅内存数据库，测试用
    pub fn open_in_memory() -> Result<Self, PanelError> {
        let conn = Connection::open_in_memory().map_err(|e| store_err("open database", e))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, PanelError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| store_err("apply pragmas", e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS panelists (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT,
                bio TEXT,
                profile_url TEXT,
                expertise TEXT NOT NULL,
                publications TEXT NOT NULL,
                affiliations TEXT NOT NULL,
                critical REAL NOT NULL,
                openness REAL NOT NULL,
                seriousness REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                abstract_text TEXT,
                content TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                proposal_id TEXT NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
                panelist_id TEXT NOT NULL REFERENCES panelists(id) ON DELETE CASCADE,
                overall_score REAL NOT NULL,
                recommendation TEXT NOT NULL,
                category_scores TEXT NOT NULL,
                feedback TEXT NOT NULL,
                trace TEXT NOT NULL,
                repair_notes TEXT NOT NULL,
                created_at TEXT NOT NULL,
                user_feedback TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_proposal ON reviews(proposal_id);
            CREATE INDEX IF NOT EXISTS idx_reviews_panelist ON reviews(panelist_id);",
        )
        .map_err(|e| store_err("create tables", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PanelError> {
        self.conn
            .lock()
            .map_err(|_| PanelError::Store("connection mutex poisoned".to_string()))
    }
}

impl ReviewStore for SqliteStore {
    fn save_panelist(&self, panelist: &Panelist) -> Result<Uuid, PanelError> {
        panelist.personality.validate()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO panelists (id, name, email, bio, profile_url, expertise, publications,
                                    affiliations, critical, openness, seriousness)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                bio = excluded.bio,
                profile_url = excluded.profile_url,
                expertise = excluded.expertise,
                publications = excluded.publications,
                affiliations = excluded.affiliations,
                critical = excluded.critical,
                openness = excluded.openness,
                seriousness = excluded.seriousness",
            params![
                panelist.id.to_string(),
                panelist.name,
                panelist.email,
                panelist.bio,
                panelist.profile_url,
                to_json(&panelist.expertise)?,
                to_json(&panelist.publications)?,
                to_json(&panelist.affiliations)?,
                panelist.personality.critical,
                panelist.personality.openness,
                panelist.personality.seriousness,
            ],
        )
        .map_err(|e| store_err("save panelist", e))?;
        Ok(panelist.id)
    }

    fn get_panelist(&self, id: Uuid) -> Result<Option<Panelist>, PanelError> {
        let conn = self.conn()?;
        let row = conn.query_row(
            &format!("SELECT {} FROM panelists WHERE id = ?1", PANELIST_COLUMNS),
            params![id.to_string()],
            RawPanelist::from_row,
        );
        match row {
            Ok(raw) => Ok(Some(raw.into_panelist()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(store_err("get panelist", e)),
        }
    }

    fn list_panelists(&self) -> Result<Vec<Panelist>, PanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM panelists ORDER BY name",
                PANELIST_COLUMNS
            ))
            .map_err(|e| store_err("list panelists", e))?;
        let raws = stmt
            .query_map([], RawPanelist::from_row)
            .map_err(|e| store_err("list panelists", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list panelists", e))?;
        raws.into_iter().map(RawPanelist::into_panelist).collect()
    }

    fn delete_panelist(&self, id: Uuid) -> Result<bool, PanelError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM panelists WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| store_err("delete panelist", e))?;
        Ok(deleted > 0)
    }

    fn save_proposal(&self, proposal: &Proposal) -> Result<Uuid, PanelError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO proposals (id, title, abstract_text, content, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                abstract_text = excluded.abstract_text,
                content = excluded.content,
                status = excluded.status,
                created_at = excluded.created_at",
            params![
                proposal.id.to_string(),
                proposal.title,
                proposal.abstract_text,
                proposal.content,
                proposal.status.as_str(),
                proposal.created_at,
            ],
        )
        .map_err(|e| store_err("save proposal", e))?;
        Ok(proposal.id)
    }

    fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, PanelError> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT id, title, abstract_text, content, status, created_at
             FROM proposals WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                ))
            },
        );
        match row {
            Ok((id, title, abstract_text, content, status, created_at)) => {
                let status = ProposalStatus::parse(&status)
                    .ok_or_else(|| PanelError::Store(format!("unknown proposal status '{}'", status)))?;
                Ok(Some(Proposal {
                    id: parse_uuid(&id)?,
                    title,
                    abstract_text,
                    content,
                    status,
                    created_at,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(store_err("get proposal", e)),
        }
    }

    fn list_proposals(&self) -> Result<Vec<Proposal>, PanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, abstract_text, content, status, created_at
                 FROM proposals ORDER BY created_at",
            )
            .map_err(|e| store_err("list proposals", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, DateTime<Utc>>(5)?,
                ))
            })
            .map_err(|e| store_err("list proposals", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list proposals", e))?;

        rows.into_iter()
            .map(|(id, title, abstract_text, content, status, created_at)| {
                let status = ProposalStatus::parse(&status).ok_or_else(|| {
                    PanelError::Store(format!("unknown proposal status '{}'", status))
                })?;
                Ok(Proposal {
                    id: parse_uuid(&id)?,
                    title,
                    abstract_text,
                    content,
                    status,
                    created_at,
                })
            })
            .collect()
    }

    fn delete_proposal(&self, id: Uuid) -> Result<bool, PanelError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM proposals WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| store_err("delete proposal", e))?;
        Ok(deleted > 0)
    }

    fn set_proposal_status(&self, id: Uuid, status: ProposalStatus) -> Result<bool, PanelError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE proposals SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(|e| store_err("set proposal status", e))?;
        Ok(updated > 0)
    }

    fn save_review(&self, review: &Review) -> Result<Uuid, PanelError> {
        let user_feedback = match &review.user_feedback {
            Some(fb) => Some(to_json(fb)?),
            None => None,
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reviews (id, proposal_id, panelist_id, overall_score, recommendation,
                                  category_scores, feedback, trace, repair_notes, created_at,
                                  user_feedback)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                overall_score = excluded.overall_score,
                recommendation = excluded.recommendation,
                category_scores = excluded.category_scores,
                feedback = excluded.feedback,
                trace = excluded.trace,
                repair_notes = excluded.repair_notes,
                user_feedback = excluded.user_feedback",
            params![
                review.id.to_string(),
                review.proposal_id.to_string(),
                review.panelist_id.to_string(),
                review.overall_score,
                review.recommendation.as_str(),
                to_json(&review.category_scores)?,
                to_json(&review.feedback)?,
                to_json(&review.trace)?,
                to_json(&review.repair_notes)?,
                review.created_at,
                user_feedback,
            ],
        )
        .map_err(|e| store_err("save review", e))?;
        Ok(review.id)
    }

    fn get_review(&self, id: Uuid) -> Result<Option<Review>, PanelError> {
        let conn = self.conn()?;
        let row = conn.query_row(
            &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
            params![id.to_string()],
            RawReview::from_row,
        );
        match row {
            Ok(raw) => Ok(Some(raw.into_review()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(store_err("get review", e)),
        }
    }

    fn list_reviews(&self) -> Result<Vec<Review>, PanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM reviews ORDER BY created_at",
                REVIEW_COLUMNS
            ))
            .map_err(|e| store_err("list reviews", e))?;
        let raws = stmt
            .query_map([], RawReview::from_row)
            .map_err(|e| store_err("list reviews", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list reviews", e))?;
        raws.into_iter().map(RawReview::into_review).collect()
    }

    fn list_reviews_for_proposal(&self, proposal_id: Uuid) -> Result<Vec<Review>, PanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM reviews WHERE proposal_id = ?1 ORDER BY created_at",
                REVIEW_COLUMNS
            ))
            .map_err(|e| store_err("list reviews", e))?;
        let raws = stmt
            .query_map(params![proposal_id.to_string()], RawReview::from_row)
            .map_err(|e| store_err("list reviews", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list reviews", e))?;
        raws.into_iter().map(RawReview::into_review).collect()
    }

    fn list_reviews_for_panelist(&self, panelist_id: Uuid) -> Result<Vec<Review>, PanelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM reviews WHERE panelist_id = ?1 ORDER BY created_at",
                REVIEW_COLUMNS
            ))
            .map_err(|e| store_err("list reviews", e))?;
        let raws = stmt
            .query_map(params![panelist_id.to_string()], RawReview::from_row)
            .map_err(|e| store_err("list reviews", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_err("list reviews", e))?;
        raws.into_iter().map(RawReview::into_review).collect()
    }

    fn delete_review(&self, id: Uuid) -> Result<bool, PanelError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])
            .map_err(|e| store_err("delete review", e))?;
        Ok(deleted > 0)
    }

    fn attach_feedback(&self, review_id: Uuid, feedback: UserFeedback) -> Result<(), PanelError> {
        let conn = self.conn()?;
        let existing: Result<Option<String>, _> = conn.query_row(
            "SELECT user_feedback FROM reviews WHERE id = ?1",
            params![review_id.to_string()],
            |row| row.get(0),
        );
        match existing {
            Ok(Some(_)) => Err(PanelError::Validation(format!(
                "review {} already has user feedback",
                review_id
            ))),
            Ok(None) => {
                conn.execute(
                    "UPDATE reviews SET user_feedback = ?1 WHERE id = ?2",
                    params![to_json(&feedback)?, review_id.to_string()],
                )
                .map_err(|e| store_err("attach feedback", e))?;
                Ok(())
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(PanelError::Validation(format!(
                "review {} not found",
                review_id
            ))),
            Err(e) => Err(store_err("attach feedback", e)),
        }
    }
}
