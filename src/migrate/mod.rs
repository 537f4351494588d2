//! Idempotent import of the JSON data files into the database

mod source;

use anyhow::{Context, Result};
use duckdb::params;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::models::{
    Entity, Question, QuestionRecord, Stat, StatRecord, Ticket, TicketRecord, User, UserRecord,
};
pub use source::{read_json, SourceError};

/// Per-entity counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityOutcome {
    pub inserted: usize,
    pub skipped_missing_key: usize,
    pub skipped_existing: usize,
}

/// Counts for all four entities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub users: EntityOutcome,
    pub questions: EntityOutcome,
    pub stats: EntityOutcome,
    pub tickets: EntityOutcome,
    pub committed: bool,
}

impl MigrationReport {
    pub fn outcome(&self, entity: Entity) -> &EntityOutcome {
        match entity {
            Entity::Users => &self.users,
            Entity::Questions => &self.questions,
            Entity::Stats => &self.stats,
            Entity::Tickets => &self.tickets,
        }
    }

    pub fn total_inserted(&self) -> usize {
        Entity::ALL.iter().map(|e| self.outcome(*e).inserted).sum()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entity in Entity::ALL {
            writeln!(f, "{} inserted: {}", entity, self.outcome(entity).inserted)?;
        }
        if self.committed {
            write!(f, "Migration complete (idempotent, no duplicates).")
        } else {
            write!(f, "Dry run complete, nothing was committed.")
        }
    }
}

/// Rows waiting for the final commit, plus the keys already claimed in this run
#[derive(Debug, Default)]
pub struct StagedInserts {
    pub users: Vec<User>,
    pub questions: Vec<Question>,
    pub stats: Vec<Stat>,
    pub tickets: Vec<Ticket>,
    keys: HashMap<Entity, HashSet<String>>,
}

impl StagedInserts {
    pub fn len(&self) -> usize {
        self.users.len() + self.questions.len() + self.stats.len() + self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, entity: Entity, key: &str) -> bool {
        self.keys.get(&entity).is_some_and(|keys| keys.contains(key))
    }

    fn claim(&mut self, entity: Entity, key: &str) {
        self.keys.entry(entity).or_default().insert(key.to_string());
    }
}

pub struct Migrator {
    db: Database,
    data_dir: PathBuf,
}

impl Migrator {
    pub fn new(db: Database, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Stage all four entities, then write everything in one transaction.
    pub fn run(&self) -> Result<MigrationReport> {
        let (mut report, staged) = self.stage_all()?;
        self.commit(&staged)?;
        report.committed = true;
        Ok(report)
    }

    /// Same as [`Migrator::run`] without the commit.
    pub fn plan(&self) -> Result<MigrationReport> {
        let (report, staged) = self.stage_all()?;
        if staged.is_empty() {
            tracing::info!("Dry run: nothing to insert");
        } else {
            tracing::info!("Dry run: discarding {} staged rows", staged.len());
        }
        Ok(report)
    }

    fn stage_all(&self) -> Result<(MigrationReport, StagedInserts)> {
        let mut staged = StagedInserts::default();
        let report = MigrationReport {
            users: self.migrate_users(&mut staged)?,
            questions: self.migrate_questions(&mut staged)?,
            stats: self.migrate_stats(&mut staged)?,
            tickets: self.migrate_tickets(&mut staged)?,
            committed: false,
        };
        Ok((report, staged))
    }

    pub fn migrate_users(&self, staged: &mut StagedInserts) -> Result<EntityOutcome> {
        let entity = Entity::Users;
        let records: Vec<UserRecord> = read_json(&self.data_dir, entity.file_name())?;
        let mut outcome = EntityOutcome::default();

        for record in records {
            let Some(user) = record.into_user() else {
                tracing::debug!("Skipping user without username");
                outcome.skipped_missing_key += 1;
                continue;
            };
            if self.claim_if_new(entity, &user.username, staged, &mut outcome)? {
                staged.users.push(user);
            }
        }

        log_outcome(entity, &outcome);
        Ok(outcome)
    }

    pub fn migrate_questions(&self, staged: &mut StagedInserts) -> Result<EntityOutcome> {
        let entity = Entity::Questions;
        let records: Vec<QuestionRecord> = read_json(&self.data_dir, entity.file_name())?;
        let mut outcome = EntityOutcome::default();

        for record in records {
            let Some(question) = record.into_question() else {
                tracing::debug!("Skipping question without id");
                outcome.skipped_missing_key += 1;
                continue;
            };
            if self.claim_if_new(entity, &question.id, staged, &mut outcome)? {
                staged.questions.push(question);
            }
        }

        log_outcome(entity, &outcome);
        Ok(outcome)
    }

    pub fn migrate_stats(&self, staged: &mut StagedInserts) -> Result<EntityOutcome> {
        let entity = Entity::Stats;
        let records: BTreeMap<String, StatRecord> = read_json(&self.data_dir, entity.file_name())?;
        let mut outcome = EntityOutcome::default();

        for (question_id, record) in records {
            let Some(stat) = record.into_stat(question_id) else {
                tracing::debug!("Skipping stat with empty question id");
                outcome.skipped_missing_key += 1;
                continue;
            };
            if self.claim_if_new(entity, &stat.question_id, staged, &mut outcome)? {
                staged.stats.push(stat);
            }
        }

        log_outcome(entity, &outcome);
        Ok(outcome)
    }

    pub fn migrate_tickets(&self, staged: &mut StagedInserts) -> Result<EntityOutcome> {
        let entity = Entity::Tickets;
        let records: Vec<TicketRecord> = read_json(&self.data_dir, entity.file_name())?;
        let mut outcome = EntityOutcome::default();

        for record in records {
            let Some(ticket) = record.into_ticket() else {
                tracing::debug!("Skipping ticket without id");
                outcome.skipped_missing_key += 1;
                continue;
            };
            if self.claim_if_new(entity, &ticket.id, staged, &mut outcome)? {
                staged.tickets.push(ticket);
            }
        }

        log_outcome(entity, &outcome);
        Ok(outcome)
    }

    /// Claim `key` for this run unless it is already staged or stored.
    fn claim_if_new(
        &self,
        entity: Entity,
        key: &str,
        staged: &mut StagedInserts,
        outcome: &mut EntityOutcome,
    ) -> Result<bool> {
        let exists = staged.contains(entity, key)
            || self.db.key_exists(entity.table(), entity.key_column(), key)?;

        if exists {
            tracing::debug!("Skipping {} {:?}: already present", entity.table(), key);
            outcome.skipped_existing += 1;
            return Ok(false);
        }

        staged.claim(entity, key);
        outcome.inserted += 1;
        Ok(true)
    }

    fn commit(&self, staged: &StagedInserts) -> Result<()> {
        self.db
            .execute_transaction(|conn| {
                for u in &staged.users {
                    let progress = serde_json::to_string(&u.progress)?;
                    conn.execute(
                        "INSERT INTO users (username, email, password, active, role, progress, avatar_url)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                        params![u.username, u.email, u.password, u.active, u.role, progress, u.avatar_url],
                    )
                    .with_context(|| format!("Failed to insert user {:?}", u.username))?;
                }

                for q in &staged.questions {
                    let options = serde_json::to_string(&q.options)?;
                    conn.execute(
                        "INSERT INTO questions (id, category, question, options, answer)
                         VALUES (?, ?, ?, ?, ?)",
                        params![q.id, q.category, q.question, options, q.answer],
                    )
                    .with_context(|| format!("Failed to insert question {:?}", q.id))?;
                }

                for s in &staged.stats {
                    conn.execute(
                        "INSERT INTO stats (question_id, correct, wrong) VALUES (?, ?, ?)",
                        params![s.question_id, s.correct, s.wrong],
                    )
                    .with_context(|| format!("Failed to insert stat {:?}", s.question_id))?;
                }

                for t in &staged.tickets {
                    conn.execute(
                        "INSERT INTO tickets (
                            id, email, plan, amount, payment_method, status, created_at, paid_at
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            t.id,
                            t.email,
                            t.plan,
                            t.amount,
                            t.payment_method,
                            t.status,
                            t.created_at,
                            t.paid_at
                        ],
                    )
                    .with_context(|| format!("Failed to insert ticket {:?}", t.id))?;
                }

                Ok(())
            })
            .context("Migration commit failed")?;

        tracing::info!("Committed {} rows", staged.len());
        Ok(())
    }
}

fn log_outcome(entity: Entity, outcome: &EntityOutcome) {
    tracing::info!(
        "{}: {} new, {} already present, {} without key",
        entity,
        outcome.inserted,
        outcome.skipped_existing,
        outcome.skipped_missing_key
    );
}
