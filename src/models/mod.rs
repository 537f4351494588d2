//! Records read from the JSON data files and the rows written from them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::{lenient_bool, lenient_i64, lenient_key, lenient_text};

/// The four migrated entity types, in migration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Users,
    Questions,
    Stats,
    Tickets,
}

impl Entity {
    pub const ALL: [Entity; 4] = [Entity::Users, Entity::Questions, Entity::Stats, Entity::Tickets];

    pub fn table(self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Questions => "questions",
            Entity::Stats => "stats",
            Entity::Tickets => "tickets",
        }
    }

    /// Column holding the natural or primary key
    pub fn key_column(self) -> &'static str {
        match self {
            Entity::Users => "username",
            Entity::Questions | Entity::Tickets => "id",
            Entity::Stats => "question_id",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Entity::Users => "users.json",
            Entity::Questions => "questions.json",
            Entity::Stats => "stats.json",
            Entity::Tickets => "tickets.json",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Users => "Users",
            Entity::Questions => "Questions",
            Entity::Stats => "Stats",
            Entity::Tickets => "Tickets",
        })
    }
}

/// User progress: completed question ids plus a per-category aggregate.
/// Keys other than these two are kept as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub completed_questions: Vec<Value>,
    #[serde(default)]
    pub by_category: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry of `users.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_key")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub email: String,
    pub password: String,
    pub active: bool,
    pub role: String,
    pub progress: Progress,
    pub avatar_url: Option<String>,
}

impl UserRecord {
    /// Apply defaults. `None` when the record has no username.
    pub fn into_user(self) -> Option<User> {
        let username = self.username?;
        Some(User {
            username,
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            active: self.active.unwrap_or(false),
            role: self.role.unwrap_or_else(default_role),
            progress: self.progress.unwrap_or_default(),
            avatar_url: self.avatar_url,
        })
    }
}

/// Entry of `questions.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionRecord {
    #[serde(default, deserialize_with = "lenient_key")]
    pub id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub answer: Option<String>,
}

/// Row of the `questions` table
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub category: String,
    pub question: String,
    pub options: Vec<Value>,
    pub answer: String,
}

impl QuestionRecord {
    pub fn into_question(self) -> Option<Question> {
        let id = self.id?;
        Some(Question {
            id,
            category: self.category.unwrap_or_default(),
            question: self.question.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            answer: self.answer.unwrap_or_default(),
        })
    }
}

/// Value side of a `stats.json` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatRecord {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub correct: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub wrong: Option<i64>,
}

/// Row of the `stats` table
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub question_id: String,
    pub correct: i64,
    pub wrong: i64,
}

impl StatRecord {
    /// `None` when the map key is empty.
    pub fn into_stat(self, question_id: String) -> Option<Stat> {
        if question_id.is_empty() {
            return None;
        }
        Some(Stat {
            question_id,
            correct: self.correct.unwrap_or(0),
            wrong: self.wrong.unwrap_or(0),
        })
    }
}

/// Entry of `tickets.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketRecord {
    #[serde(default, deserialize_with = "lenient_key")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub amount: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub paid_at: Option<String>,
}

/// Row of the `tickets` table
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub email: String,
    pub plan: String,
    pub amount: i64,
    pub payment_method: String,
    pub status: String,
    pub created_at: String,
    pub paid_at: Option<String>,
}

impl TicketRecord {
    /// Apply defaults and lower-case the email. `None` when the record has no id.
    pub fn into_ticket(self) -> Option<Ticket> {
        let id = self.id?;
        Some(Ticket {
            id,
            email: self.email.unwrap_or_default().to_lowercase(),
            plan: self.plan.unwrap_or_else(default_plan),
            amount: self.amount.unwrap_or(0),
            payment_method: self.payment_method.unwrap_or_else(default_payment_method),
            status: self.status.unwrap_or_else(default_status),
            created_at: self.created_at.unwrap_or_default(),
            paid_at: self.paid_at,
        })
    }
}

fn default_role() -> String { "user".into() }
fn default_plan() -> String { "pro".into() }
fn default_payment_method() -> String { "manual".into() }
fn default_status() -> String { "pending".into() }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: Value) -> Option<User> {
        serde_json::from_value::<UserRecord>(value).unwrap().into_user()
    }

    fn ticket(value: Value) -> Option<Ticket> {
        serde_json::from_value::<TicketRecord>(value).unwrap().into_ticket()
    }

    #[test]
    fn user_defaults_fill_missing_fields() {
        let u = user(json!({"username": "alice"})).unwrap();
        assert_eq!(u.email, "");
        assert_eq!(u.password, "");
        assert!(!u.active);
        assert_eq!(u.role, "user");
        assert_eq!(u.progress, Progress::default());
        assert!(u.avatar_url.is_none());
    }

    #[test]
    fn user_without_username_is_rejected() {
        assert!(user(json!({"email": "a@x.com"})).is_none());
        assert!(user(json!({"username": "", "email": "a@x.com"})).is_none());
        assert!(user(json!({"username": null})).is_none());
        assert!(user(json!({"username": false})).is_none());
        assert!(user(json!({"username": 0})).is_none());
        assert!(user(json!({"username": 0.0})).is_none());
    }

    #[test]
    fn user_active_uses_truthiness() {
        assert!(user(json!({"username": "a", "active": 1})).unwrap().active);
        assert!(user(json!({"username": "a", "active": "yes"})).unwrap().active);
        assert!(!user(json!({"username": "a", "active": 0})).unwrap().active);
        assert!(!user(json!({"username": "a", "active": null})).unwrap().active);
    }

    #[test]
    fn progress_keeps_unknown_keys() {
        let u = user(json!({
            "username": "bob",
            "progress": {
                "completed_questions": [1, "q2"],
                "by_category": {"math": {"correct": 2}},
                "streak": 4
            }
        }))
        .unwrap();

        assert_eq!(u.progress.completed_questions, vec![json!(1), json!("q2")]);
        assert_eq!(u.progress.by_category["math"], json!({"correct": 2}));
        assert_eq!(u.progress.extra["streak"], json!(4));

        let round = serde_json::to_value(&u.progress).unwrap();
        assert_eq!(round["streak"], json!(4));
    }

    #[test]
    fn record_keys_accept_strings_and_numbers() {
        let q: QuestionRecord = serde_json::from_value(json!({"id": 12})).unwrap();
        assert_eq!(q.into_question().unwrap().id, "12");

        let q: QuestionRecord = serde_json::from_value(json!({"id": "q-12"})).unwrap();
        assert_eq!(q.into_question().unwrap().id, "q-12");

        let q: QuestionRecord = serde_json::from_value(json!({"id": 0})).unwrap();
        assert!(q.into_question().is_none());

        let q: QuestionRecord = serde_json::from_value(json!({"id": false})).unwrap();
        assert!(q.into_question().is_none());

        let q: QuestionRecord = serde_json::from_value(json!({"category": "math"})).unwrap();
        assert!(q.into_question().is_none());
    }

    #[test]
    fn record_key_rejects_truthy_non_scalar_ids() {
        assert!(serde_json::from_value::<QuestionRecord>(json!({"id": [1]})).is_err());
        assert!(serde_json::from_value::<TicketRecord>(json!({"id": true})).is_err());
        assert!(serde_json::from_value::<UserRecord>(json!({"username": {"name": "x"}})).is_err());

        // Empty containers are falsy, so the record is keyless rather than malformed
        let t: TicketRecord = serde_json::from_value(json!({"id": []})).unwrap();
        assert!(t.into_ticket().is_none());
    }

    #[test]
    fn question_options_and_answer_accept_any_json() {
        let q: QuestionRecord =
            serde_json::from_value(json!({"id": 1, "options": [3, 4, 5], "answer": 4})).unwrap();
        let q = q.into_question().unwrap();
        assert_eq!(q.options, vec![json!(3), json!(4), json!(5)]);
        assert_eq!(q.answer, "4");

        let q: QuestionRecord =
            serde_json::from_value(json!({"id": 2, "options": ["a", {"img": "b.png"}], "answer": "a"})).unwrap();
        let q = q.into_question().unwrap();
        assert_eq!(q.options[1], json!({"img": "b.png"}));
        assert_eq!(q.answer, "a");
    }

    #[test]
    fn ticket_timestamps_accept_epoch_numbers() {
        let t = ticket(json!({"id": "t1", "created_at": 1700000000, "paid_at": 1700000500})).unwrap();
        assert_eq!(t.created_at, "1700000000");
        assert_eq!(t.paid_at.as_deref(), Some("1700000500"));

        let t = ticket(json!({"id": "t2", "created_at": "2024-01-01T10:00:00Z", "paid_at": null})).unwrap();
        assert_eq!(t.created_at, "2024-01-01T10:00:00Z");
        assert!(t.paid_at.is_none());
    }

    #[test]
    fn ticket_email_is_lowercased() {
        let t = ticket(json!({"id": "t1", "email": "User@Example.com"})).unwrap();
        assert_eq!(t.email, "user@example.com");
    }

    #[test]
    fn ticket_defaults_fill_missing_fields() {
        let t = ticket(json!({"id": 5})).unwrap();
        assert_eq!(t.id, "5");
        assert_eq!(t.email, "");
        assert_eq!(t.plan, "pro");
        assert_eq!(t.amount, 0);
        assert_eq!(t.payment_method, "manual");
        assert_eq!(t.status, "pending");
        assert_eq!(t.created_at, "");
        assert!(t.paid_at.is_none());
    }

    #[test]
    fn ticket_amount_accepts_numeric_strings() {
        let t = ticket(json!({"id": "t", "amount": "1500"})).unwrap();
        assert_eq!(t.amount, 1500);
        assert!(serde_json::from_value::<TicketRecord>(json!({"id": "t", "amount": "lots"})).is_err());
    }

    #[test]
    fn stat_defaults_and_empty_key() {
        let s: StatRecord = serde_json::from_value(json!({"correct": 3})).unwrap();
        let stat = s.clone().into_stat("7".into()).unwrap();
        assert_eq!(stat.correct, 3);
        assert_eq!(stat.wrong, 0);
        assert!(s.into_stat(String::new()).is_none());
    }

    #[test]
    fn entity_labels_and_tables() {
        let labels: Vec<String> = Entity::ALL.iter().map(|e| e.to_string()).collect();
        assert_eq!(labels, ["Users", "Questions", "Stats", "Tickets"]);
        assert_eq!(Entity::Stats.key_column(), "question_id");
        assert_eq!(Entity::Tickets.file_name(), "tickets.json");
    }
}
