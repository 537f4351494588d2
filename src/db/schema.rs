/// Table definitions - each tuple is (table, SQL). Applied with
/// `CREATE TABLE IF NOT EXISTS`, never altered.
pub const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            username VARCHAR PRIMARY KEY,
            email VARCHAR NOT NULL DEFAULT '',
            password VARCHAR NOT NULL DEFAULT '',
            active BOOLEAN NOT NULL DEFAULT FALSE,
            role VARCHAR NOT NULL DEFAULT 'user',
            -- JSON text: {"completed_questions": [...], "by_category": {...}}
            progress TEXT NOT NULL,
            avatar_url VARCHAR
        );
        "#,
    ),
    (
        "questions",
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id VARCHAR PRIMARY KEY,
            category VARCHAR NOT NULL DEFAULT '',
            question TEXT NOT NULL DEFAULT '',
            -- JSON text array of choices
            options TEXT NOT NULL DEFAULT '[]',
            answer TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category);
        "#,
    ),
    (
        "stats",
        r#"
        CREATE TABLE IF NOT EXISTS stats (
            question_id VARCHAR PRIMARY KEY,
            correct BIGINT NOT NULL DEFAULT 0,
            wrong BIGINT NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "tickets",
        r#"
        CREATE TABLE IF NOT EXISTS tickets (
            id VARCHAR PRIMARY KEY,
            email VARCHAR NOT NULL DEFAULT '',
            plan VARCHAR NOT NULL DEFAULT 'pro',
            amount BIGINT NOT NULL DEFAULT 0,
            payment_method VARCHAR NOT NULL DEFAULT 'manual',
            status VARCHAR NOT NULL DEFAULT 'pending',
            created_at VARCHAR NOT NULL DEFAULT '',
            paid_at VARCHAR
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_email ON tickets(email);
        "#,
    ),
];
