//! SQLite-backed profile store.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{AssessorError, AssessorResult};
use crate::profile::{
    default_domain_states, merge_core_profile, CoreProfile, CoreProfileUpdate, Domain,
    DomainSignal, DomainState, DomainStates, MicroModule, MicroModuleActivation, ModuleState,
};
use crate::store::ProfileStore;
use crate::types::{
    InsightCategory, MessageRole, PatternInsight, StoredInsight, StoredMessage, UserId,
    DEFAULT_INSIGHT_CONFIDENCE,
};

/// SQLite-backed profile store
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Open (or create) a store at the given path
    pub fn new(path: impl AsRef<Path>) -> AssessorResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory store
    pub fn in_memory() -> AssessorResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> AssessorResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> AssessorResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AssessorError::database("profile store connection poisoned"))
    }

    fn init_schema(&self) -> AssessorResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profile_cores (
                user_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS domain_states (
                user_id INTEGER NOT NULL,
                domain TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 0,
                activation_reason TEXT,
                signals TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, domain)
            );

            CREATE TABLE IF NOT EXISTS micro_modules (
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                domain TEXT,
                depth INTEGER NOT NULL DEFAULT 1,
                active INTEGER NOT NULL DEFAULT 1,
                triggers TEXT NOT NULL,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, name)
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id, id);

            CREATE TABLE IF NOT EXISTS insights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                label TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_insights_user ON insights(user_id, id);
        "#,
        )?;
        Ok(())
    }

    fn read_core(conn: &Connection, user_id: UserId) -> AssessorResult<Option<CoreProfile>> {
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM profile_cores WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|d| serde_json::from_str(&d).map_err(AssessorError::from))
            .transpose()
    }

    fn write_core(
        conn: &Connection,
        user_id: UserId,
        core: &CoreProfile,
        now: DateTime<Utc>,
    ) -> AssessorResult<()> {
        let data = serde_json::to_string(core)?;
        conn.execute(
            r#"INSERT INTO profile_cores (user_id, data, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?3)
               ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
            params![user_id, data, now.to_rfc3339()],
        )?;
        Ok(())
    }

    fn row_to_domain_state(row: &rusqlite::Row<'_>) -> AssessorResult<DomainState> {
        let domain: String = row.get(0)?;
        let active: i32 = row.get(1)?;
        let activation_reason: Option<String> = row.get(2)?;
        let signals: String = row.get(3)?;

        let signals: BTreeMap<String, DomainSignal> = serde_json::from_str(&signals)?;
        Ok(DomainState {
            name: parse_domain(&domain)?,
            active: active != 0,
            activation_reason,
            signals,
        })
    }

    fn row_to_micro_module(row: &rusqlite::Row<'_>) -> AssessorResult<MicroModule> {
        let name: String = row.get(0)?;
        let domain: Option<String> = row.get(1)?;
        let depth: u32 = row.get(2)?;
        let active: i32 = row.get(3)?;
        let triggers: String = row.get(4)?;
        let state: String = row.get(5)?;

        Ok(MicroModule {
            name,
            domain: domain.as_deref().map(parse_domain).transpose()?,
            depth,
            active: active != 0,
            triggers: serde_json::from_str(&triggers)?,
            state: serde_json::from_str(&state)?,
        })
    }

    fn row_to_message(row: &rusqlite::Row<'_>) -> AssessorResult<StoredMessage> {
        let role: String = row.get(0)?;
        let created_at: String = row.get(2)?;
        Ok(StoredMessage {
            role: MessageRole::from_stored(&role),
            content: row.get(1)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_insight(row: &rusqlite::Row<'_>) -> AssessorResult<PatternInsight> {
        let category: String = row.get(0)?;
        let label: String = row.get(1)?;
        let confidence: u8 = row.get(2)?;

        Ok(PatternInsight {
            category: InsightCategory::from_str(&category)
                .map_err(|e| AssessorError::parse(format!("insight category {}: {}", category, e)))?,
            label,
            confidence: Some(confidence),
        })
    }
}

fn parse_domain(value: &str) -> AssessorResult<Domain> {
    Domain::from_str(value).map_err(|e| AssessorError::parse(format!("domain {}: {}", value, e)))
}

fn parse_timestamp(value: &str) -> AssessorResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

impl ProfileStore for SqliteProfileStore {
    fn get_core(&self, user_id: UserId) -> AssessorResult<Option<CoreProfile>> {
        let conn = self.conn()?;
        Self::read_core(&conn, user_id)
    }

    fn ensure_core(&self, user_id: UserId) -> AssessorResult<CoreProfile> {
        let conn = self.conn()?;
        if let Some(core) = Self::read_core(&conn, user_id)? {
            return Ok(core);
        }
        let core = CoreProfile::default();
        Self::write_core(&conn, user_id, &core, Utc::now())?;
        Ok(core)
    }

    fn update_core(
        &self,
        user_id: UserId,
        update: &CoreProfileUpdate,
    ) -> AssessorResult<CoreProfile> {
        let conn = self.conn()?;
        let base = Self::read_core(&conn, user_id)?.unwrap_or_default();
        let merged = merge_core_profile(&base, update);
        Self::write_core(&conn, user_id, &merged, Utc::now())?;
        Ok(merged)
    }

    fn get_domains(&self, user_id: UserId) -> AssessorResult<DomainStates> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT domain, active, activation_reason, signals
               FROM domain_states WHERE user_id = ?1"#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok(Self::row_to_domain_state(row)))?;

        let mut states = default_domain_states();
        for row in rows {
            let state = row??;
            states.insert(state.name, state);
        }
        Ok(states)
    }

    fn upsert_domain_state(&self, user_id: UserId, state: &DomainState) -> AssessorResult<()> {
        let conn = self.conn()?;
        let domain: &'static str = state.name.into();
        let signals = serde_json::to_string(&state.signals)?;

        conn.execute(
            r#"INSERT INTO domain_states (user_id, domain, active, activation_reason, signals, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(user_id, domain) DO UPDATE SET
                 active = excluded.active,
                 activation_reason = excluded.activation_reason,
                 signals = excluded.signals,
                 updated_at = excluded.updated_at"#,
            params![
                user_id,
                domain,
                state.active as i32,
                state.activation_reason,
                signals,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn upsert_micro_module(
        &self,
        user_id: UserId,
        activation: &MicroModuleActivation,
        active: bool,
        state: &ModuleState,
    ) -> AssessorResult<()> {
        let conn = self.conn()?;
        let domain: Option<&'static str> = activation.domain.map(Into::into);
        let triggers = serde_json::to_string(&activation.triggers)?;
        let state = serde_json::to_string(state)?;

        conn.execute(
            r#"INSERT INTO micro_modules (user_id, name, domain, depth, active, triggers, state, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
               ON CONFLICT(user_id, name) DO UPDATE SET
                 domain = excluded.domain,
                 depth = excluded.depth,
                 active = excluded.active,
                 triggers = excluded.triggers,
                 state = excluded.state,
                 updated_at = excluded.updated_at"#,
            params![
                user_id,
                activation.name,
                domain,
                activation.depth.max(1),
                active as i32,
                triggers,
                state,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_micro_modules(&self, user_id: UserId) -> AssessorResult<Vec<MicroModule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT name, domain, depth, active, triggers, state
               FROM micro_modules WHERE user_id = ?1 ORDER BY name"#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok(Self::row_to_micro_module(row)))?;
        rows.map(|r| r?).collect()
    }

    fn log_message(
        &self,
        user_id: UserId,
        role: MessageRole,
        content: &str,
        at: DateTime<Utc>,
    ) -> AssessorResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (user_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, role.as_str(), content, at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn list_recent_messages(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AssessorResult<Vec<StoredMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT role, content, created_at FROM messages
               WHERE user_id = ?1
               ORDER BY id DESC
               LIMIT ?2"#,
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| Ok(Self::row_to_message(row)))?;
        let mut messages = rows.map(|r| r?).collect::<AssessorResult<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    fn add_insights(
        &self,
        user_id: UserId,
        insights: &[PatternInsight],
        at: DateTime<Utc>,
    ) -> AssessorResult<()> {
        if insights.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO insights (user_id, category, label, confidence, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
            )?;
            for insight in insights {
                let category: &'static str = insight.category.into();
                stmt.execute(params![
                    user_id,
                    category,
                    insight.label,
                    insight.confidence.unwrap_or(DEFAULT_INSIGHT_CONFIDENCE).min(100),
                    at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_recent_insights(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AssessorResult<Vec<StoredInsight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT category, label, confidence, created_at FROM insights
               WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2"#,
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(Self::row_to_insight(row).and_then(|insight| {
                let created_at: String = row.get(3)?;
                Ok(StoredInsight { insight, created_at: parse_timestamp(&created_at)? })
            }))
        })?;
        rows.map(|r| r?).collect()
    }

    fn list_insights(&self, user_id: UserId) -> AssessorResult<Vec<PatternInsight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, label, confidence FROM insights WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok(Self::row_to_insight(row)))?;
        rows.map(|r| r?).collect()
    }

    fn list_user_ids(&self, limit: usize) -> AssessorResult<Vec<UserId>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT user_id FROM profile_cores ORDER BY user_id LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, UserId>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{
        upsert_domain_signals, ActivationState, Behavior, Identity, RawBigFive, MISSIONS_MODULE,
    };
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn test_missing_user_reads_defaults() {
        let store = SqliteProfileStore::in_memory().unwrap();
        assert!(store.get_core(7).unwrap().is_none());
        assert_eq!(store.get_domains(7).unwrap().len(), 6);
        assert!(store.get_micro_modules(7).unwrap().is_empty());
        assert!(store.list_recent_messages(7, 50).unwrap().is_empty());
        assert!(store.list_insights(7).unwrap().is_empty());
    }

    #[test]
    fn test_update_core_merges() {
        let store = SqliteProfileStore::in_memory().unwrap();
        store.ensure_core(1).unwrap();

        let update = CoreProfileUpdate {
            identity: Identity {
                statements: vec!["designer".to_string()],
                aliases: vec![],
            },
            big_five: Some(RawBigFive {
                openness: 140.0,
                ..RawBigFive::default()
            }),
            ..CoreProfileUpdate::default()
        };
        store.update_core(1, &update).unwrap();

        let second = CoreProfileUpdate {
            behavior: Behavior {
                habits: vec!["Hábito detectado: sempre".to_string()],
                preferences: vec![],
            },
            ..CoreProfileUpdate::default()
        };
        let merged = store.update_core(1, &second).unwrap();

        assert_eq!(merged.identity.statements, vec!["designer"]);
        assert_eq!(merged.big_five.openness, 100);
        assert_eq!(merged.behavior.habits.len(), 1);
        assert_eq!(store.get_core(1).unwrap().unwrap(), merged);
    }

    #[test]
    fn test_domain_state_upsert_replaces() {
        let store = SqliteProfileStore::in_memory().unwrap();
        let base = DomainState::empty(Domain::Learning);
        let signal = DomainSignal {
            reason: "keyword: estud".to_string(),
            weight: 0.6,
            last_seen_at: at(0),
        };
        let state = upsert_domain_signals(&base, &[signal], None);
        store.upsert_domain_state(3, &state).unwrap();
        store.upsert_domain_state(3, &state).unwrap();

        let domains = store.get_domains(3).unwrap();
        assert!(domains[&Domain::Learning].active);
        assert_eq!(
            domains[&Domain::Learning].activation_reason.as_deref(),
            Some("keyword: estud")
        );
        assert!(!domains[&Domain::Health].active);
    }

    #[test]
    fn test_micro_module_unique_by_name() {
        let store = SqliteProfileStore::in_memory().unwrap();
        let activation =
            MicroModuleActivation::new(MISSIONS_MODULE, Some(Domain::Performance), 2, &["mission"]);
        let first = ModuleState::Activation(ActivationState {
            last_triggered_at: at(0),
        });
        let second = ModuleState::Activation(ActivationState {
            last_triggered_at: at(5),
        });
        store.upsert_micro_module(1, &activation, true, &first).unwrap();
        store.upsert_micro_module(1, &activation, false, &second).unwrap();

        let modules = store.get_micro_modules(1).unwrap();
        assert_eq!(modules.len(), 1);
        assert!(!modules[0].active);
        assert_eq!(modules[0].domain, Some(Domain::Performance));
        assert_eq!(modules[0].state, second);
    }

    #[test]
    fn test_recent_messages_are_latest_in_order() {
        let store = SqliteProfileStore::in_memory().unwrap();
        for i in 0..5 {
            store
                .log_message(1, MessageRole::User, &format!("m{}", i), at(i))
                .unwrap();
        }
        store.log_message(2, MessageRole::User, "other", at(9)).unwrap();

        let recent = store.list_recent_messages(1, 3).unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert_eq!(recent[2].created_at, at(4));
    }

    #[test]
    fn test_insights_default_confidence_and_order() {
        let store = SqliteProfileStore::in_memory().unwrap();
        store
            .add_insights(
                1,
                &[
                    PatternInsight::new(InsightCategory::Theme, "Tema recorrente: treino"),
                    PatternInsight::new(InsightCategory::Emotion, "Humor detectado: feliz")
                        .with_confidence(80),
                ],
                at(0),
            )
            .unwrap();

        let all = store.list_insights(1).unwrap();
        assert_eq!(all[0].confidence, Some(50));
        assert_eq!(all[1].confidence, Some(80));

        let recent = store.list_recent_insights(1, 1).unwrap();
        assert_eq!(recent[0].insight.label, "Humor detectado: feliz");
        assert_eq!(recent[0].created_at, at(0));
    }

    #[test]
    fn test_list_user_ids() {
        let store = SqliteProfileStore::in_memory().unwrap();
        for id in [5, 2, 9] {
            store.ensure_core(id).unwrap();
        }
        assert_eq!(store.list_user_ids(2).unwrap(), vec![2, 5]);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.db");
        {
            let store = SqliteProfileStore::new(&path).unwrap();
            store.log_message(1, MessageRole::User, "oi", at(0)).unwrap();
        }
        let store = SqliteProfileStore::new(&path).unwrap();
        assert_eq!(store.list_recent_messages(1, 10).unwrap().len(), 1);
    }
}
