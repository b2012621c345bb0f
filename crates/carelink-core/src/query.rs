//! # Query Engine
//!
//! Read-only access to records: fetch by id and filtered lists.
//!
//! Lists accept zero or one exact-match filter on the kind's designated
//! field (see [`Entity::FILTER_FIELD`]) and come back newest first.

use crate::records::Entity;
use crate::{CareError, EntityStore, RecordId, User};

/// Read-only query engine over an [`EntityStore`].
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'s> {
    store: &'s EntityStore,
}

impl<'s> QueryEngine<'s> {
    #[must_use]
    pub fn new(store: &'s EntityStore) -> Self {
        Self { store }
    }

    /// Fetch a record by id. A miss is `Ok(None)`, never an error.
    pub fn by_id<E: Entity>(&self, id: &RecordId) -> Result<Option<E>, CareError> {
        self.store.get(id)
    }

    /// List records, newest first.
    ///
    /// With `filter`, only records whose filter field equals it exactly are
    /// returned; `None` returns every record of the kind. The value is not
    /// trimmed, so callers that treat a blank filter as absent pass `None`.
    pub fn list<E: Entity>(&self, filter: Option<&str>) -> Result<Vec<E>, CareError> {
        match filter {
            Some(wanted) => self.store.find(|r: &E| r.filter_key() == wanted),
            None => self.store.find(|_: &E| true),
        }
    }

    /// The account registered under `email`, ignoring surrounding whitespace.
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, CareError> {
        let email = email.trim();
        Ok(self
            .store
            .find::<User>(|u| u.email == email)?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertStatus, EmergencyAlert, Role};
    use chrono::{DateTime, Utc};

    fn alert(patient: &str) -> EmergencyAlert {
        EmergencyAlert {
            id: RecordId::default(),
            patient_id: RecordId::new(patient),
            message: "help".to_string(),
            location: None,
            status: AlertStatus::Pending,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            resolved_at: None,
        }
    }

    fn user(name: &str, role: Role) -> User {
        User {
            id: RecordId::default(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: String::new(),
            role,
            first_name: name.to_string(),
            last_name: "Test".to_string(),
            date_of_birth: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn by_id_miss_is_none() {
        let store = EntityStore::in_memory();
        let found = QueryEngine::new(&store)
            .by_id::<EmergencyAlert>(&RecordId::new("nope"))
            .expect("query");
        assert!(found.is_none());
    }

    #[test]
    fn list_filters_by_status() {
        let mut store = EntityStore::in_memory();
        let a = store.insert(alert("p1")).expect("insert");
        let b = store.insert(alert("p2")).expect("insert");
        store
            .update::<EmergencyAlert>(&b.id, |r| {
                r.status = AlertStatus::Resolved;
                Ok(())
            })
            .expect("update");

        let engine = QueryEngine::new(&store);
        let pending = engine.list::<EmergencyAlert>(Some("pending")).expect("list");
        let resolved = engine.list::<EmergencyAlert>(Some("resolved")).expect("list");

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, b.id);
    }

    #[test]
    fn list_filters_users_by_role() {
        let mut store = EntityStore::in_memory();
        store.insert(user("nina", Role::Nurse)).expect("insert");
        store.insert(user("paul", Role::Patient)).expect("insert");
        store.insert(user("pia", Role::Patient)).expect("insert");

        let engine = QueryEngine::new(&store);
        let patients = engine.list::<User>(Some("patient")).expect("list");
        let names: Vec<_> = patients.iter().map(|u| u.username.as_str()).collect();

        assert_eq!(names, vec!["pia", "paul"]);
        assert_eq!(engine.list::<User>(None).expect("list").len(), 3);
    }

    #[test]
    fn unknown_filter_value_is_empty() {
        let mut store = EntityStore::in_memory();
        store.insert(user("nina", Role::Nurse)).expect("insert");
        let engine = QueryEngine::new(&store);
        assert!(engine.list::<User>(Some("doctor")).expect("list").is_empty());
    }

    #[test]
    fn user_by_email_ignores_padding() {
        let mut store = EntityStore::in_memory();
        let nina = store.insert(user("nina", Role::Nurse)).expect("insert");
        let engine = QueryEngine::new(&store);

        let found = engine.user_by_email("  nina@example.com ").expect("query");
        assert_eq!(found.map(|u| u.id), Some(nina.id));
        assert!(engine.user_by_email("nobody@example.com").expect("query").is_none());
    }
}
