//! Mention markup and an in-memory user/stream directory.

use std::collections::HashMap;

use {
    murmur_common::{StreamId, UserId},
    tracing::error,
};

use crate::{
    traits::Directory,
    types::{Message, MessageKind},
};

/// Mention markup for a user: `@**Full Name**`, or `@**Full Name|id**` when
/// `disambiguate_with` is set because the name alone is ambiguous.
#[must_use]
pub fn mention_syntax(full_name: &str, disambiguate_with: Option<UserId>) -> String {
    match disambiguate_with {
        Some(user_id) => format!("@**{full_name}|{user_id}**"),
        None => format!("@**{full_name}**"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
}

impl Person {
    #[must_use]
    pub fn new(user_id: UserId, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            email: email.into(),
        }
    }
}

/// A [`Directory`] backed by maps filled in at startup.
#[derive(Debug, Clone)]
pub struct Roster {
    current_user: UserId,
    users: HashMap<UserId, Person>,
    streams: HashMap<StreamId, String>,
}

impl Roster {
    #[must_use]
    pub fn new(current_user: UserId) -> Self {
        Self {
            current_user,
            users: HashMap::new(),
            streams: HashMap::new(),
        }
    }

    pub fn add_user(&mut self, person: Person) {
        self.users.insert(person.user_id, person);
    }

    pub fn add_stream(&mut self, stream_id: StreamId, name: impl Into<String>) {
        self.streams.insert(stream_id, name.into());
    }

    pub fn get_user(&self, user_id: UserId) -> Option<&Person> {
        self.users.get(&user_id)
    }

    /// More than one known user has this full name.
    #[must_use]
    pub fn is_duplicate_full_name(&self, full_name: &str) -> bool {
        self.users
            .values()
            .filter(|p| p.full_name == full_name)
            .nth(1)
            .is_some()
    }

    /// The other participants of a direct message, sorted; just the current
    /// user for a conversation with oneself.
    #[must_use]
    pub fn pm_with_user_ids(&self, message: &Message) -> Option<Vec<UserId>> {
        let MessageKind::Private { display_recipient } = &message.kind else {
            return None;
        };
        if display_recipient.is_empty() {
            error!(message_id = %message.id, "direct message has no recipients");
            return None;
        }
        let mut others: Vec<UserId> = display_recipient
            .iter()
            .map(|r| r.id)
            .filter(|id| *id != self.current_user)
            .collect();
        if others.is_empty() {
            others.push(self.current_user);
        }
        others.sort_unstable();
        others.dedup();
        Some(others)
    }
}

impl Directory for Roster {
    fn current_user_id(&self) -> UserId {
        self.current_user
    }

    fn stream_name(&self, stream_id: StreamId) -> Option<String> {
        self.streams.get(&stream_id).cloned()
    }

    fn mention_syntax(&self, full_name: &str, user_id: UserId) -> String {
        let disambiguate = self.is_duplicate_full_name(full_name).then_some(user_id);
        mention_syntax(full_name, disambiguate)
    }

    fn pm_reply_to(&self, message: &Message) -> Option<String> {
        let user_ids = self.pm_with_user_ids(message)?;
        let mut emails: Vec<String> = user_ids
            .into_iter()
            .map(|id| match self.get_user(id) {
                Some(person) => person.email.clone(),
                None => {
                    error!(user_id = %id, message_id = %message.id, "unknown user id in message");
                    "?".to_string()
                },
            })
            .collect();
        emails.sort();
        Some(emails.join(","))
    }
}
