//! Connection Registry
//!
//! Maps every registered connection to its display name. Only the hub actor
//! holds a `Registry`, so none of these operations lock.

use std::collections::HashMap;

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::protocol::Presence;

struct Member {
    handle: ConnectionHandle,
    /// Empty until the connection joins
    name: String,
}

#[derive(Default)]
pub struct Registry {
    members: HashMap<ConnectionId, Member>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an anonymous connection. Returns false if the id is already
    /// registered, leaving the existing entry untouched.
    pub fn insert(&mut self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        if self.members.contains_key(&id) {
            return false;
        }
        self.members.insert(
            id,
            Member {
                handle,
                name: String::new(),
            },
        );
        true
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.members.remove(&id).map(|member| member.handle)
    }

    /// Name a connection. A display name is set at most once: returns false
    /// when the connection is unknown, already named, or `name` is empty.
    pub fn set_name(&mut self, id: ConnectionId, name: &str) -> bool {
        match self.members.get_mut(&id) {
            Some(member) if member.name.is_empty() && !name.is_empty() => {
                member.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    /// `Some("")` for an anonymous connection, `None` if not registered.
    pub fn name(&self, id: ConnectionId) -> Option<&str> {
        self.members.get(&id).map(|member| member.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn presence(&self) -> Presence {
        let mut users: Vec<String> = self
            .members
            .values()
            .filter(|member| !member.name.is_empty())
            .map(|member| member.name.clone())
            .collect();
        users.sort();

        Presence {
            count: self.members.len(),
            users,
        }
    }

    /// Every connection except those whose display name equals `exclude`.
    pub fn recipients<'a>(
        &'a self,
        exclude: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ConnectionHandle> + 'a {
        self.members
            .values()
            .filter(move |member| exclude.is_none_or(|name| member.name != name))
            .map(|member| &member.handle)
    }
}
