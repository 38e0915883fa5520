use std::collections::HashMap;

use super::registry::SessionId;

pub type GroupId = u64;

pub const MAX_GROUP_SIZE: usize = 6;

/// Members of one party, in join order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub leader: SessionId,
    pub members: Vec<SessionId>,
    pub locked: bool,
}

impl Group {
    pub fn new(id: GroupId, leader: SessionId) -> Self {
        Self {
            id,
            leader,
            members: vec![leader],
            locked: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_GROUP_SIZE
    }

    pub fn add_member(&mut self, session: SessionId) -> bool {
        if self.is_full() || self.members.contains(&session) {
            return false;
        }
        self.members.push(session);
        true
    }

    pub fn remove_member(&mut self, session: SessionId) -> bool {
        let Some(pos) = self.members.iter().position(|&m| m == session) else {
            return false;
        };
        self.members.remove(pos);
        if self.leader == session {
            if let Some(&next) = self.members.first() {
                self.leader = next;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("player is already in a party")]
    AlreadyGrouped,
    #[error("party is full")]
    Full,
    #[error("party no longer exists")]
    NotFound,
}

/// Party rosters, keyed by group and by member.
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: HashMap<GroupId, Group>,
    member_of: HashMap<SessionId, GroupId>,
    next_id: GroupId,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `invitee` in the inviter's party, creating the party when the
    /// inviter has none yet.
    pub fn accept_invite(
        &mut self,
        inviter: SessionId,
        invitee: SessionId,
    ) -> Result<GroupId, GroupError> {
        if inviter == invitee || self.member_of.contains_key(&invitee) {
            return Err(GroupError::AlreadyGrouped);
        }
        let id = match self.member_of.get(&inviter) {
            Some(&id) => id,
            None => {
                self.next_id += 1;
                let id = self.next_id;
                self.groups.insert(id, Group::new(id, inviter));
                self.member_of.insert(inviter, id);
                id
            }
        };
        let group = self.groups.get_mut(&id).ok_or(GroupError::NotFound)?;
        if !group.add_member(invitee) {
            return Err(GroupError::Full);
        }
        self.member_of.insert(invitee, id);
        Ok(id)
    }

    /// Remove a member. A party left with one member dissolves; the
    /// returned group (if any) is what the remaining members should see.
    pub fn leave(&mut self, session: SessionId) -> Option<Group> {
        let id = self.member_of.remove(&session)?;
        let group = self.groups.get_mut(&id)?;
        group.remove_member(session);
        if group.members.len() <= 1 {
            let dissolved = self.groups.remove(&id)?;
            for member in &dissolved.members {
                self.member_of.remove(member);
            }
            return Some(dissolved);
        }
        Some(group.clone())
    }

    pub fn group_of(&self, session: SessionId) -> Option<&Group> {
        self.member_of
            .get(&session)
            .and_then(|id| self.groups.get(id))
    }
}
