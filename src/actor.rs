/// How much of the leave system an actor may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Self-service portal user: own records plus their team's approval queue.
    Restricted,
    /// HR staff and administrators: unfiltered access.
    Privileged,
}

/// The identity performing an operation. Always passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: &str, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
        }
    }
    pub fn portal(user_id: &str) -> Self {
        Self::new(user_id, Role::Restricted)
    }
    pub fn staff(user_id: &str) -> Self {
        Self::new(user_id, Role::Privileged)
    }

    pub fn is_privileged(&self) -> bool {
        self.role == Role::Privileged
    }
}
