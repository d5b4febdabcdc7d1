use crate::auction::{UserName, UserNameRef};

/// Who is using this client
///
/// Lives as long as the process; there is no way to log out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    /// Registration request in flight
    Registering(UserName),
    Active(UserName),
}

impl Session {
    pub fn is_active(&self) -> bool {
        matches!(self, Session::Active(_))
    }

    pub fn active_user(&self) -> Option<UserNameRef<'_>> {
        match self {
            Session::Active(name) => Some(name.as_str()),
            _ => None,
        }
    }
}
