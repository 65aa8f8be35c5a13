use std::fmt::{Display, Formatter};

/// User record as returned by the store. The password never leaves the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDetails {
    /// Empty until the store assigns one on insert.
    pub id: String,
    pub nickname: String,
    pub email: String,
    pub description: String,
}

impl UserDetails {
    pub fn new(
        id: impl Into<String>,
        nickname: impl Into<String>,
        email: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
            email: email.into(),
            description: description.into(),
        }
    }
}

/// User together with its attachments, as the use-cases see it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: Option<String>,
    pub nickname: String,
    pub email: String,
    pub description: String,
    pub photo: Option<Vec<u8>>,
    pub id_scan: Option<Vec<u8>>,
}

impl User {
    /// `None` and `Some("")` both mean the user was never stored.
    pub fn stored_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn details(&self) -> UserDetails {
        UserDetails {
            id: self.id.clone().unwrap_or_default(),
            nickname: self.nickname.clone(),
            email: self.email.clone(),
            description: self.description.clone(),
        }
    }

    pub fn from_details(
        details: UserDetails,
        photo: Option<Vec<u8>>,
        id_scan: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id: Some(details.id),
            nickname: details.nickname,
            email: details.email,
            description: details.description,
            photo,
            id_scan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Avatar,
    IdScan,
}

impl AttachmentKind {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::IdScan => "id-scan",
        }
    }
}

impl Display for AttachmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

pub fn asset_key(user_id: &str, kind: AttachmentKind) -> String {
    format!("{user_id}-{}", kind.suffix())
}
