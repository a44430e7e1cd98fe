//! View-model pieces shared by every page template.

use crate::models::user::{AuthUser, ViewMode};
use crate::session::SessionData;

/// Navigation bar state. Rendering only; nothing here grants access.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub signed_in: bool,
    pub is_admin: bool,
    pub admin_view: bool,
    pub name: String,
}

impl Nav {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn for_user(user: &AuthUser) -> Self {
        Self {
            signed_in: true,
            is_admin: user.is_admin(),
            admin_view: user.view_mode == ViewMode::Admin,
            name: user.display_name(),
        }
    }

    pub fn for_session(data: &SessionData) -> Self {
        if !data.is_signed_in() {
            return Self::guest();
        }
        Self {
            signed_in: true,
            is_admin: data.role == Some(crate::models::user::Role::Admin),
            admin_view: data.effective_view_mode() == ViewMode::Admin,
            name: data
                .name
                .clone()
                .or_else(|| data.email.clone())
                .unwrap_or_default(),
        }
    }
}

/// Human-readable byte size for file rows.
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{} B", bytes)
    }
}
