use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub trip_id: String,
    pub email: String,
    pub is_confirmed: bool,
    /// Set on the row created implicitly for the trip owner.
    pub is_owner: bool,
}

impl Participant {
    /// Display name derived from the email local part (everything before
    /// the `@`). `None` when the address has no usable local part.
    pub fn display_name(&self) -> Option<String> {
        let (local, domain) = self.email.split_once('@')?;
        if local.is_empty() || domain.is_empty() {
            return None;
        }
        Some(local.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant_with_email(email: &str) -> Participant {
        Participant {
            id: "7b6a4f41-0000-0000-0000-000000000000".into(),
            trip_id: "7b6a4f41-0000-0000-0000-000000000001".into(),
            email: email.into(),
            is_confirmed: false,
            is_owner: false,
        }
    }

    #[test]
    fn display_name_is_the_local_part() {
        let p = participant_with_email("ana@example.com");
        assert_eq!(p.display_name().as_deref(), Some("ana"));
    }

    #[test]
    fn display_name_missing_for_unparseable_addresses() {
        assert_eq!(participant_with_email("not-an-email").display_name(), None);
        assert_eq!(participant_with_email("@example.com").display_name(), None);
        assert_eq!(participant_with_email("ana@").display_name(), None);
    }
}
