/// Outcome of granting a badge. A user holds each badge at most once; the
/// `(user_id, badge_id)` primary key turns a second grant into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeGrant {
    Awarded,
    AlreadyHeld,
}

impl BadgeGrant {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 1 {
            BadgeGrant::Awarded
        } else {
            BadgeGrant::AlreadyHeld
        }
    }

    pub fn message(self, badge_name: &str) -> String {
        match self {
            BadgeGrant::Awarded => format!("Badge '{badge_name}' awarded!"),
            BadgeGrant::AlreadyHeld => "User already has this badge".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_grant_is_a_no_op() {
        let first = BadgeGrant::from_rows_affected(1);
        let second = BadgeGrant::from_rows_affected(0);
        assert_eq!(first, BadgeGrant::Awarded);
        assert_eq!(second, BadgeGrant::AlreadyHeld);
        assert_eq!(first.message("Sugar Rush"), "Badge 'Sugar Rush' awarded!");
        assert_eq!(second.message("Sugar Rush"), "User already has this badge");
    }
}
