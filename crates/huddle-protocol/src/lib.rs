//! Wire types shared by the Huddle server and its clients.

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, ServerMessage};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn summary() -> ActivitySummary {
        ActivitySummary {
            id: Uuid::new_v4(),
            title: "Sunday futsal".to_string(),
            category: "futsal".to_string(),
            location: "Court 3".to_string(),
            scheduled_at: Utc::now(),
            description: String::new(),
            capacity: 10,
            current_members: 4,
            available_slots: 6,
            channel_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn admin_view_flattens_summary_fields() {
        let view = ActivityView::Admin(ActivityAdminView {
            summary: summary(),
            members: vec![Uuid::new_v4()],
            created_at: Utc::now(),
        });

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "admin");
        assert_eq!(json["available_slots"], 6);
        assert_eq!(json["members"].as_array().map(Vec::len), Some(1));

        let back: ActivityView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn summary_view_has_no_admin_fields() {
        let json = serde_json::to_value(ActivityView::Summary(summary())).unwrap();
        assert_eq!(json["view"], "summary");
        assert!(json.get("members").is_none());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn error_body_omits_empty_fields() {
        let body = ErrorBody {
            success: false,
            code: "activity_full".to_string(),
            error: "Activity is full".to_string(),
            fields: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("fields").is_none());
        assert_eq!(json["success"], false);
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        assert_eq!(Role::default(), Role::User);
    }
}
