use crate::storage::ShortLink;
use migration::entities::url;

/// 将 Sea-ORM Model 转换为 ShortLink
pub fn model_to_shortlink(model: url::Model) -> ShortLink {
    ShortLink {
        id: Some(model.id),
        url: model.url,
        short_identifier: model.short_identifier,
        owner_uuid: model.visitor_uuid,
        created_at: model.created_at,
        updated_at: model.updated_at,
        deleted_at: model.deleted_at,
    }
}

/// 将 ShortLink 转换为待插入的 ActiveModel（id 由数据库分配）
pub fn shortlink_to_active_model(link: &ShortLink) -> url::ActiveModel {
    use sea_orm::ActiveValue::*;

    url::ActiveModel {
        id: NotSet,
        short_identifier: Set(link.short_identifier.clone()),
        url: Set(link.url.clone()),
        visitor_uuid: Set(link.owner_uuid.clone()),
        created_at: Set(link.created_at),
        updated_at: Set(link.updated_at),
        deleted_at: Set(link.deleted_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_to_shortlink() {
        let now = Utc::now();
        let model = url::Model {
            id: 7,
            short_identifier: "abcdEFGH".to_string(),
            url: "https://example.com".to_string(),
            visitor_uuid: "u1".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let link = model_to_shortlink(model);
        assert_eq!(link.id, Some(7));
        assert_eq!(link.owner_uuid, "u1");
        assert!(!link.is_deleted());
    }

    #[test]
    fn test_active_model_leaves_id_unset() {
        let link = ShortLink::new("https://example.com", "abcdEFGH", "u1");
        let am = shortlink_to_active_model(&link);
        assert!(matches!(am.id, ActiveValue::NotSet));
        assert!(matches!(am.visitor_uuid, ActiveValue::Set(ref v) if v == "u1"));
    }
}
