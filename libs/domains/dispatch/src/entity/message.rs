use crate::models::{Message, MessageStatus};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub phone_number: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: MessageStatus,
    pub message_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub sent_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Message {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            phone_number: model.phone_number,
            content: model.content,
            status: model.status,
            message_id: model.message_id,
            last_error: model.last_error,
            created_at: model.created_at.into(),
            processed_at: model.processed_at.map(Into::into),
            sent_at: model.sent_at.map(Into::into),
        }
    }
}
