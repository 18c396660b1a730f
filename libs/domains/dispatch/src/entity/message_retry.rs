use crate::models::MessageRetry;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "message_retries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub original_message_id: i32,
    pub phone_number: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MessageRetry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            original_message_id: model.original_message_id,
            phone_number: model.phone_number,
            content: model.content,
            retry_count: model.retry_count,
            last_error: model.last_error,
            created_at: model.created_at.into(),
        }
    }
}
