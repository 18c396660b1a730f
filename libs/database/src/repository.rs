//! Generic SeaORM repository wrapper shared by domain-specific repositories.

use std::marker::PhantomData;

use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait, PrimaryKeyTrait,
};

/// Thin wrapper around a [`DatabaseConnection`] scoped to a single entity.
///
/// Domain repositories embed a `BaseRepository<Entity>` and build their
/// query-specific behaviour (filters, locking, joins) on top of it rather
/// than re-deriving connection plumbing in every crate.
#[derive(Clone)]
pub struct BaseRepository<E: EntityTrait> {
    db: DatabaseConnection,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> BaseRepository<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn insert(&self, model: E::ActiveModel) -> Result<E::Model, DbErr>
    where
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
    {
        model.insert(&self.db).await
    }

    pub async fn find_by_id<V>(&self, id: V) -> Result<Option<E::Model>, DbErr>
    where
        V: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        E::find_by_id(id).one(&self.db).await
    }

    pub async fn update(&self, model: E::ActiveModel) -> Result<E::Model, DbErr>
    where
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
    {
        model.update(&self.db).await
    }

    pub async fn delete_by_id<V>(&self, id: V) -> Result<u64, DbErr>
    where
        V: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        E::delete_by_id(id)
            .exec(&self.db)
            .await
            .map(|res| res.rows_affected)
    }

    pub async fn delete(&self, model: E::Model) -> Result<u64, DbErr>
    where
        E::Model: ModelTrait<Entity = E> + Send + Sync,
    {
        model.delete(&self.db).await.map(|res| res.rows_affected)
    }
}
