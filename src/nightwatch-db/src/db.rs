use chrono::NaiveDate;
use nightwatch_entities::sleep_sessions;
use nightwatch_migration::{Migrator, MigratorTrait, OnConflict};
use nightwatch_types::SessionRecord;
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct DatabaseHandler {
    db: DatabaseConnection,
}

impl DatabaseHandler {
    /// Connects and brings the schema up to date.
    pub async fn new<C>(path: C) -> anyhow::Result<Self>
    where
        C: Into<ConnectOptions>,
    {
        let db = Database::connect(path).await?;
        Migrator::up(&db, None).await?;

        Ok(Self { db })
    }

    /// Writes the record for `(user_id, record.date)`, replacing any earlier
    /// record for that day.
    pub async fn upsert_sleep_session(
        &self,
        user_id: &str,
        record: &SessionRecord,
    ) -> anyhow::Result<()> {
        let model = sleep_sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_owned()),
            date: Set(record.date),
            sleep_start: Set(record.sleep_start),
            sleep_end: Set(record.sleep_end),
            duration: Set(record.duration),
            quality: Set(record.quality),
            total_movements: Set(to_column(record.total_movements)),
            restless_periods: Set(to_column(record.restless_periods)),
            is_manual: Set(record.is_manual),
            updated_at: Set(record.updated_at),
        };

        sleep_sessions::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([sleep_sessions::Column::UserId, sleep_sessions::Column::Date])
                    .update_columns([
                        sleep_sessions::Column::SleepStart,
                        sleep_sessions::Column::SleepEnd,
                        sleep_sessions::Column::Duration,
                        sleep_sessions::Column::Quality,
                        sleep_sessions::Column::TotalMovements,
                        sleep_sessions::Column::RestlessPeriods,
                        sleep_sessions::Column::IsManual,
                        sleep_sessions::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        debug!("stored sleep session for {user_id} on {}", record.date);
        Ok(())
    }

    pub async fn get_sleep_session(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<SessionRecord>> {
        let model = sleep_sessions::Entity::find()
            .filter(sleep_sessions::Column::UserId.eq(user_id))
            .filter(sleep_sessions::Column::Date.eq(date))
            .one(&self.db)
            .await?;

        Ok(model.map(map_session))
    }
}

fn to_column(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn map_session(model: sleep_sessions::Model) -> SessionRecord {
    SessionRecord {
        sleep_start: model.sleep_start,
        sleep_end: model.sleep_end,
        duration: model.duration,
        quality: model.quality,
        total_movements: model.total_movements.try_into().unwrap_or_default(),
        restless_periods: model.restless_periods.try_into().unwrap_or_default(),
        is_manual: model.is_manual,
        date: model.date,
        updated_at: model.updated_at,
    }
}
