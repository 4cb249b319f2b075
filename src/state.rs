use crate::events::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub events: EventPublisher,
}
