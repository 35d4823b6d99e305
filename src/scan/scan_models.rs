use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanResolution {
    pub redirect_url: String,
    pub target_id: Uuid,
}
