use domain::Id;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SendMessageParams {
    #[schema(value_type = Uuid)]
    pub(crate) receiver_id: Id,
    pub(crate) content: String,
}
