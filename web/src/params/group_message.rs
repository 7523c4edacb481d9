use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SendGroupMessageParams {
    pub(crate) content: String,
}
